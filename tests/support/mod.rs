#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use cowork_client::{
    ConnectionManager, CoworkClient, EventRouter, Inbound, SessionContext,
};
use cowork_mock::MockBackend;
use cowork_protocol::ProtocolConfig;

pub const PUMP_TIMEOUT: Duration = Duration::from_secs(2);

pub fn manager_for(backend: &MockBackend) -> ConnectionManager {
    ConnectionManager::new(&ProtocolConfig::new("test"), Arc::new(backend.clone()))
}

pub fn client_for(backend: &MockBackend, router: EventRouter) -> CoworkClient {
    CoworkClient::new(manager_for(backend), SessionContext::new("/work"), router)
        .expect("fresh manager has inbound frames")
}

/// Applies inbound items until `done` holds.
pub async fn pump_until(client: &mut CoworkClient, done: impl Fn(&CoworkClient) -> bool) {
    while !done(client) {
        let pumped = tokio::time::timeout(PUMP_TIMEOUT, client.pump_one())
            .await
            .expect("inbound item within timeout");
        assert!(pumped, "connection manager dropped");
    }
}

/// Pumps until the current response has completed.
pub async fn pump_response(client: &mut CoworkClient) {
    pump_until(client, |client| {
        let conversation = client.conversation();
        !conversation.is_awaiting_response()
            && conversation.streaming_message().is_none()
            && conversation
                .messages()
                .last()
                .is_some_and(|message| message.role != cowork_client::Role::User)
    })
    .await;
}

/// Receives the next raw inbound item from a manager's channel.
pub async fn next_inbound(
    receiver: &mut tokio::sync::mpsc::UnboundedReceiver<Inbound>,
) -> Inbound {
    tokio::time::timeout(PUMP_TIMEOUT, receiver.recv())
        .await
        .expect("inbound item within timeout")
        .expect("channel open")
}
