//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use cowork_protocol::url::DEFAULT_AGENT_BASE_URL;
use cowork_protocol::{normalize_base_url, ProtocolConfig};
use uuid::Uuid;

use crate::composer::SessionContext;
use crate::error::ConfigError;
use crate::session::SettingsOverrides;

pub const AGENT_HOST_ENV_VAR: &str = "AGENT_HOST";
pub const AGENT_PORT_ENV_VAR: &str = "AGENT_PORT";
pub const AGENT_URL_ENV_VAR: &str = "COWORK_AGENT_URL";
pub const CLIENT_ID_ENV_VAR: &str = "COWORK_CLIENT_ID";
pub const WORK_DIR_ENV_VAR: &str = "COWORK_WORK_DIR";
pub const AUTO_ACCEPT_ENV_VAR: &str = "COWORK_AUTO_ACCEPT";
pub const MODEL_ENV_VAR: &str = "COWORK_MODEL";
pub const API_KEY_ENV_VAR: &str = "COWORK_API_KEY";
pub const CONNECT_TIMEOUT_ENV_VAR: &str = "COWORK_CONNECT_TIMEOUT_SEC";
pub const TRANSPORT_ENV_VAR: &str = "COWORK_TRANSPORT";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3456;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    WebSocket,
    /// In-process scripted backend.
    Mock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Normalized HTTP(S) base of the agent server.
    pub agent_url: String,
    pub client_id: String,
    pub work_dir: PathBuf,
    pub auto_accept: bool,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub connect_timeout: Option<Duration>,
    pub transport: TransportKind,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            agent_url: DEFAULT_AGENT_BASE_URL.to_string(),
            client_id: generated_client_id(),
            work_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            auto_accept: false,
            model: None,
            api_key: None,
            connect_timeout: None,
            transport: TransportKind::WebSocket,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let agent_url = match env_string_opt(AGENT_URL_ENV_VAR) {
            Some(url) => normalize_base_url(&url),
            None => {
                let host = env_string_opt(AGENT_HOST_ENV_VAR)
                    .unwrap_or_else(|| DEFAULT_HOST.to_string());
                let port = match env_string_opt(AGENT_PORT_ENV_VAR) {
                    Some(value) => match value.trim().parse::<u16>() {
                        Ok(port) => port,
                        Err(_) => {
                            return Err(ConfigError::InvalidPort {
                                key: AGENT_PORT_ENV_VAR,
                                value,
                            })
                        }
                    },
                    None => DEFAULT_PORT,
                };
                normalize_base_url(&format!("{}:{port}", host.trim()))
            }
        };

        let connect_timeout = match env_string_opt(CONNECT_TIMEOUT_ENV_VAR) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(seconds) => Some(Duration::from_secs(seconds)),
                Err(_) => {
                    return Err(ConfigError::InvalidTimeout {
                        key: CONNECT_TIMEOUT_ENV_VAR,
                        value,
                    })
                }
            },
            None => None,
        };

        let transport = match env_string_opt(TRANSPORT_ENV_VAR) {
            Some(value) => parse_transport(&value).ok_or(ConfigError::UnknownTransport {
                key: TRANSPORT_ENV_VAR,
                value,
            })?,
            None => TransportKind::default(),
        };

        Ok(Self {
            agent_url,
            client_id: env_string_opt(CLIENT_ID_ENV_VAR).unwrap_or(defaults.client_id),
            work_dir: env_string_opt(WORK_DIR_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            auto_accept: env_flag(AUTO_ACCEPT_ENV_VAR),
            model: env_string_opt(MODEL_ENV_VAR),
            api_key: env_string_opt(API_KEY_ENV_VAR),
            connect_timeout,
            transport,
        })
    }

    pub fn protocol_config(&self) -> ProtocolConfig {
        let config =
            ProtocolConfig::new(self.client_id.clone()).with_base_url(self.agent_url.clone());
        match self.connect_timeout {
            Some(timeout) => config.with_connect_timeout(timeout),
            None => config,
        }
    }

    pub fn settings_overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            model: self.model.clone(),
            api_key: self.api_key.clone(),
        }
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(self.work_dir.clone()).with_auto_accept(self.auto_accept)
    }
}

fn generated_client_id() -> String {
    format!("cowork-{}", Uuid::new_v4().simple())
}

fn parse_transport(value: &str) -> Option<TransportKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "ws" | "websocket" => Some(TransportKind::WebSocket),
        "mock" => Some(TransportKind::Mock),
        _ => None,
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value.trim() == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
        LOCK.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    const ALL_KEYS: [&str; 10] = [
        AGENT_HOST_ENV_VAR,
        AGENT_PORT_ENV_VAR,
        AGENT_URL_ENV_VAR,
        CLIENT_ID_ENV_VAR,
        WORK_DIR_ENV_VAR,
        AUTO_ACCEPT_ENV_VAR,
        MODEL_ENV_VAR,
        API_KEY_ENV_VAR,
        CONNECT_TIMEOUT_ENV_VAR,
        TRANSPORT_ENV_VAR,
    ];

    fn clear_all() -> Vec<EnvGuard> {
        ALL_KEYS
            .iter()
            .map(|key| set_env_guard(*key, None))
            .collect()
    }

    #[test]
    fn defaults_point_at_local_agent() {
        let _lock = env_lock();
        let _guards = clear_all();

        let config = ClientConfig::from_env().expect("default config");
        assert_eq!(config.agent_url, "http://127.0.0.1:3456");
        assert!(config.client_id.starts_with("cowork-"));
        assert!(!config.auto_accept);
        assert_eq!(config.transport, TransportKind::WebSocket);
        assert_eq!(config.connect_timeout, None);
        assert_eq!(
            config.protocol_config().websocket_url(),
            format!("ws://127.0.0.1:3456/ws/{}", config.client_id)
        );
    }

    #[test]
    fn host_and_port_compose_the_agent_url() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _host = set_env_guard(AGENT_HOST_ENV_VAR, Some("10.0.0.5"));
        let _port = set_env_guard(AGENT_PORT_ENV_VAR, Some("9000"));

        let config = ClientConfig::from_env().expect("config");
        assert_eq!(config.agent_url, "http://10.0.0.5:9000");
    }

    #[test]
    fn explicit_url_wins_over_host_and_port() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _host = set_env_guard(AGENT_HOST_ENV_VAR, Some("ignored"));
        let _url = set_env_guard(AGENT_URL_ENV_VAR, Some("wss://agent.example/ws/x"));

        let config = ClientConfig::from_env().expect("config");
        assert_eq!(config.agent_url, "https://agent.example");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _model = set_env_guard(MODEL_ENV_VAR, Some("   "));
        let _port = set_env_guard(AGENT_PORT_ENV_VAR, Some(""));
        let _auto = set_env_guard(AUTO_ACCEPT_ENV_VAR, Some("true"));

        let config = ClientConfig::from_env().expect("config");
        assert_eq!(config.model, None);
        assert_eq!(config.agent_url, "http://127.0.0.1:3456");
        assert!(!config.auto_accept, "only `1` enables auto-accept");
        assert!(config.settings_overrides().is_effectively_empty());
    }

    #[test]
    fn invalid_values_are_reported_with_their_key() {
        let _lock = env_lock();
        let _guards = clear_all();

        let _port = set_env_guard(AGENT_PORT_ENV_VAR, Some("http"));
        assert_eq!(
            ClientConfig::from_env().expect_err("bad port"),
            ConfigError::InvalidPort {
                key: AGENT_PORT_ENV_VAR,
                value: "http".to_string()
            }
        );
        drop(_port);

        let _transport = set_env_guard(TRANSPORT_ENV_VAR, Some("carrier-pigeon"));
        assert!(matches!(
            ClientConfig::from_env(),
            Err(ConfigError::UnknownTransport { .. })
        ));
    }

    #[test]
    fn session_settings_come_from_env() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _auto = set_env_guard(AUTO_ACCEPT_ENV_VAR, Some("1"));
        let _dir = set_env_guard(WORK_DIR_ENV_VAR, Some("/srv/project"));
        let _model = set_env_guard(MODEL_ENV_VAR, Some("kimi-k2"));
        let _timeout = set_env_guard(CONNECT_TIMEOUT_ENV_VAR, Some("7"));
        let _transport = set_env_guard(TRANSPORT_ENV_VAR, Some("MOCK"));

        let config = ClientConfig::from_env().expect("config");
        let context = config.session_context();
        assert!(context.auto_accept);
        assert_eq!(context.work_dir, PathBuf::from("/srv/project"));
        assert_eq!(config.settings_overrides().effective_model(), Some("kimi-k2"));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(7)));
        assert_eq!(config.transport, TransportKind::Mock);
    }
}
