//! Terminal front end for a cowork agent.
//!
//! ## Transport selection
//!
//! - `COWORK_TRANSPORT=ws` (default) talks to the agent server at
//!   `COWORK_AGENT_URL`, or `AGENT_HOST`/`AGENT_PORT`.
//! - `COWORK_TRANSPORT=mock` runs against the in-process scripted backend,
//!   useful offline.
//!
//! Plain input lines are chat messages; `/help` lists the slash commands.

pub mod app;
pub mod approval;
pub mod commands;
pub mod refresh;
pub mod render;
