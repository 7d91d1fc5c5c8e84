//! # Prople Agent HTTP
//!
//! Runs the agent core over HTTP: TOML configuration, the `http(s)` transport with its inbound
//! route, the HTTP credential value source and [`AgentService`], which wires everything from a
//! [`Config`].
pub mod common;
pub mod config;
pub mod transport;

mod service;
pub use service::{AgentService, Connections, Credentials, DidAuth, Proofs, ServiceLedger};

pub use config::Config;
pub use config::Parser as ConfigManager;
