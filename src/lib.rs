//! # OCPP Gateway
//!
//! OCPP 1.6 central-system gateway: accepts persistent WebSocket
//! connections from EV charging stations, speaks the OCPP-J
//! request/response/error protocol, tracks per-station and
//! per-connector/session state, and lets operators push commands to a
//! station with reliable request/response correlation.
//!
//! ## Architecture
//!
//! - **domain**: entities (stations, connectors, credentials, charging
//!   sessions, reservations)
//! - **storage**: persistence contract (`Storage`) plus the in-memory
//!   implementation
//! - **audit**: append-only message log, written best-effort
//! - **session**: live-connection registry
//! - **commands**: outbound command correlation and the remote control
//!   façade
//! - **handlers**: the protocol engine and per-action handlers
//! - **services**: the transaction/session state machine and background
//!   sweeps
//! - **server**: the WebSocket front end

pub mod audit;
pub mod commands;
pub mod config;
pub mod domain;
pub mod handlers;
pub mod server;
pub mod services;
pub mod session;
pub mod shared;
pub mod storage;

pub use config::{default_config_path, AppConfig};
pub use server::OcppServer;
