//! # AI Agent Collaboration Bus — HTTP/WebSocket collaborator
//!
//! This crate is the connection-facing half of the bus: it terminates
//! WebSocket sessions, serves the HTTP CRUD surface for workspaces,
//! sandboxes and messages, and issues/verifies JWTs. It depends on
//! `ai-bus-message-bus` for everything topic- and queue-shaped; the core
//! itself has no idea this crate exists.
//!
//! ```text
//! ┌─────────────────────┐
//! │   WebSocket /ws      │ <- connect / subscribe / send / broadcast
//! ├─────────────────────┤
//! │   HTTP CRUD          │ <- /auth, /workspaces, /sandboxes, /messages
//! ├─────────────────────┤
//! │  Session Handler      │ <- frame <-> Message Router translation
//! ├─────────────────────┤
//! │ Connection Manager    │ <- sockets, indices, heartbeat
//! ├─────────────────────┤
//! │   Message Router       │ <- ai-bus-message-bus (the core)
//! └─────────────────────┘
//! ```

pub mod connection;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod session;
pub mod types;

pub use server::{AppState, BusServer};
