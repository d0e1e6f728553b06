//! Persistence Store collaborator.
//!
//! Owns the workspace/sandbox/user/audit tables that the messaging core
//! treats as an opaque external contract (`is_agent_in_workspace`). The
//! core itself never depends on this crate.

pub mod models;
pub mod postgres;

pub use postgres::PostgresStore;
