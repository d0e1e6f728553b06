pub mod auth;
pub mod messages;
pub mod queues;
pub mod sandboxes;
pub mod workspaces;
pub mod ws;
