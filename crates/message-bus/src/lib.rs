//! The messaging core: a connection-agnostic pub-sub-plus-durable-queue
//! router backed by a Redis-shaped broker.
//!
//! ```text
//!                    ┌────────────────────┐
//!                    │   Message Router    │  subscribe / send_direct /
//!                    │      (router)       │  broadcast / get_pending
//!                    └──────────┬──────────┘
//!                   ┌───────────┴────────────┐
//!          ┌────────▼────────┐      ┌────────▼────────┐
//!          │  PubSub Manager  │      │  Queue Manager   │
//!          │    (pubsub)      │      │     (queue)      │
//!          └────────┬────────┘      └────────┬────────┘
//!                   └────────────┬────────────┘
//!                        ┌───────▼────────┐
//!                        │  Broker Client  │  publish/subscribe/queue ops
//!                        │    (broker)     │  over a pooled connection
//!                        └───────┬────────┘
//!                        ┌───────▼────────┐
//!                        │  Health Prober  │
//!                        │    (health)     │
//!                        └────────────────┘
//! ```
//!
//! Connection/session management (the WebSocket-facing half of the core)
//! lives in `ai-bus-api`; this crate only knows about topics, queues and
//! messages, never about sockets.

pub mod broker;
pub mod health;
pub mod pubsub;
pub mod queue;
pub mod router;

pub use broker::BrokerClient;
pub use health::{HealthChecker, HealthReport, HealthStatus};
pub use pubsub::PubSubManager;
pub use queue::QueueManager;
pub use router::MessageRouter;
