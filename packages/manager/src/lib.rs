//! Queue manager: one facade over a set of named queues.
//!
//! The manager creates a handle for every enabled queue of its
//! configuration, routes each job kind to exactly one queue, and manages the
//! queue set as one unit.
//!
//! # Architecture
//!
//! - `QueueRegistry` - The created queue handles, in name order
//! - `JobRouter` - Job kind to queue name, checked at submission time
//! - `ConnectionState` - disconnected / connecting / connected / closed
//! - `ListenerRegistry` - Fans one listener out over every queue
//! - `QueueManager` - The facade tying them together
//!
//! # Usage
//!
//! ```ignore
//! use queue_core::{Job, QueueOptions};
//! use queue_engine::ActorEngine;
//! use queue_manager::{ManagerConfig, QueueManager};
//!
//! let config = ManagerConfig::<String, String>::new()
//!     .with_queue("emails".into(), true)
//!     .with_route("welcome".into(), "emails".into());
//! let manager = QueueManager::from_config(config, ActorEngine::start().await?);
//!
//! manager.wait_until_ready().await?;
//! manager.add_job(Job::new("welcome".to_string(), serde_json::json!({"to": "a@b.c"}))).await?;
//! manager.close().await?;
//! ```

mod config;
mod error;
mod listeners;
mod manager;
mod registry;
mod router;
mod state;

pub use config::{CONFIG_ENV, ConfigError, ManagerConfig, ManagerOptions};
pub use error::{AggregateError, BranchFailure, LookupError, ManagerError, ManagerResult};
pub use listeners::{Listener, ListenerRegistry, SubscriptionId};
pub use manager::{QueueBatch, QueueManager};
pub use registry::QueueRegistry;
pub use router::JobRouter;
pub use state::{ConnectionState, ConnectionStatus};
