//! In-process queue engine built on actors.
//!
//! This crate implements the `QueueEngine` / `QueueHandle` interface from
//! `queue_core` with Ractor actors, so the queue manager can run without an
//! external broker.
//!
//! # Architecture
//!
//! - `Supervisor` - Top-level actor that opens queue actors by name
//! - `QueueActor` - Holds one queue's jobs and broadcasts its events
//! - `ActorQueue` - The handle callers hold; owns the event callbacks
//!
//! # Usage
//!
//! ```ignore
//! use queue_core::{QueueEngine, QueueHandle, QueueOptions};
//! use queue_engine::ActorEngine;
//!
//! let engine = ActorEngine::start().await?;
//! let queue = engine.create("emails", QueueOptions::default());
//! queue.wait_until_ready().await?;
//! queue.add("send", serde_json::json!({"to": "a@b.c"}), None).await?;
//! ```

mod engine;
mod handle;
mod listeners;
mod messages;
mod queue_actor;
mod supervisor;

pub use engine::{ActorEngine, EngineConfig};
pub use handle::ActorQueue;
pub use listeners::ListenerTable;
pub use messages::{QueueMessage, SupervisorMessage};
pub use queue_actor::QueueActor;
pub use supervisor::Supervisor;
