//! Demo: run a queue manager over the in-process actor engine.
//!
//! Reads the manager configuration from the JSON file named by
//! `QUEUE_MANAGER_CONFIG`, or uses a built-in two-queue setup when the
//! variable is unset. Logs every queue event, submits one job per routed
//! kind, then a bulk batch, and closes.

use queue_core::{Job, JobOptions, QueueEventKind, QueueHandle, QueueOptions};
use queue_engine::ActorEngine;
use queue_manager::{ConfigError, ManagerConfig, QueueManager};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn demo_config() -> ManagerConfig<String, String> {
    ManagerConfig::new()
        .with_queue(
            "Queue1".to_string(),
            QueueOptions::default().with_default_job_options(JobOptions::with_attempts(5)),
        )
        .with_queue("Queue2".to_string(), true)
        .with_defaults(
            QueueOptions::default().with_default_job_options(JobOptions::with_attempts(0)),
        )
        .with_route("Job1".to_string(), "Queue1".to_string())
        .with_route("Job2".to_string(), "Queue2".to_string())
        .with_label("demo")
}

async fn load_config() -> Result<ManagerConfig<String, String>, ConfigError> {
    match ManagerConfig::from_env().await {
        Err(ConfigError::MissingEnv(var)) => {
            tracing::info!("{} not set, using the built-in demo configuration", var);
            Ok(demo_config())
        }
        other => other,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config().await?;
    let engine = ActorEngine::start().await?;
    let manager = QueueManager::from_config(config, engine.clone());

    let subscriptions: Vec<_> = QueueEventKind::ALL
        .into_iter()
        .map(|kind| {
            let id = manager.on_fn(kind, |queue, event| {
                tracing::info!(queue = queue.name(), "{}", event.description());
            });
            (kind, id)
        })
        .collect();

    manager.wait_until_ready().await?;

    let kinds: Vec<String> = manager.router().kinds().cloned().collect();
    for kind in &kinds {
        let job = manager.add_job(Job::new(kind.clone(), json!({ "demo": true }))).await?;
        tracing::info!(
            queue = %job.queue,
            job = %job.id,
            attempts = ?job.options.attempts,
            "Submitted {}",
            job.name
        );
    }

    let batch = kinds
        .iter()
        .cycle()
        .take(kinds.len() * 2)
        .enumerate()
        .map(|(n, kind)| Job::new(kind.clone(), json!({ "n": n })))
        .collect();
    for group in manager.add_jobs(batch).await? {
        tracing::info!(queue = %group.queue, jobs = group.jobs.len(), "Bulk submitted");
    }

    for name in manager.queue_names() {
        if let Some(queue) = manager.get_queue(name) {
            tracing::info!(queue = %name, pending = queue.count().await?, "Queue summary");
        }
    }

    manager.close().await?;
    for (kind, id) in subscriptions {
        manager.off(kind, id)?;
    }
    engine.shutdown();
    Ok(())
}
