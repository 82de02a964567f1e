#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;
use std::sync::{Arc, Mutex};

use common::{JobKind, MockEngine, QueueKind};
use queue_core::{JobId, QueueEvent, QueueEventKind, QueueHandle};
use queue_manager::{ManagerConfig, ManagerError, QueueManager};

type Manager = QueueManager<MockEngine, JobKind, QueueKind>;

fn manager() -> Manager {
    let config = ManagerConfig::new()
        .with_queue(QueueKind::Queue1, true)
        .with_queue(QueueKind::Queue2, true)
        .with_queue(QueueKind::Queue3, false);
    QueueManager::from_config(config, MockEngine::new())
}

fn wrappers(manager: &Manager, kind: QueueEventKind) -> Vec<usize> {
    manager
        .queue_names()
        .filter_map(|name| manager.get_queue(name))
        .map(|queue| queue.listener_count(kind))
        .collect()
}

fn emit_everywhere(manager: &Manager, event: &QueueEvent) {
    for name in manager.queue_names() {
        if let Some(queue) = manager.get_queue(name) {
            queue.emit(event);
        }
    }
}

#[test]
fn test_listener_receives_originating_queue() -> Result<(), Box<dyn Error>> {
    let manager = manager();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    manager.on_fn(QueueEventKind::Removed, move |queue, event| {
        sink.lock().unwrap().push((queue.name().to_string(), event.job_id()));
    });

    let id = JobId::new();
    let queue2 = manager.get_queue(&QueueKind::Queue2).ok_or("Queue2 missing")?;
    queue2.emit(&QueueEvent::Removed { job_id: id });

    assert_eq!(*seen.lock().unwrap(), vec![("Queue2".to_string(), Some(id))]);
    Ok(())
}

#[test]
fn test_off_removes_exactly_the_wrappers() -> Result<(), Box<dyn Error>> {
    let manager = manager();
    let calls = Arc::new(Mutex::new(0));

    let kept_calls = calls.clone();
    let kept = manager.on_fn(QueueEventKind::Paused, move |_, _| {
        *kept_calls.lock().unwrap() += 1;
    });
    let removed = manager.on_fn(QueueEventKind::Paused, |_, _| {
        panic!("detached listener was called");
    });
    assert_eq!(wrappers(&manager, QueueEventKind::Paused), vec![2, 2]);
    assert_eq!(manager.subscriptions(), 2);

    manager.off(QueueEventKind::Paused, removed)?;
    assert_eq!(wrappers(&manager, QueueEventKind::Paused), vec![1, 1]);

    emit_everywhere(&manager, &QueueEvent::Paused);
    assert_eq!(*calls.lock().unwrap(), 2);

    manager.off(QueueEventKind::Paused, kept)?;
    assert_eq!(wrappers(&manager, QueueEventKind::Paused), vec![0, 0]);
    assert_eq!(manager.subscriptions(), 0);
    Ok(())
}

#[test]
fn test_off_rejects_unknown_subscriptions() -> Result<(), Box<dyn Error>> {
    let manager = manager();
    let id = manager.on_fn(QueueEventKind::Resumed, |_, _| {});

    // Wrong kind leaves the subscription in place.
    let err = manager.off(QueueEventKind::Paused, id).unwrap_err();
    assert!(matches!(err, ManagerError::NotRegistered { kind: QueueEventKind::Paused }));
    assert_eq!(wrappers(&manager, QueueEventKind::Resumed), vec![1, 1]);

    manager.off(QueueEventKind::Resumed, id)?;
    let err = manager.off(QueueEventKind::Resumed, id).unwrap_err();
    assert!(matches!(err, ManagerError::NotRegistered { .. }));
    Ok(())
}

#[test]
fn test_once_fires_once_per_queue() -> Result<(), Box<dyn Error>> {
    let manager = manager();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    manager.once_fn(QueueEventKind::Error, move |queue, _| {
        sink.lock().unwrap().push(queue.name().to_string());
    });
    assert_eq!(manager.subscriptions(), 0);

    let event = QueueEvent::Error {
        message: "boom".to_string(),
    };
    emit_everywhere(&manager, &event);
    emit_everywhere(&manager, &event);

    assert_eq!(*seen.lock().unwrap(), vec!["Queue1", "Queue2"]);
    assert_eq!(wrappers(&manager, QueueEventKind::Error), vec![0, 0]);
    Ok(())
}

#[tokio::test]
async fn test_close_event_reaches_listeners() -> Result<(), Box<dyn Error>> {
    let manager = manager();
    let closed = Arc::new(Mutex::new(Vec::new()));

    let sink = closed.clone();
    manager.on_fn(QueueEventKind::Closed, move |queue, _| {
        sink.lock().unwrap().push(queue.name().to_string());
    });

    manager.wait_until_ready().await?;
    manager.close().await?;

    let mut closed = closed.lock().unwrap().clone();
    closed.sort();
    assert_eq!(closed, vec!["Queue1", "Queue2"]);
    Ok(())
}
