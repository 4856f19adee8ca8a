//! Integration tests for the offline queue backed by the file store

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use serde_json::json;
use tempfile::TempDir;

use valtrix::config::QueueSettings;
use valtrix::offline::{
    Connectivity, FileStore, HandlerRegistry, OfflineQueue, OperationKind, QueueEvent,
    SyncResult,
};

fn open_queue(dir: &TempDir, online: bool) -> OfflineQueue {
    OfflineQueue::open(
        Arc::new(FileStore::new(dir.path())),
        Arc::new(HandlerRegistry::new()),
        Connectivity::new(online),
        QueueSettings::default(),
    )
    .expect("Failed to open queue")
}

#[tokio::test]
async fn test_offline_then_online_sync() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, false);
    queue
        .handlers()
        .register_fn("task", |_op| async { Ok::<_, anyhow::Error>(()) });

    for n in 0..3 {
        queue.enqueue(OperationKind::Create, "task", json!({ "n": n }));
    }

    assert_eq!(queue.sync().await, SyncResult { success: 0, failed: 0 });
    assert_eq!(queue.len(), 3);

    queue.connectivity().set_online(true);
    assert_eq!(queue.sync().await, SyncResult { success: 3, failed: 0 });
    assert!(queue.is_empty());

    // Empty state is what gets persisted
    let reopened = open_queue(&dir, true);
    assert!(reopened.is_empty());
}

#[tokio::test]
async fn test_pending_operations_survive_restart() {
    let dir = TempDir::new().unwrap();
    let ids = {
        let queue = open_queue(&dir, false);
        let a = queue.enqueue(OperationKind::Create, "client", json!({"name": "Acme"}));
        let b = queue.enqueue(OperationKind::Update, "task", json!({"done": true}));
        queue.shutdown().unwrap();
        vec![a, b]
    };

    let queue = open_queue(&dir, false);
    let restored: Vec<_> = queue.pending().into_iter().map(|op| op.id).collect();
    assert_eq!(restored, ids);
    assert!(dir.path().join("valtrix_offline_queue.json").exists());
}

#[tokio::test]
async fn test_retry_ceiling_persists_between_passes() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, true);
    queue
        .handlers()
        .register_fn("deal", |_op| async { Err::<(), _>(anyhow!("timeout")) });
    let id = queue.enqueue(OperationKind::Delete, "deal", json!({"id": 4}));

    assert_eq!(queue.sync().await, SyncResult { success: 0, failed: 1 });
    assert_eq!(queue.sync().await, SyncResult { success: 0, failed: 1 });

    // Retry count is durable
    let reopened = open_queue(&dir, true);
    assert_eq!(reopened.pending()[0].retry_count, 2);
    drop(reopened);

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.sync().await, SyncResult { success: 0, failed: 1 });
    assert!(queue.is_empty());
    assert_eq!(queue.dropped()[0].id, id);

    assert!(open_queue(&dir, true).is_empty());
}

#[tokio::test]
async fn test_concurrent_sync_runs_once() {
    let dir = TempDir::new().unwrap();
    let queue = open_queue(&dir, true);
    queue.handlers().register_fn("task", |_op| async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, anyhow::Error>(())
    });
    queue.enqueue(OperationKind::Create, "task", json!({}));

    let (first, second) = futures::join!(queue.sync(), queue.sync());
    assert_eq!(first, SyncResult { success: 1, failed: 0 });
    assert_eq!(second, SyncResult::default());
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_listeners_and_auto_sync() {
    let dir = TempDir::new().unwrap();
    let queue = Arc::new(open_queue(&dir, false));
    queue
        .handlers()
        .register_fn("task", |_op| async { Ok::<_, anyhow::Error>(()) });

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    queue.add_listener(move |event| {
        let _ = tx.send(event.clone());
    });
    queue.spawn_auto_sync();

    queue.enqueue(OperationKind::Create, "task", json!({}));
    assert_eq!(rx.recv().await, Some(QueueEvent::Changed { pending: 1 }));

    queue.connectivity().set_online(true);
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no sync after reconnect");
    assert_eq!(event, Some(QueueEvent::Changed { pending: 0 }));

    queue.shutdown().unwrap();
}
