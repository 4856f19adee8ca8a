//! Offline operation queue
//!
//! Buffers mutations that could not complete and replays them in FIFO order
//! once connectivity returns. Each failed replay bumps the operation's retry
//! count; at the ceiling the operation is dropped into a bounded dead-letter log.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::connectivity::Connectivity;
use super::handler::HandlerRegistry;
use super::models::{OperationKind, QueuedOperation, SyncResult};
use super::storage::KeyValueStore;
use crate::config::QueueSettings;

/// Handle returned by `add_listener`
pub type ListenerId = u64;

/// Notification delivered to queue listeners
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// The queue was mutated; `pending` is its new length
    Changed { pending: usize },
    /// An operation exhausted its retries and left the queue
    Dropped(QueuedOperation),
}

type Listener = Arc<dyn Fn(&QueueEvent) + Send + Sync>;

/// Clears the in-progress flag when a sync pass ends
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct OfflineQueue {
    operations: Mutex<VecDeque<QueuedOperation>>,
    dead_letters: Mutex<VecDeque<QueuedOperation>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
    syncing: AtomicBool,
    storage: Arc<dyn KeyValueStore>,
    handlers: Arc<HandlerRegistry>,
    connectivity: Connectivity,
    settings: QueueSettings,
    auto_sync: Mutex<Option<JoinHandle<()>>>,
}

impl OfflineQueue {
    /// Create the queue, restoring operations persisted by a previous run
    pub fn open(
        storage: Arc<dyn KeyValueStore>,
        handlers: Arc<HandlerRegistry>,
        connectivity: Connectivity,
        settings: QueueSettings,
    ) -> Result<Self> {
        let operations = match storage.get(&settings.storage_key)? {
            Some(raw) => match serde_json::from_str::<Vec<QueuedOperation>>(&raw) {
                Ok(ops) => ops,
                Err(e) => {
                    tracing::warn!(
                        "Discarding unreadable offline queue '{}': {}",
                        settings.storage_key,
                        e
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if !operations.is_empty() {
            tracing::info!("Restored {} queued operations", operations.len());
        }

        Ok(Self {
            operations: Mutex::new(operations.into()),
            dead_letters: Mutex::new(VecDeque::new()),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            syncing: AtomicBool::new(false),
            storage,
            handlers,
            connectivity,
            settings,
            auto_sync: Mutex::new(None),
        })
    }

    fn ops(&self) -> MutexGuard<'_, VecDeque<QueuedOperation>> {
        self.operations.lock().expect("Offline queue lock poisoned")
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn len(&self) -> usize {
        self.ops().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops().is_empty()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Copy of the pending operations in replay order
    pub fn pending(&self) -> Vec<QueuedOperation> {
        self.ops().iter().cloned().collect()
    }

    /// Operations dropped after exhausting their retries, oldest first
    pub fn dropped(&self) -> Vec<QueuedOperation> {
        self.dead_letters
            .lock()
            .expect("Offline queue lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    // ========================================
    // MUTATIONS
    // ========================================

    /// Queue a mutation for later replay. Never fails; a persistence error is
    /// logged and the operation stays queued in memory.
    pub fn enqueue(
        &self,
        kind: OperationKind,
        entity: impl Into<String>,
        data: serde_json::Value,
    ) -> Uuid {
        let operation = QueuedOperation::new(kind, entity, data);
        let id = operation.id;
        tracing::debug!(
            %id,
            kind = %operation.kind,
            entity = %operation.entity,
            "Operation queued"
        );

        self.ops().push_back(operation);
        self.persist_logged();
        self.notify_changed();
        id
    }

    /// Remove one operation regardless of its state
    pub fn dequeue(&self, id: Uuid) -> Option<QueuedOperation> {
        let removed = self.take(id);
        if removed.is_some() {
            self.persist_logged();
            self.notify_changed();
        }
        removed
    }

    /// Empty the queue
    pub fn clear(&self) {
        let count = {
            let mut ops = self.ops();
            let count = ops.len();
            ops.clear();
            count
        };
        tracing::info!("Cleared {} queued operations", count);
        self.persist_logged();
        self.notify_changed();
    }

    fn take(&self, id: Uuid) -> Option<QueuedOperation> {
        let mut ops = self.ops();
        let index = ops.iter().position(|op| op.id == id)?;
        ops.remove(index)
    }

    /// Count a failed attempt; returns the operation if it hit the retry ceiling
    fn record_failure(&self, id: Uuid, error: &str) -> Option<QueuedOperation> {
        let mut ops = self.ops();
        let index = ops.iter().position(|op| op.id == id)?;

        let op = &mut ops[index];
        op.retry_count += 1;
        op.last_error = Some(error.to_string());

        if op.retry_count < self.settings.max_retries {
            tracing::debug!(%id, retry = op.retry_count, "Replay failed, will retry: {}", error);
            return None;
        }
        ops.remove(index)
    }

    fn push_dead_letter(&self, operation: QueuedOperation) {
        tracing::warn!(
            id = %operation.id,
            entity = %operation.entity,
            retries = operation.retry_count,
            "Dropping operation after max retries: {}",
            operation.last_error.as_deref().unwrap_or("unknown error")
        );

        let mut dead = self.dead_letters.lock().expect("Offline queue lock poisoned");
        dead.push_back(operation);
        while dead.len() > self.settings.dead_letter_capacity {
            dead.pop_front();
        }
    }

    // ========================================
    // SYNC
    // ========================================

    /// Replay every queued operation once, in FIFO order.
    ///
    /// Returns `{0, 0}` without touching the queue when offline, when another
    /// sync is running, or when there is nothing to do.
    pub async fn sync(&self) -> SyncResult {
        if !self.connectivity.is_online() {
            tracing::debug!("Skipping sync: offline");
            return SyncResult::default();
        }

        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Skipping sync: already in progress");
            return SyncResult::default();
        }
        let _guard = SyncGuard(&self.syncing);

        let snapshot = self.pending();
        if snapshot.is_empty() {
            return SyncResult::default();
        }

        let mut result = SyncResult::default();
        let mut dropped = Vec::new();

        for operation in snapshot {
            match self.handlers.execute(&operation).await {
                Ok(()) => {
                    self.take(operation.id);
                    result.success += 1;
                }
                Err(e) => {
                    result.failed += 1;
                    if let Some(exhausted) = self.record_failure(operation.id, &e.to_string()) {
                        dropped.push(exhausted);
                    }
                }
            }
        }

        self.persist_logged();
        for operation in dropped {
            self.push_dead_letter(operation.clone());
            self.notify(&QueueEvent::Dropped(operation));
        }
        self.notify_changed();

        tracing::info!(
            success = result.success,
            failed = result.failed,
            remaining = self.len(),
            "Offline queue sync finished"
        );
        result
    }

    // ========================================
    // LIFECYCLE
    // ========================================

    /// Start a background task that syncs whenever connectivity goes from
    /// offline to online. Replaces a previously started task.
    pub fn spawn_auto_sync(self: &Arc<Self>) {
        let queue: Weak<Self> = Arc::downgrade(self);
        let mut rx = self.connectivity.subscribe();
        // Read before spawning so a transition right after this call is not missed
        let mut was_online = *rx.borrow_and_update();

        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online && !was_online {
                    let Some(queue) = queue.upgrade() else {
                        break;
                    };
                    queue.sync().await;
                }
                was_online = online;
            }
        });

        if let Some(previous) = self
            .auto_sync
            .lock()
            .expect("Offline queue lock poisoned")
            .replace(handle)
        {
            previous.abort();
        }
    }

    /// Stop auto-sync and flush the queue to storage
    pub fn shutdown(&self) -> Result<()> {
        if let Some(handle) = self.auto_sync.lock().expect("Offline queue lock poisoned").take() {
            handle.abort();
        }
        self.persist()
    }

    // ========================================
    // PERSISTENCE & LISTENERS
    // ========================================

    fn persist(&self) -> Result<()> {
        let raw = {
            let ops = self.ops();
            serde_json::to_string(&*ops).context("Failed to serialize offline queue")?
        };
        self.storage
            .set(&self.settings.storage_key, &raw)
            .with_context(|| {
                format!("Failed to persist offline queue '{}'", self.settings.storage_key)
            })
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            tracing::warn!("{:#}", e);
        }
    }

    /// Register a callback invoked after every queue mutation
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .expect("Offline queue lock poisoned")
            .push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().expect("Offline queue lock poisoned");
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn notify_changed(&self) {
        let pending = self.len();
        self.notify(&QueueEvent::Changed { pending });
    }

    fn notify(&self, event: &QueueEvent) {
        // Called without holding the listener lock so callbacks may query the queue
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .expect("Offline queue lock poisoned")
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl Drop for OfflineQueue {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.auto_sync.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
