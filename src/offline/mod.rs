//! Offline operation queue
//!
//! Mutations made without connectivity are queued, persisted to local
//! storage and replayed through per-entity handlers once back online.
//!
//! # Usage
//!
//! ```ignore
//! let queue = Arc::new(OfflineQueue::open(storage, handlers, connectivity, settings)?);
//! queue.spawn_auto_sync();
//!
//! queue.enqueue(OperationKind::Create, "task", json!({ "title": "Follow up" }));
//! let result = queue.sync().await;
//! ```

mod connectivity;
mod handler;
mod models;
mod queue;
mod storage;

pub use connectivity::Connectivity;
pub use handler::{HandlerRegistry, OperationError, OperationHandler};
pub use models::{OperationKind, QueuedOperation, SyncResult};
pub use queue::{ListenerId, OfflineQueue, QueueEvent};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
