//! Offline queue command implementations
//!
//! The CLI has no network handlers, so the queue is opened offline and never syncs.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use valtrix::Config;
use valtrix::offline::{Connectivity, FileStore, HandlerRegistry, OfflineQueue, OperationKind};

fn open_queue(config: &Config) -> Result<OfflineQueue> {
    OfflineQueue::open(
        Arc::new(FileStore::new(&config.queue.storage_dir)),
        Arc::new(HandlerRegistry::new()),
        Connectivity::new(false),
        config.queue.clone(),
    )
}

pub fn list_command(config: &Config) -> Result<()> {
    let queue = open_queue(config)?;
    let pending = queue.pending();

    if pending.is_empty() {
        println!("No pending operations.");
        return Ok(());
    }

    println!("Pending operations ({}):\n", pending.len());

    for op in pending {
        println!(
            "  {} {} {} (queued {})",
            op.id,
            op.kind,
            op.entity,
            op.enqueued_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!("    {}", op.data);
        if op.retry_count > 0 {
            println!(
                "    Retries: {}/{} - {}",
                op.retry_count,
                config.queue.max_retries,
                op.last_error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

pub fn add_command(config: &Config, kind: &str, entity: &str, data: &str) -> Result<()> {
    let Some(kind) = OperationKind::parse(kind) else {
        bail!("Unknown operation kind: {} (expected create, update or delete)", kind);
    };
    let data: serde_json::Value =
        serde_json::from_str(data).with_context(|| "Operation data must be valid JSON")?;

    let queue = open_queue(config)?;
    let id = queue.enqueue(kind, entity, data);
    queue.shutdown()?;

    println!("Queued {} ({} pending)", id, queue.len());
    Ok(())
}

pub fn drop_command(config: &Config, id: Uuid) -> Result<()> {
    let queue = open_queue(config)?;
    match queue.dequeue(id) {
        Some(op) => println!("Removed {} {} {}", op.id, op.kind, op.entity),
        None => bail!("No pending operation with id {}", id),
    }
    queue.shutdown()
}

pub fn clear_command(config: &Config) -> Result<()> {
    let queue = open_queue(config)?;
    let count = queue.len();
    queue.clear();
    queue.shutdown()?;

    println!("Cleared {} pending operation(s).", count);
    Ok(())
}
