//! Execution handlers for queued operations
//!
//! Each entity name maps to one handler. Replaying an operation whose entity
//! has no handler fails, so it retries and is eventually dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use super::models::QueuedOperation;

/// Why a replay attempt failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error("No handler registered for entity '{0}'")]
    NoHandler(String),

    #[error("{0}")]
    Failed(String),
}

/// Executes queued operations for one entity
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn execute(&self, operation: &QueuedOperation) -> Result<()>;
}

/// Adapter so plain async closures can be registered
struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> OperationHandler for FnHandler<F>
where
    F: Fn(QueuedOperation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn execute(&self, operation: &QueuedOperation) -> Result<()> {
        (self.0)(operation.clone()).await
    }
}

/// Entity name -> handler
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn OperationHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for `entity`
    pub fn register(&self, entity: impl Into<String>, handler: Arc<dyn OperationHandler>) {
        let entity = entity.into();
        tracing::debug!("Registering queue handler for '{}'", entity);
        self.handlers
            .write()
            .expect("Handler registry lock poisoned")
            .insert(entity, handler);
    }

    /// Register an async closure as the handler for `entity`
    pub fn register_fn<F, Fut>(&self, entity: impl Into<String>, f: F)
    where
        F: Fn(QueuedOperation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register(entity, Arc::new(FnHandler(f)));
    }

    pub fn unregister(&self, entity: &str) -> bool {
        self.handlers
            .write()
            .expect("Handler registry lock poisoned")
            .remove(entity)
            .is_some()
    }

    pub fn get(&self, entity: &str) -> Option<Arc<dyn OperationHandler>> {
        self.handlers
            .read()
            .expect("Handler registry lock poisoned")
            .get(entity)
            .cloned()
    }

    pub fn entities(&self) -> Vec<String> {
        let mut entities: Vec<String> = self
            .handlers
            .read()
            .expect("Handler registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        entities.sort();
        entities
    }

    /// Run the handler registered for the operation's entity
    pub async fn execute(&self, operation: &QueuedOperation) -> Result<(), OperationError> {
        let handler = self
            .get(&operation.entity)
            .ok_or_else(|| OperationError::NoHandler(operation.entity.clone()))?;

        handler
            .execute(operation)
            .await
            .map_err(|e| OperationError::Failed(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::models::OperationKind;
    use anyhow::bail;
    use serde_json::json;

    struct Rejecting;

    #[async_trait]
    impl OperationHandler for Rejecting {
        async fn execute(&self, operation: &QueuedOperation) -> Result<()> {
            bail!("server rejected {}", operation.kind)
        }
    }

    #[tokio::test]
    async fn test_missing_handler_fails() {
        let registry = HandlerRegistry::new();
        let op = QueuedOperation::new(OperationKind::Create, "task", json!({}));
        assert_eq!(
            registry.execute(&op).await,
            Err(OperationError::NoHandler("task".to_string()))
        );
    }

    #[tokio::test]
    async fn test_registered_handlers_run() {
        let registry = HandlerRegistry::new();
        registry.register_fn("task", |_op| async { Ok::<_, anyhow::Error>(()) });
        registry.register("client", Arc::new(Rejecting));

        let task = QueuedOperation::new(OperationKind::Create, "task", json!({}));
        assert_eq!(registry.execute(&task).await, Ok(()));

        let client = QueuedOperation::new(OperationKind::Delete, "client", json!({}));
        assert_eq!(
            registry.execute(&client).await,
            Err(OperationError::Failed("server rejected delete".to_string()))
        );

        assert_eq!(registry.entities(), vec!["client", "task"]);
        assert!(registry.unregister("task"));
        assert!(!registry.unregister("task"));
        assert!(registry.get("task").is_none());
    }
}
