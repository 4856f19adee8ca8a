//! Data models for the offline operation queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of mutation a queued operation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mutating action waiting to be replayed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: Uuid,
    pub kind: OperationKind,
    /// Business object the operation targets (e.g. "task", "client")
    pub entity: String,
    pub data: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueuedOperation {
    pub fn new(kind: OperationKind, entity: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            entity: entity.into(),
            data,
            enqueued_at: Utc::now(),
            retry_count: 0,
            last_error: None,
        }
    }
}

/// Outcome of one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: usize,
    /// Failed attempts, including operations dropped after their last retry
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_operation_defaults() {
        let op = QueuedOperation::new(OperationKind::Update, "task", json!({"id": 7}));
        assert_eq!(op.retry_count, 0);
        assert!(op.last_error.is_none());
        assert_eq!(op.entity, "task");
    }

    #[test]
    fn test_deserialize_without_retry_fields() {
        let id = Uuid::new_v4();
        let raw = json!({
            "id": id,
            "kind": "delete",
            "entity": "client",
            "data": {"id": 3},
            "enqueued_at": "2025-02-01T10:00:00Z",
        });
        let op: QueuedOperation = serde_json::from_value(raw).unwrap();
        assert_eq!(op.id, id);
        assert_eq!(op.kind, OperationKind::Delete);
        assert_eq!(op.retry_count, 0);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(OperationKind::parse("create"), Some(OperationKind::Create));
        assert_eq!(OperationKind::parse("upsert"), None);
        assert_eq!(OperationKind::Update.to_string(), "update");
    }
}
