//! Change notifications emitted by storage writes.

use crate::Partition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Before/after values of one key. A missing side means the key was absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// Changes keyed by storage key.
pub type ChangeSet = BTreeMap<String, StorageChange>;

/// A batch of changes applied to one partition by a single operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub partition: Partition,
    pub changes: ChangeSet,
}
