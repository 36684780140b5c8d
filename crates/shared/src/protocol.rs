use serde::{Deserialize, Serialize};

use crate::domain::ConsentRecord;

/// Notification that a persisted value changed outside the current owner,
/// e.g. in another tab. `new_value` is `None` when the entry was removed.
/// `writer` identifies the jar handle that made the write, when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChange {
    pub key: String,
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<u64>,
}

impl StorageChange {
    pub fn updated(key: impl Into<String>, new_value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: Some(new_value.into()),
            writer: None,
        }
    }

    pub fn removed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: None,
            writer: None,
        }
    }

    pub fn from_writer(mut self, writer: u64) -> Self {
        self.writer = Some(writer);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// A decision made through this owner.
    Local,
    /// Adopted from a [`StorageChange`] notification or a jar re-read.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ConsentEvent {
    Changed {
        record: ConsentRecord,
        origin: ChangeOrigin,
    },
}

impl ConsentEvent {
    pub fn record(&self) -> ConsentRecord {
        match self {
            ConsentEvent::Changed { record, .. } => *record,
        }
    }
}
