use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two storage namespaces. Keys are unique per partition only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Device-local, uncapped.
    #[default]
    Local,
    /// Replicated across the user's devices, size-capped.
    Sync,
}

impl Partition {
    /// Area name as reported in change notifications.
    #[must_use]
    pub const fn area_name(&self) -> &'static str {
        match self {
            Partition::Local => "local",
            Partition::Sync => "sync",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.area_name())
    }
}
