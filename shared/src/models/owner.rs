//! Owner Account Model

use serde::{Deserialize, Serialize};

/// Restaurant owner account; every owner has its own order partition.
///
/// Identity (`id`) is immutable; contact fields are mutable and may be
/// missing on old records, so deserialization defaults them to empty.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Owner {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub phone: String,
}

impl Owner {
    /// Name shown in admin listings; falls back to the email when the
    /// account never set a display name
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.email
        } else {
            &self.display_name
        }
    }
}
