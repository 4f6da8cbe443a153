//! Wire format of notifier messages.
//!
//! One outbound shape, serialized as a JSON text frame:
//!
//! ```json
//! {"action":"reload","changedFiles":["popup.js"]}
//! ```

use serde::{Deserialize, Serialize};

/// Event name carried in `action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadAction {
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadEvent {
    pub action: ReloadAction,
    pub changed_files: Vec<String>,
}

impl ReloadEvent {
    #[must_use]
    pub fn reload(changed_files: Vec<String>) -> Self {
        Self {
            action: ReloadAction::Reload,
            changed_files,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        // Only strings and a unit enum: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let event = ReloadEvent::reload(vec!["popup.js".to_string()]);
        assert_eq!(
            event.to_json(),
            r#"{"action":"reload","changedFiles":["popup.js"]}"#
        );
    }

    #[test]
    fn test_parse_from_client_side_shape() {
        let event: ReloadEvent =
            serde_json::from_str(r#"{"action":"reload","changedFiles":[]}"#).unwrap();
        assert_eq!(event, ReloadEvent::reload(Vec::new()));
    }
}
