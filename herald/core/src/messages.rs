//! Notification Messages
//!
//! The structured form of one inbound push message. A record is created per
//! decoded frame, handed to whichever sink renders it, and dropped afterwards.
//!
//! # Design Philosophy
//!
//! Every field except `message` is optional and must degrade gracefully:
//! renderers fall back to default styling, no title and no icon when the
//! corresponding option is absent.

use serde::{Deserialize, Serialize};

/// Flash category that carries no level
const PLAIN_FLASH_CATEGORY: &str = "message";

/// Optional presentation hints carried alongside a notification message
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyOptions {
    /// Free-form severity tag (e.g. "info", "warning", "danger")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Icon identifier resolved by the icon font
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Heading shown above the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// When true the toast stays until explicitly closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticky: Option<bool>,
}

impl NotifyOptions {
    /// Options with every field absent
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the severity tag
    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Set the icon identifier
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the heading
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Mark the notification sticky (or not)
    #[must_use]
    pub fn sticky(mut self, sticky: bool) -> Self {
        self.sticky = Some(sticky);
        self
    }
}

/// One decoded notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Display text
    pub message: String,
    /// Presentation hints
    #[serde(flatten)]
    pub options: NotifyOptions,
}

impl NotificationRecord {
    /// Record with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            options: NotifyOptions::default(),
        }
    }

    /// Record with a message and options
    pub fn with_options(message: impl Into<String>, options: NotifyOptions) -> Self {
        Self {
            message: message.into(),
            options,
        }
    }

    /// Record for a message flashed by the server under `category`
    ///
    /// The category becomes the level, except the plain `message` category
    /// (or an empty one) which carries none.
    pub fn from_flash(category: &str, message: impl Into<String>) -> Self {
        let mut options = NotifyOptions::new();
        if !category.is_empty() && category != PLAIN_FLASH_CATEGORY {
            options = options.level(category);
        }
        Self::with_options(message, options)
    }

    /// Severity tag, if any
    #[must_use]
    pub fn level(&self) -> Option<&str> {
        self.options.level.as_deref()
    }

    /// Icon identifier, if any
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.options.icon.as_deref()
    }

    /// Heading, if any
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.options.title.as_deref()
    }

    /// Whether the toast should persist until closed
    #[must_use]
    pub fn is_sticky(&self) -> bool {
        self.options.sticky.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flash() {
        let record = NotificationRecord::from_flash("warning", "Player(s) deleted");
        assert_eq!(record.level(), Some("warning"));
        assert_eq!(record.message, "Player(s) deleted");

        assert!(NotificationRecord::from_flash("message", "Hi").level().is_none());
        assert!(NotificationRecord::from_flash("", "Hi").level().is_none());
    }

    #[test]
    fn test_record_defaults() {
        let record = NotificationRecord::new("Saved");
        assert_eq!(record.message, "Saved");
        assert!(record.level().is_none());
        assert!(record.icon().is_none());
        assert!(record.title().is_none());
        assert!(!record.is_sticky());
    }

    #[test]
    fn test_options_builder() {
        let record = NotificationRecord::with_options(
            "Disk almost full",
            NotifyOptions::new()
                .level("warning")
                .icon("triangle-exclamation")
                .title("Storage")
                .sticky(true),
        );

        assert_eq!(record.level(), Some("warning"));
        assert_eq!(record.icon(), Some("triangle-exclamation"));
        assert_eq!(record.title(), Some("Storage"));
        assert!(record.is_sticky());
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = NotificationRecord::with_options("hi", NotifyOptions::new().level("info"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"message": "hi", "level": "info"}));
    }
}
