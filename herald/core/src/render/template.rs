//! Toast Templates
//!
//! A [`ToastTemplate`] describes what a toast looks like before it carries any
//! content. Every render instantiates a fresh [`ToastElement`] from it; the
//! template itself is never mutated, so concurrent renders cannot bleed into
//! each other.

use std::fmt;

use crate::messages::NotificationRecord;

/// Immutable description of a toast
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToastTemplate {
    base_classes: Vec<String>,
    level_prefix: String,
    icon_prefix: String,
}

impl Default for ToastTemplate {
    fn default() -> Self {
        Self {
            base_classes: vec!["toast".to_string()],
            level_prefix: "text-bg-".to_string(),
            icon_prefix: "fa-".to_string(),
        }
    }
}

impl ToastTemplate {
    /// Template with the stock classes (`toast`, `text-bg-<level>`, `fa-<icon>`)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class every toast carries
    #[must_use]
    pub fn with_base_class(mut self, class: impl Into<String>) -> Self {
        self.base_classes.push(class.into());
        self
    }

    /// Prefix turning a level into a style class
    #[must_use]
    pub fn with_level_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.level_prefix = prefix.into();
        self
    }

    /// Prefix turning an icon identifier into an icon class
    #[must_use]
    pub fn with_icon_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.icon_prefix = prefix.into();
        self
    }

    /// A blank element: base classes, empty message, hidden title and icon
    #[must_use]
    pub fn instantiate(&self) -> ToastElement {
        ToastElement {
            classes: self.base_classes.clone(),
            message: String::new(),
            title: None,
            icon_class: None,
        }
    }

    /// A fresh element populated from `record`
    ///
    /// Absent fields leave their slot hidden and add no style class.
    #[must_use]
    pub fn populate(&self, record: &NotificationRecord) -> ToastElement {
        let mut element = self.instantiate();
        element.message.clone_from(&record.message);

        if let Some(icon) = record.icon() {
            element.icon_class = Some(format!("{}{icon}", self.icon_prefix));
        }
        if let Some(level) = record.level() {
            element.classes.push(format!("{}{level}", self.level_prefix));
        }
        if let Some(title) = record.title() {
            element.title = Some(title.to_string());
        }

        element
    }
}

/// One instantiated toast
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToastElement {
    classes: Vec<String>,
    message: String,
    title: Option<String>,
    icon_class: Option<String>,
}

impl ToastElement {
    /// Message text
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Title text, if the title slot is shown
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Icon class, if the icon slot is shown
    #[must_use]
    pub fn icon_class(&self) -> Option<&str> {
        self.icon_class.as_deref()
    }

    /// Style classes on the toast root
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether the root carries `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

impl fmt::Display for ToastElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.title {
            write!(f, "{title}: ")?;
        }
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::NotifyOptions;

    #[test]
    fn test_instantiate_is_blank() {
        let element = ToastTemplate::new().instantiate();
        assert_eq!(element.message(), "");
        assert!(element.title().is_none());
        assert!(element.icon_class().is_none());
        assert_eq!(element.classes(), ["toast".to_string()]);
    }

    #[test]
    fn test_populate_all_fields() {
        let record = NotificationRecord::with_options(
            "Hole 7 updated",
            NotifyOptions::new()
                .level("info")
                .icon("flag")
                .title("Courses"),
        );
        let element = ToastTemplate::new().populate(&record);

        assert_eq!(element.message(), "Hole 7 updated");
        assert_eq!(element.title(), Some("Courses"));
        assert_eq!(element.icon_class(), Some("fa-flag"));
        assert!(element.has_class("toast"));
        assert!(element.has_class("text-bg-info"));
        assert_eq!(element.to_string(), "Courses: Hole 7 updated");
    }

    #[test]
    fn test_title_without_icon() {
        let record =
            NotificationRecord::with_options("Check this", NotifyOptions::new().title("Alert"));
        let element = ToastTemplate::new().populate(&record);

        assert_eq!(element.title(), Some("Alert"));
        assert!(element.icon_class().is_none());
    }

    #[test]
    fn test_no_optional_fields_uses_defaults() {
        let element = ToastTemplate::new().populate(&NotificationRecord::new("hi"));

        assert!(element.title().is_none());
        assert!(element.icon_class().is_none());
        assert_eq!(element.classes(), ["toast".to_string()]);
        assert_eq!(element.to_string(), "hi");
    }

    #[test]
    fn test_populate_leaves_template_untouched() {
        let template = ToastTemplate::new().with_base_class("fade");
        let before = template.clone();

        let record = NotificationRecord::with_options(
            "x",
            NotifyOptions::new().level("danger").icon("bug").title("t"),
        );
        let first = template.populate(&record);
        let second = template.populate(&NotificationRecord::new("y"));

        assert_eq!(template, before);
        assert!(first.has_class("text-bg-danger"));
        assert!(!second.has_class("text-bg-danger"));
        assert!(second.has_class("fade"));
    }

    #[test]
    fn test_custom_prefixes() {
        let template = ToastTemplate::new()
            .with_level_prefix("is-")
            .with_icon_prefix("icon-");
        let record = NotificationRecord::with_options(
            "custom",
            NotifyOptions::new().level("warning").icon("bell"),
        );
        let element = template.populate(&record);

        assert!(element.has_class("is-warning"));
        assert_eq!(element.icon_class(), Some("icon-bell"));
    }
}
