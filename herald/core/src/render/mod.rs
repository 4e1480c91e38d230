//! Toast Rendering
//!
//! Turns notification records into toasts in a shared container.
//!
//! - `template` - immutable toast description and instantiated elements
//! - `container` - the shared visible area and per-toast dismissal
//!
//! The channel runtime only knows the [`NotificationSink`] trait; the
//! [`ToastRenderer`] is the stock implementation.

pub mod container;
pub mod template;

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

pub use container::{SharedContainer, Toast, ToastContainer, ToastId, Visibility};
pub use template::{ToastElement, ToastTemplate};

use crate::messages::{NotificationRecord, NotifyOptions};

/// Default auto-hide delay for transient toasts
pub const DEFAULT_AUTOHIDE: Duration = Duration::from_millis(5000);

/// Receives decoded notifications from the channel runtime
pub trait NotificationSink: Send + Sync + 'static {
    /// Present one notification
    fn deliver(&self, record: NotificationRecord);
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn deliver(&self, record: NotificationRecord) {
        (**self).deliver(record);
    }
}

/// Renderer construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// No toast template was provided
    #[error("Toast template is missing")]
    MissingTemplate,

    /// No toast container was provided
    #[error("Toast container is missing")]
    MissingContainer,
}

/// Builder for [`ToastRenderer`]
#[derive(Debug, Default)]
pub struct ToastRendererBuilder {
    template: Option<ToastTemplate>,
    container: Option<SharedContainer>,
    autohide: Option<Duration>,
}

impl ToastRendererBuilder {
    /// Template to instantiate per toast
    #[must_use]
    pub fn template(mut self, template: ToastTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Container toasts are appended to
    #[must_use]
    pub fn container(mut self, container: SharedContainer) -> Self {
        self.container = Some(container);
        self
    }

    /// Delay before a transient toast hides
    #[must_use]
    pub fn autohide_delay(mut self, delay: Duration) -> Self {
        self.autohide = Some(delay);
        self
    }

    /// Build the renderer
    ///
    /// # Errors
    ///
    /// `RenderError::MissingTemplate` or `RenderError::MissingContainer` when
    /// either was never supplied.
    pub fn build(self) -> Result<ToastRenderer, RenderError> {
        let template = self.template.ok_or(RenderError::MissingTemplate)?;
        let container = self.container.ok_or(RenderError::MissingContainer)?;

        Ok(ToastRenderer {
            template: Arc::new(template),
            container,
            autohide: self.autohide.unwrap_or(DEFAULT_AUTOHIDE),
        })
    }
}

/// Shows notifications as toasts
///
/// Cloning is cheap; clones share the template and container.
#[derive(Clone, Debug)]
pub struct ToastRenderer {
    template: Arc<ToastTemplate>,
    container: SharedContainer,
    autohide: Duration,
}

impl ToastRenderer {
    /// Start building a renderer
    #[must_use]
    pub fn builder() -> ToastRendererBuilder {
        ToastRendererBuilder::default()
    }

    /// Show a toast for `message` with `options`
    pub fn notify(&self, message: impl Into<String>, options: NotifyOptions) -> ToastId {
        self.render(&NotificationRecord::with_options(message, options))
    }

    /// Show a toast for a decoded record
    pub fn render(&self, record: &NotificationRecord) -> ToastId {
        let element = self.template.populate(record);
        let visibility = if record.is_sticky() {
            Visibility::Sticky
        } else {
            Visibility::AutoHide(self.autohide)
        };

        self.container
            .lock()
            .append(element, visibility, Instant::now())
    }

    /// Show messages flashed by the server, oldest first
    ///
    /// The flash category becomes the toast level, except the plain
    /// `message` category which carries none.
    pub fn show_flashed<I, C, M>(&self, messages: I) -> Vec<ToastId>
    where
        I: IntoIterator<Item = (C, M)>,
        C: AsRef<str>,
        M: Into<String>,
    {
        messages
            .into_iter()
            .map(|(category, message)| {
                self.render(&NotificationRecord::from_flash(category.as_ref(), message))
            })
            .collect()
    }

    /// Close a toast; returns `false` if it was already gone
    pub fn close(&self, id: ToastId) -> bool {
        self.container.lock().close(id).is_some()
    }

    /// Hide every transient toast due at `now`
    pub fn expire_due(&self, now: Instant) -> Vec<Toast> {
        self.container.lock().expire(now)
    }

    /// Shared container
    #[must_use]
    pub fn container(&self) -> &SharedContainer {
        &self.container
    }

    /// Auto-hide delay for transient toasts
    #[must_use]
    pub fn autohide_delay(&self) -> Duration {
        self.autohide
    }
}

impl NotificationSink for ToastRenderer {
    fn deliver(&self, record: NotificationRecord) {
        self.render(&record);
    }
}
