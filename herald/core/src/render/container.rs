//! Toast Container
//!
//! The shared visible area toasts are appended to. Each entry is independent:
//! it has its own id, its own shown-at time and its own dismissal rule, and
//! removing one never touches another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::template::ToastElement;

/// Container shared between the channel runtime and local callers
pub type SharedContainer = Arc<Mutex<ToastContainer>>;

/// Unique identifier for a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl ToastId {
    /// Creates a new unique toast ID
    #[must_use]
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ToastId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ToastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// How a toast leaves the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Hidden automatically once the delay has elapsed
    AutoHide(Duration),
    /// Stays until closed
    Sticky,
}

/// A toast on display
#[derive(Debug, Clone)]
pub struct Toast {
    id: ToastId,
    element: ToastElement,
    shown_at: Instant,
    visibility: Visibility,
}

impl Toast {
    /// Toast id
    #[must_use]
    pub fn id(&self) -> ToastId {
        self.id
    }

    /// Rendered element
    #[must_use]
    pub fn element(&self) -> &ToastElement {
        &self.element
    }

    /// When it was shown
    #[must_use]
    pub fn shown_at(&self) -> Instant {
        self.shown_at
    }

    /// Dismissal rule
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether this toast persists until closed
    #[must_use]
    pub fn is_sticky(&self) -> bool {
        self.visibility == Visibility::Sticky
    }

    /// When it auto-hides, if ever
    #[must_use]
    pub fn expires_at(&self) -> Option<Instant> {
        match self.visibility {
            Visibility::AutoHide(delay) => Some(self.shown_at + delay),
            Visibility::Sticky => None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }
}

/// Visible toasts, oldest first
#[derive(Debug, Default)]
pub struct ToastContainer {
    toasts: Vec<Toast>,
}

impl ToastContainer {
    /// Creates an empty container
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty container ready to be shared
    #[must_use]
    pub fn shared() -> SharedContainer {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Show `element` and return its id
    pub fn append(&mut self, element: ToastElement, visibility: Visibility, now: Instant) -> ToastId {
        let id = ToastId::new();
        debug!(%id, ?visibility, "Showing toast");
        self.toasts.push(Toast {
            id,
            element,
            shown_at: now,
            visibility,
        });
        id
    }

    /// User-initiated close; works for sticky and transient toasts
    ///
    /// Returns the removed toast, or `None` if it was already gone.
    pub fn close(&mut self, id: ToastId) -> Option<Toast> {
        let pos = self.toasts.iter().position(|t| t.id == id)?;
        debug!(%id, "Closing toast");
        Some(self.toasts.remove(pos))
    }

    /// Remove every transient toast whose delay has elapsed at `now`
    pub fn expire(&mut self, now: Instant) -> Vec<Toast> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.toasts)
            .into_iter()
            .partition(|t| t.is_expired(now));
        self.toasts = kept;

        for toast in &expired {
            debug!(id = %toast.id, "Toast auto-hidden");
        }
        expired
    }

    /// Earliest pending auto-hide
    #[must_use]
    pub fn next_expiry(&self) -> Option<Instant> {
        self.toasts.iter().filter_map(Toast::expires_at).min()
    }

    /// Look up a visible toast
    #[must_use]
    pub fn get(&self, id: ToastId) -> Option<&Toast> {
        self.toasts.iter().find(|t| t.id == id)
    }

    /// Whether a toast is still visible
    #[must_use]
    pub fn contains(&self, id: ToastId) -> bool {
        self.get(id).is_some()
    }

    /// Visible toasts, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    /// Number of visible toasts
    #[must_use]
    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    /// Whether nothing is visible
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
