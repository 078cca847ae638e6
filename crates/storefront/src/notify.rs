//! Transient notifications.
//!
//! Lifecycle: `Queued -> Visible -> Dismissing -> Removed`. A toast is
//! queued while its markup is built and becomes visible once attached to the
//! stacking container. Dismissal (timer or close button) starts the exit
//! animation; removal detaches the toast and drops the container once empty.
//!
//! Concurrent notifications stack. The presenter owns no timers: callers
//! schedule the display and exit delays and call back into
//! [`Notifier::dismiss`] and [`Notifier::remove`].

use std::fmt;

use dcl_core::NotificationKind;

use crate::classes;
use crate::dom::{Document, NodeId};

/// Handle to a shown notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
    /// Parse the value of a close button's `data-notification-id`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse().ok().map(Self)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a notification is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationState {
    Queued,
    Visible,
    Dismissing,
    Removed,
}

#[derive(Debug)]
struct Toast {
    id: NotificationId,
    node: NodeId,
    kind: NotificationKind,
    message: String,
    state: NotificationState,
}

/// Stacking notification presenter.
#[derive(Debug, Default)]
pub struct Notifier {
    next_id: u64,
    toasts: Vec<Toast>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a toast and stack it in the container, creating the container
    /// on demand.
    pub fn show(&mut self, doc: &mut Document, message: &str, kind: NotificationKind) -> NotificationId {
        let id = NotificationId(self.next_id);
        self.next_id += 1;

        let node = build_toast(doc, id, message, kind);
        self.toasts.push(Toast {
            id,
            node,
            kind,
            message: message.to_string(),
            state: NotificationState::Queued,
        });

        let container = container(doc);
        doc.append_child(container, node);
        self.set_state(id, NotificationState::Visible);

        tracing::debug!(id = %id, kind = %kind, message, "Notification shown");
        id
    }

    /// Start the exit animation. Returns false unless the toast was visible.
    pub fn dismiss(&mut self, doc: &mut Document, id: NotificationId) -> bool {
        let Some(toast) = self.toast_mut(id) else {
            return false;
        };
        if toast.state != NotificationState::Visible {
            return false;
        }
        toast.state = NotificationState::Dismissing;
        doc.add_class(toast.node, classes::FADE_OUT);
        true
    }

    /// Dispose of a dismissing toast, and the container if it is now empty.
    /// Returns false unless the toast was dismissing.
    pub fn remove(&mut self, doc: &mut Document, id: NotificationId) -> bool {
        let Some(index) = self
            .toasts
            .iter()
            .position(|t| t.id == id && t.state == NotificationState::Dismissing)
        else {
            return false;
        };
        let toast = self.toasts.remove(index);
        let parent = doc.parent(toast.node);
        doc.dispose(toast.node);

        if let Some(container) = parent
            && doc.children(container).is_empty()
        {
            doc.dispose(container);
        }
        true
    }

    /// Lifecycle state of a notification, `None` for ids never issued.
    #[must_use]
    pub fn state(&self, id: NotificationId) -> Option<NotificationState> {
        if id.0 >= self.next_id {
            return None;
        }
        Some(
            self.toasts
                .iter()
                .find(|t| t.id == id)
                .map_or(NotificationState::Removed, |t| t.state),
        )
    }

    /// Notifications still in the document, oldest first.
    pub fn active(&self) -> impl Iterator<Item = (NotificationId, NotificationKind, &str)> {
        self.toasts
            .iter()
            .map(|t| (t.id, t.kind, t.message.as_str()))
    }

    /// Most recent notification still in the document.
    #[must_use]
    pub fn latest(&self) -> Option<(NotificationKind, &str)> {
        self.toasts.last().map(|t| (t.kind, t.message.as_str()))
    }

    fn toast_mut(&mut self, id: NotificationId) -> Option<&mut Toast> {
        self.toasts.iter_mut().find(|t| t.id == id)
    }

    fn set_state(&mut self, id: NotificationId, state: NotificationState) {
        if let Some(toast) = self.toast_mut(id) {
            toast.state = state;
        }
    }
}

fn container(doc: &mut Document) -> NodeId {
    if let Some(existing) = doc.query_selector(&classes::NOTIFICATION_CONTAINER_SELECTOR) {
        return existing;
    }
    let container = doc.create_element("div");
    doc.set_class_name(container, classes::NOTIFICATION_CONTAINER);
    let body = doc.body();
    doc.append_child(body, container);
    container
}

const fn icon_class(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Success => "bi bi-check-circle-fill",
        NotificationKind::Error => "bi bi-exclamation-octagon-fill",
        NotificationKind::Warning => "bi bi-exclamation-triangle-fill",
        NotificationKind::Info => "bi bi-info-circle-fill",
    }
}

fn element(doc: &mut Document, parent: NodeId, tag: &str, class: &str) -> NodeId {
    let node = doc.create_element(tag);
    doc.set_class_name(node, class);
    doc.append_child(parent, node);
    node
}

// Message text goes in as a text node, never as markup
fn build_toast(doc: &mut Document, id: NotificationId, message: &str, kind: NotificationKind) -> NodeId {
    let toast = doc.create_element("div");
    doc.set_class_name(
        toast,
        &format!(
            "{} notification-{} {}",
            classes::NOTIFICATION_TOAST,
            kind.as_str(),
            classes::SLIDE_IN_RIGHT
        ),
    );

    let glass = element(doc, toast, "div", "notification-glass");
    let icon_holder = element(doc, glass, "span", "notification-icon");
    element(doc, icon_holder, "i", icon_class(kind));
    let content = element(doc, glass, "div", "notification-content");
    let text = element(doc, content, "span", classes::NOTIFICATION_MESSAGE);
    doc.set_text_content(text, message);

    let close = element(doc, glass, "button", classes::NOTIFICATION_CLOSE);
    doc.set_attr(close, "aria-label", "Close");
    doc.set_data(close, "notification-id", &id.to_string());
    element(doc, close, "i", "bi bi-x");

    toast
}
