//! Page controller: the event loop of one storefront page.
//!
//! # Architecture
//!
//! - The controller owns the [`AppState`] handle and the [`Document`]
//! - [`PageController::dispatch`] runs the synchronous part of a gesture to
//!   completion and spawns network calls and timers into a `JoinSet`
//! - [`PageController::next`] applies one finished task; completions are
//!   applied in arrival order, so two overlapping updates of the same line
//!   end with whichever response arrived last
//! - Nothing touches the document or the cache outside those two entry
//!   points, so handlers never interleave and no locking is needed
//!
//! Local state changes only after the server confirms: no optimistic UI.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut page = PageController::from_html(state, &markup)?;
//! let button = page.document().query_selector(&selector).unwrap();
//! page.click(button);
//! page.run_until_idle().await;
//! ```

mod feedback;
mod handlers;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use dcl_core::{CartSnapshot, NotificationKind, ProductId, QuantityBounds, VariantId};
use tokio::task::JoinSet;

use self::feedback::AddedFeedback;
use crate::api::{AddToCart, ApiError, MISSING_VARIANT_MESSAGE};
use crate::classes;
use crate::dispatch::{Dispatch, Event, Registry};
use crate::dom::{Document, MarkupError, NodeId};
use crate::error::{add_breadcrumb, capture_api_error};
use crate::notify::{NotificationId, Notifier};
use crate::reconcile;
use crate::state::AppState;
use crate::storage::LocalCache;

/// Shown when adding fails without a server message.
pub const ADD_FAILED_MESSAGE: &str = "Failed to add product to cart. Please try again.";
/// Shown when an update fails without a server message.
pub const UPDATE_FAILED_MESSAGE: &str = "Failed to update cart. Please try again.";
/// Shown when removal fails without a server message.
pub const REMOVE_FAILED_MESSAGE: &str = "Failed to remove item. Please try again.";

const ADDED_MESSAGE: &str = "Added to cart.";
const REMOVED_MESSAGE: &str = "Item removed from cart.";
const WISHLIST_ADDED_MESSAGE: &str = "Added to wishlist!";
const WISHLIST_REMOVED_MESSAGE: &str = "Removed from wishlist";

/// Stepper direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Down,
    Up,
}

/// What a gesture asks the page to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Open the quick view modal for a product.
    QuickView { product: ProductId },
    /// Add to the server cart.
    AddToCart { button: NodeId, request: AddToCart },
    /// Flip wishlist membership.
    ToggleWishlist { button: NodeId, product: ProductId },
    /// Close a notification early.
    CloseNotification(NotificationId),
    /// Move a quantity input one step.
    Step { input: NodeId, step: Step },
    /// Submit a form, as a click on its submit button does.
    SubmitForm(NodeId),
    /// Commit a cart row's quantity to the server.
    UpdateLine {
        row: NodeId,
        input: NodeId,
        variant: VariantId,
        quantity: u32,
    },
    /// Remove a cart row on the server.
    RemoveLine { row: NodeId, variant: VariantId },
    /// Mirror a product page quantity into the local cache only.
    MirrorQuantity { id: VariantId, quantity: u32 },
}

/// A finished network call or timer.
#[derive(Debug)]
enum Completion {
    Added {
        button: NodeId,
        request: AddToCart,
        result: Result<CartSnapshot, ApiError>,
    },
    Updated {
        row: NodeId,
        input: NodeId,
        variant: VariantId,
        quantity: u32,
        result: Result<CartSnapshot, ApiError>,
    },
    Removed {
        row: NodeId,
        variant: VariantId,
        result: Result<CartSnapshot, ApiError>,
    },
    QuickViewLoaded {
        content: NodeId,
        result: Result<String, ApiError>,
    },
    NotificationExpired(NotificationId),
    NotificationExited(NotificationId),
    RowExited {
        row: NodeId,
        snapshot: CartSnapshot,
    },
    AddedFeedbackElapsed(NodeId),
    HeartbeatElapsed(NodeId),
}

// =============================================================================
// PageController
// =============================================================================

/// Drives one page: routes gestures, runs storefront calls and reconciles
/// their results into the document and the local cache.
pub struct PageController {
    state: AppState,
    doc: Document,
    registry: Registry<Intent>,
    notifier: Notifier,
    tasks: JoinSet<Completion>,
    committed: HashMap<NodeId, u32>,
    added: AddedFeedback,
    reload_requested: bool,
}

impl std::fmt::Debug for PageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageController")
            .field("state", &self.state)
            .field("bindings", &self.registry.len())
            .field("pending", &self.tasks.len())
            .field("reload_requested", &self.reload_requested)
            .finish_non_exhaustive()
    }
}

impl PageController {
    /// Take over a document: bind cart rows present now, register delegated
    /// handlers and mark wishlisted products.
    #[must_use]
    pub fn new(state: AppState, mut doc: Document) -> Self {
        let mut registry = Registry::new();
        handlers::bind_delegated(&mut registry);
        let committed = handlers::bind_cart_rows(&mut registry, &doc);

        let body = doc.body();
        reconcile::sync_wishlist_buttons(&mut doc, body, state.cache());

        tracing::debug!(
            bindings = registry.len(),
            cart_rows = committed.len(),
            "Page initialised"
        );

        Self {
            state,
            doc,
            registry,
            notifier: Notifier::new(),
            tasks: JoinSet::new(),
            committed,
            added: AddedFeedback::default(),
            reload_requested: false,
        }
    }

    /// Parse page markup and take it over.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup is malformed.
    pub fn from_html(state: AppState, markup: &str) -> Result<Self, MarkupError> {
        Ok(Self::new(state, Document::from_html(markup)?))
    }

    /// The page document.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutable access to the document, for edits outside gesture handling
    /// (typing into an input, injecting markup).
    pub const fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// The application state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// The local cart and wishlist cache.
    #[must_use]
    pub const fn cache(&self) -> &LocalCache {
        self.state.cache()
    }

    /// The notification presenter.
    #[must_use]
    pub const fn notifications(&self) -> &Notifier {
        &self.notifier
    }

    /// Whether the page asked to be reloaded into its empty-cart state.
    #[must_use]
    pub const fn reload_requested(&self) -> bool {
        self.reload_requested
    }

    /// Number of network calls and timers still running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    /// Route a gesture. Returns whether any handler took it.
    ///
    /// Must be called from within a tokio runtime: network calls and timers
    /// are spawned onto it.
    pub fn dispatch(&mut self, event: Event) -> bool {
        match self.registry.dispatch(&self.doc, event) {
            Dispatch::Unhandled => false,
            Dispatch::Consumed => true,
            Dispatch::Intent(intent) => {
                self.perform(intent);
                true
            }
        }
    }

    /// Click on a node.
    pub fn click(&mut self, target: NodeId) -> bool {
        self.dispatch(Event::click(target))
    }

    /// Change notification for an input.
    pub fn change(&mut self, target: NodeId) -> bool {
        self.dispatch(Event::change(target))
    }

    /// Submit a form.
    pub fn submit(&mut self, target: NodeId) -> bool {
        self.dispatch(Event::submit(target))
    }

    fn perform(&mut self, intent: Intent) {
        match intent {
            Intent::QuickView { product } => self.open_quick_view(product),
            Intent::AddToCart { button, request } => self.add_to_cart(button, request),
            Intent::ToggleWishlist { button, product } => self.toggle_wishlist(button, &product),
            Intent::CloseNotification(id) => self.dismiss_notification(id),
            Intent::Step { input, step } => self.step(input, step),
            Intent::SubmitForm(form) => {
                self.submit(form);
            }
            Intent::UpdateLine {
                row,
                input,
                variant,
                quantity,
            } => self.update_line(row, input, variant, quantity),
            Intent::RemoveLine { row, variant } => self.remove_line(row, variant),
            Intent::MirrorQuantity { id, quantity } => {
                self.state.cache_mut().set_quantity(&id, quantity);
            }
        }
    }

    fn add_to_cart(&mut self, button: NodeId, request: AddToCart) {
        add_breadcrumb("cart", "Add to cart", Some(&[("variant_id", request.variant_id.as_str())]));
        feedback::remember_original_class(&mut self.doc, button);

        if request.variant_id.is_blank() {
            self.notify(MISSING_VARIANT_MESSAGE, NotificationKind::Error);
            return;
        }

        let client = self.state.storefront().clone();
        self.spawn(async move {
            let result = client.add_to_cart(&request).await;
            Completion::Added {
                button,
                request,
                result,
            }
        });
    }

    fn update_line(&mut self, row: NodeId, input: NodeId, variant: VariantId, quantity: u32) {
        let bounds = self
            .state
            .config()
            .quantity
            .with_input_max(self.doc.attr(input, "max"));
        let quantity = bounds.clamp(quantity);
        self.doc.set_value(input, &quantity.to_string());

        add_breadcrumb("cart", "Update quantity", Some(&[("variant_id", variant.as_str())]));
        let client = self.state.storefront().clone();
        self.spawn(async move {
            let result = client.update_cart(&variant, quantity).await;
            Completion::Updated {
                row,
                input,
                variant,
                quantity,
                result,
            }
        });
    }

    fn remove_line(&mut self, row: NodeId, variant: VariantId) {
        add_breadcrumb("cart", "Remove item", Some(&[("variant_id", variant.as_str())]));
        let client = self.state.storefront().clone();
        self.spawn(async move {
            let result = client.remove_from_cart(&variant).await;
            Completion::Removed {
                row,
                variant,
                result,
            }
        });
    }

    fn step(&mut self, input: NodeId, step: Step) {
        let bounds = self
            .state
            .config()
            .quantity
            .with_input_max(self.doc.attr(input, "max"));
        let current = QuantityBounds::parse_input(&self.doc.value(input));
        let next = match step {
            Step::Down => bounds.step_down(current),
            Step::Up => bounds.step_up(current),
        };

        if let Some(next) = next {
            self.doc.set_value(input, &next.to_string());
            self.change(input);
        }
    }

    fn toggle_wishlist(&mut self, button: NodeId, product: &ProductId) {
        add_breadcrumb("wishlist", "Toggle wishlist", Some(&[("product_id", product.as_str())]));
        let member = self.state.cache_mut().toggle_wishlist(product);

        self.doc.toggle_class(button, classes::ACTIVE, member);
        let body = self.doc.body();
        reconcile::sync_wishlist_buttons(&mut self.doc, body, self.state.cache());

        if member {
            self.doc.add_class(button, classes::HEARTBEAT);
            let delay = self.state.config().timings.heartbeat;
            self.after(delay, Completion::HeartbeatElapsed(button));
            self.notify(WISHLIST_ADDED_MESSAGE, NotificationKind::Success);
        } else {
            self.notify(WISHLIST_REMOVED_MESSAGE, NotificationKind::Info);
        }
    }

    fn open_quick_view(&mut self, product: ProductId) {
        let modal = self.doc.get_element_by_id(classes::QUICK_VIEW_MODAL_ID);
        let content = self.doc.get_element_by_id(classes::QUICK_VIEW_CONTENT_ID);
        let (Some(modal), Some(content)) = (modal, content) else {
            tracing::debug!("No quick view modal on this page");
            return;
        };

        add_breadcrumb("catalog", "Quick view", Some(&[("product_id", product.as_str())]));
        self.doc.add_class(modal, classes::SHOW);
        self.set_quick_view_markup(content, feedback::QUICK_VIEW_LOADING);

        let client = self.state.storefront().clone();
        self.spawn(async move {
            let result = client.quick_view(&product).await;
            Completion::QuickViewLoaded { content, result }
        });
    }

    fn set_quick_view_markup(&mut self, content: NodeId, markup: &str) {
        if let Err(e) = self.doc.set_inner_html(content, markup) {
            tracing::warn!(error = %e, "Could not render quick view panel");
        }
    }

    // =========================================================================
    // Notifications and timers
    // =========================================================================

    fn notify(&mut self, message: &str, kind: NotificationKind) -> NotificationId {
        let id = self.notifier.show(&mut self.doc, message, kind);
        let delay = self.state.config().timings.notification_display;
        self.after(delay, Completion::NotificationExpired(id));
        id
    }

    fn dismiss_notification(&mut self, id: NotificationId) {
        if self.notifier.dismiss(&mut self.doc, id) {
            let delay = self.state.config().timings.notification_exit;
            self.after(delay, Completion::NotificationExited(id));
        }
    }

    fn after(&mut self, delay: Duration, completion: Completion) {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            completion
        });
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    // =========================================================================
    // Completions
    // =========================================================================

    /// Wait for the next network call or timer and apply its result.
    ///
    /// Returns false when nothing is pending.
    pub async fn next(&mut self) -> bool {
        match self.tasks.join_next().await {
            Some(Ok(completion)) => {
                self.complete(completion);
                true
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Page task failed");
                true
            }
            None => false,
        }
    }

    /// Apply completions until no call or timer is pending, including the
    /// ones spawned by completions themselves.
    pub async fn run_until_idle(&mut self) {
        while self.next().await {}
    }

    fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::Added {
                button,
                request,
                result,
            } => self.on_added(button, &request, result),
            Completion::Updated {
                row,
                input,
                variant,
                quantity,
                result,
            } => self.on_updated(row, input, &variant, quantity, result),
            Completion::Removed {
                row,
                variant,
                result,
            } => self.on_removed(row, &variant, result),
            Completion::QuickViewLoaded { content, result } => {
                self.on_quick_view(content, result);
            }
            Completion::NotificationExpired(id) => self.dismiss_notification(id),
            Completion::NotificationExited(id) => {
                self.notifier.remove(&mut self.doc, id);
            }
            Completion::RowExited { row, snapshot } => self.on_row_exited(row, &snapshot),
            Completion::AddedFeedbackElapsed(button) => self.added.finish(&mut self.doc, button),
            Completion::HeartbeatElapsed(button) => {
                self.doc.remove_class(button, classes::HEARTBEAT);
            }
        }
    }

    fn on_added(&mut self, button: NodeId, request: &AddToCart, result: Result<CartSnapshot, ApiError>) {
        match result {
            Ok(snapshot) => {
                self.state.cache_mut().record_add(request.to_line());
                reconcile::apply_snapshot(&mut self.doc, &snapshot);
                self.notify(
                    snapshot.message().unwrap_or(ADDED_MESSAGE),
                    NotificationKind::Success,
                );

                if self.added.start(&mut self.doc, button) {
                    let delay = self.state.config().timings.added_feedback;
                    self.after(delay, Completion::AddedFeedbackElapsed(button));
                }
            }
            Err(e) => {
                capture_api_error("add_to_cart", &e);
                self.notify(&e.user_message(ADD_FAILED_MESSAGE), NotificationKind::Error);
            }
        }
    }

    fn on_updated(
        &mut self,
        row: NodeId,
        input: NodeId,
        variant: &VariantId,
        quantity: u32,
        result: Result<CartSnapshot, ApiError>,
    ) {
        match result {
            Ok(snapshot) => {
                self.committed.insert(input, quantity);
                self.doc.set_value(input, &quantity.to_string());
                self.state.cache_mut().set_quantity(variant, quantity);
                if let Some(item_total) = snapshot.item_total {
                    reconcile::apply_line_total(&mut self.doc, row, item_total);
                }
                reconcile::apply_snapshot(&mut self.doc, &snapshot);
            }
            Err(e) => {
                capture_api_error("update_cart", &e);
                if let Some(&committed) = self.committed.get(&input) {
                    self.doc.set_value(input, &committed.to_string());
                }
                self.notify(&e.user_message(UPDATE_FAILED_MESSAGE), NotificationKind::Error);
            }
        }
    }

    fn on_removed(&mut self, row: NodeId, variant: &VariantId, result: Result<CartSnapshot, ApiError>) {
        match result {
            Ok(snapshot) => {
                self.state.cache_mut().remove(variant);
                self.doc.add_class(row, classes::FADE_OUT);
                self.notify(
                    snapshot.message().unwrap_or(REMOVED_MESSAGE),
                    NotificationKind::Success,
                );
                let delay = self.state.config().timings.row_exit;
                self.after(delay, Completion::RowExited { row, snapshot });
            }
            Err(e) => {
                capture_api_error("remove_from_cart", &e);
                self.notify(&e.user_message(REMOVE_FAILED_MESSAGE), NotificationKind::Error);
            }
        }
    }

    fn on_row_exited(&mut self, row: NodeId, snapshot: &CartSnapshot) {
        let mut controls = self.doc.descendants(row);
        controls.push(row);
        self.registry.unbind(&controls);
        for node in &controls {
            self.committed.remove(node);
        }

        self.doc.remove(row);
        reconcile::apply_snapshot(&mut self.doc, snapshot);

        if self.doc.query_selector(&classes::CART_ITEM).is_none() {
            tracing::info!("Cart is empty; requesting reload");
            self.reload_requested = true;
        }
    }

    fn on_quick_view(&mut self, content: NodeId, result: Result<String, ApiError>) {
        let rendered = match result {
            Ok(fragment) => self.doc.set_inner_html(content, &fragment).map_err(|e| {
                tracing::error!(error = %e, "Quick view fragment is not valid markup");
            }),
            Err(e) => {
                capture_api_error("quick_view", &e);
                Err(())
            }
        };

        match rendered {
            Ok(_) => reconcile::sync_wishlist_buttons(&mut self.doc, content, self.state.cache()),
            Err(()) => self.set_quick_view_markup(content, feedback::QUICK_VIEW_ERROR),
        }
    }
}
