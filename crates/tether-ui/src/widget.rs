use std::rc::Rc;

use tether_engine::coords::Vec2;

use crate::signal::Subscription;

// ── LayoutWidget trait ────────────────────────────────────────────────────

/// What the layout engine needs from a widget.
///
/// Layout expressions read geometry from widgets, look widgets up by name,
/// and subscribe to geometry changes so dependent layouts recompute. Any
/// retained widget type can take part by implementing this trait;
/// [`crate::widgets::Panel`] is the implementation shipped with this crate.
///
/// Subscriptions passed to `on_*_changed` are kept while they are
/// [live](Subscription::is_live); [`crate::signal::Signal`] does the pruning.
/// They must be invoked synchronously, and the implementation must not hold
/// any interior borrow while invoking them: a callback may read this widget's
/// geometry, or subscribe again.
///
/// # Example
///
/// ```rust,ignore
/// struct Fixed { pos: Vec2, size: Vec2 }
///
/// impl LayoutWidget for Fixed {
///     fn position(&self) -> Vec2 { self.pos }
///     fn size(&self) -> Vec2 { self.size }
///     fn parent(&self) -> Option<WidgetRef> { None }
///     fn on_position_changed(&self, _subscription: Subscription) {}
///     fn on_size_changed(&self, _subscription: Subscription) {}
/// }
/// ```
pub trait LayoutWidget: 'static {
    /// Position relative to the parent.
    fn position(&self) -> Vec2;

    fn size(&self) -> Vec2;

    /// The container this widget was added to, if any.
    fn parent(&self) -> Option<WidgetRef>;

    /// Look up a direct child by name. Names compare case-insensitively.
    ///
    /// Widgets that cannot hold children keep the default, which finds nothing.
    fn child(&self, _name: &str) -> Option<WidgetRef> {
        None
    }

    /// Subscribe to position changes.
    fn on_position_changed(&self, subscription: Subscription);

    /// Subscribe to size changes.
    fn on_size_changed(&self, subscription: Subscription);
}

/// Shared handle to any widget taking part in layout expressions.
pub type WidgetRef = Rc<dyn LayoutWidget>;
