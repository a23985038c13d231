//! Widget attribute references such as `b1.right` or `parent.size`.

use crate::signal::Subscription;
use crate::widget::{LayoutWidget, WidgetRef};

/// Which widget signal a reference depends on.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Trigger {
    PositionChanged,
    SizeChanged,
}

impl Trigger {
    /// Suffix of the subscription key for this trigger.
    pub fn key_suffix(self) -> &'static str {
        match self {
            Trigger::PositionChanged => "position",
            Trigger::SizeChanged => "size",
        }
    }

    pub(crate) fn connect(self, widget: &WidgetRef, subscription: Subscription) {
        match self {
            Trigger::PositionChanged => widget.on_position_changed(subscription),
            Trigger::SizeChanged => widget.on_size_changed(subscription),
        }
    }
}

/// Receives the widget signals an expression depends on while it is parsed.
pub trait Subscriber {
    /// `key` is the reference path plus the trigger, e.g. `"b1.size"`, or
    /// just `"size"` for the context widget itself. Different keys may name
    /// the same widget signal (`parent.size`, `&.size`).
    fn subscribe(&mut self, key: &str, widget: &WidgetRef, trigger: Trigger);
}

/// Subscriber for one-off evaluation.
pub struct NoSubscriptions;

impl Subscriber for NoSubscriptions {
    fn subscribe(&mut self, _key: &str, _widget: &WidgetRef, _trigger: Trigger) {}
}

// ── Attribute ─────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Attribute {
    Left,
    Top,
    Width,
    Height,
    Right,
    Bottom,
}

impl Attribute {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "x" | "left" => Attribute::Left,
            "y" | "top" => Attribute::Top,
            "w" | "width" => Attribute::Width,
            "h" | "height" => Attribute::Height,
            "right" => Attribute::Right,
            "bottom" => Attribute::Bottom,
            _ => return None,
        })
    }

    pub(crate) fn read(self, widget: &dyn LayoutWidget) -> f32 {
        match self {
            Attribute::Left => widget.position().x,
            Attribute::Top => widget.position().y,
            Attribute::Width => widget.size().x,
            Attribute::Height => widget.size().y,
            Attribute::Right => widget.position().x + widget.size().x,
            Attribute::Bottom => widget.position().y + widget.size().y,
        }
    }

    pub(crate) fn triggers(self) -> &'static [Trigger] {
        match self {
            Attribute::Left | Attribute::Top => &[Trigger::PositionChanged],
            Attribute::Width | Attribute::Height => &[Trigger::SizeChanged],
            Attribute::Right | Attribute::Bottom => {
                &[Trigger::PositionChanged, Trigger::SizeChanged]
            }
        }
    }
}

// ── resolution ────────────────────────────────────────────────────────────

/// Evaluate `token` if it is an attribute reference.
///
/// Returns `None` when the last dotted segment is not an attribute name, so
/// the caller can treat the token as something else. A reference that
/// cannot be resolved (no context, unknown widget) evaluates to `0`.
pub(crate) fn attribute_reference(
    token: &str,
    context: Option<&WidgetRef>,
    subscriber: &mut dyn Subscriber,
) -> Option<f32> {
    let (path, name) = match token.rfind('.') {
        Some(dot) => (token[..dot].trim(), token[dot + 1..].trim()),
        None => ("", token.trim()),
    };
    let attribute = Attribute::from_name(name)?;

    let Some(context) = context else {
        log::debug!("layout reference {token:?} has no widget to resolve against");
        return Some(0.0);
    };
    let Some(widget) = find_widget(context, path) else {
        log::debug!("layout reference {token:?} names no widget");
        return Some(0.0);
    };

    for &trigger in attribute.triggers() {
        subscriber.subscribe(&subscription_key(path, trigger), &widget, trigger);
    }
    Some(attribute.read(&*widget))
}

fn subscription_key(path: &str, trigger: Trigger) -> String {
    if path.is_empty() {
        trigger.key_suffix().to_owned()
    } else {
        format!("{path}.{}", trigger.key_suffix())
    }
}

/// Follow a dotted widget path from `context`.
///
/// `parent` and `&` step to the parent. Any other segment names a child of
/// the current widget, or failing that a sibling.
pub(crate) fn find_widget(context: &WidgetRef, path: &str) -> Option<WidgetRef> {
    let mut widget = context.clone();
    if path.is_empty() {
        return Some(widget);
    }

    for segment in path.split('.').map(str::trim) {
        widget = match segment {
            "parent" | "&" => widget.parent()?,
            "" => return None,
            name => widget
                .child(name)
                .or_else(|| widget.parent().and_then(|parent| parent.child(name)))?,
        };
    }
    Some(widget)
}
