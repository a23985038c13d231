//! Layouts that track a widget's geometry, and combinators over layouts.

use std::rc::Rc;

use crate::Gui;
use crate::layout::handle::Layout;
use crate::layout::layout2d::Layout2d;
use crate::layout::node;
use crate::layout::operation::Operation;
use crate::layout::resolve::Attribute;
use crate::signal::Subscription;
use crate::widget::WidgetRef;
use crate::widgets::Panel;

/// Anything a geometry binding can track.
///
/// Binding to a [`Gui`] tracks its root container, so `bind_width(&gui)`
/// follows the view size.
pub trait BindTarget {
    fn bind_target(&self) -> WidgetRef;
}

impl BindTarget for WidgetRef {
    fn bind_target(&self) -> WidgetRef {
        self.clone()
    }
}

impl BindTarget for Rc<Panel> {
    fn bind_target(&self) -> WidgetRef {
        self.clone()
    }
}

impl BindTarget for Gui {
    fn bind_target(&self) -> WidgetRef {
        self.container().clone()
    }
}

/// A constant that is overwritten with `attribute` of the target whenever
/// the target moves or resizes.
fn bind_attribute(target: &impl BindTarget, attribute: Attribute) -> Layout {
    let widget = target.bind_target();
    let layout = Layout::new(attribute.read(&*widget));

    for &trigger in attribute.triggers() {
        node::register_subscription(layout.node(), &widget, trigger);

        let leaf = Rc::downgrade(layout.node());
        let source = Rc::downgrade(&widget);
        trigger.connect(
            &widget,
            Subscription::owned_by(layout.node(), move || {
                if let (Some(leaf), Some(source)) = (leaf.upgrade(), source.upgrade()) {
                    node::reset_leaf(&leaf, attribute.read(&*source));
                }
            }),
        );
    }
    layout
}

pub fn bind_left(target: &impl BindTarget) -> Layout {
    bind_attribute(target, Attribute::Left)
}

pub fn bind_top(target: &impl BindTarget) -> Layout {
    bind_attribute(target, Attribute::Top)
}

pub fn bind_width(target: &impl BindTarget) -> Layout {
    bind_attribute(target, Attribute::Width)
}

pub fn bind_height(target: &impl BindTarget) -> Layout {
    bind_attribute(target, Attribute::Height)
}

/// Left plus width.
pub fn bind_right(target: &impl BindTarget) -> Layout {
    bind_attribute(target, Attribute::Right)
}

/// Top plus height.
pub fn bind_bottom(target: &impl BindTarget) -> Layout {
    bind_attribute(target, Attribute::Bottom)
}

pub fn bind_position(target: &impl BindTarget) -> Layout2d {
    Layout2d { x: bind_left(target), y: bind_top(target) }
}

pub fn bind_size(target: &impl BindTarget) -> Layout2d {
    Layout2d { x: bind_width(target), y: bind_height(target) }
}

/// The smaller of the two.
pub fn bind_min(a: impl Into<Layout>, b: impl Into<Layout>) -> Layout {
    Layout::compose(Operation::Minimum, &[&a.into(), &b.into()])
}

/// The larger of the two.
pub fn bind_max(a: impl Into<Layout>, b: impl Into<Layout>) -> Layout {
    Layout::compose(Operation::Maximum, &[&a.into(), &b.into()])
}

/// `value` clamped to `[minimum, maximum]`.
///
/// When `minimum > maximum` the result is `maximum`.
pub fn bind_range(
    minimum: impl Into<Layout>,
    maximum: impl Into<Layout>,
    value: impl Into<Layout>,
) -> Layout {
    bind_min(bind_max(value, minimum), maximum)
}

/// `then` while `condition` is nonzero, `otherwise` when it is zero.
pub fn bind_if(
    condition: impl Into<Layout>,
    then: impl Into<Layout>,
    otherwise: impl Into<Layout>,
) -> Layout {
    Layout::compose(
        Operation::Conditional,
        &[&condition.into(), &then.into(), &otherwise.into()],
    )
}

/// [`bind_if`] per axis, sharing one condition.
pub fn bind_if_2d(
    condition: impl Into<Layout>,
    then: impl Into<Layout2d>,
    otherwise: impl Into<Layout2d>,
) -> Layout2d {
    let condition = condition.into();
    let then = then.into();
    let otherwise = otherwise.into();
    Layout2d {
        x: bind_if(&condition, then.x, otherwise.x),
        y: bind_if(&condition, then.y, otherwise.y),
    }
}

/// An expression string, resolved once connected to a widget.
pub fn bind_str(expression: &str) -> Layout {
    Layout::from_expression(expression)
}

pub fn bind_str_2d(expression: &str) -> Layout2d {
    Layout2d::from_expression(expression)
}
