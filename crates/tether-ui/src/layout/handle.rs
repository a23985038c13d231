use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign};
use std::rc::Rc;

use crate::layout::layout2d::{Axis, expand_axis};
use crate::layout::node::{self, ExpressionNode, HandleSlot, NodeRef};
use crate::layout::operation::Operation;
use crate::widget::WidgetRef;

// ── Layout ────────────────────────────────────────────────────────────────

/// A scalar layout value: a literal, an expression string, or an operator
/// tree built from other layouts.
///
/// Cloning shares the underlying expression; every clone sees the same
/// value. The update callback belongs to the handle and is not cloned.
///
/// Values are `f32`, the precision of [`Vec2`](tether_engine::coords::Vec2)
/// geometry, and expression text is parsed at that precision too.
///
/// ```rust,ignore
/// let width = bind_width(&panel);
/// let half = &width / 2.0 - 5.0;
/// half.connect_update_callback(|| log::info!("width changed"));
/// ```
pub struct Layout {
    node: NodeRef,
    slot: Rc<HandleSlot>,
}

impl Layout {
    /// A constant.
    pub fn new(value: f32) -> Self {
        Self::from_node(node::literal(value))
    }

    /// An expression string such as `"parent.width - 20"`.
    ///
    /// References resolve once the layout is connected to a widget; until
    /// then they read as `0`.
    pub fn from_expression(expression: &str) -> Self {
        Self::from_node(node::string(expression))
    }

    /// An expression string for one axis of a 2D layout.
    ///
    /// `pos`/`position`/`size` and `N%` are rewritten for `axis` first, so
    /// `"parent.size - 10"` on [`Axis::Y`] reads the parent's height.
    pub fn for_axis(expression: &str, axis: Axis) -> Self {
        Self::from_expression(&expand_axis(expression, axis))
    }

    pub(crate) fn from_node(node: NodeRef) -> Self {
        let slot = Rc::new(HandleSlot::default());
        node::attach(&node, &slot);
        Self { node, slot }
    }

    pub(crate) fn compose(operation: Operation, operands: &[&Layout]) -> Self {
        let operands = operands.iter().map(|layout| layout.node.clone()).collect();
        Self::from_node(node::compose(operation, operands))
    }

    pub(crate) fn node(&self) -> &NodeRef {
        &self.node
    }

    /// The current value.
    pub fn value(&self) -> f32 {
        self.node.borrow().value()
    }

    pub fn operation(&self) -> Operation {
        self.node.borrow().operation()
    }

    /// The raw text, for expression-string layouts.
    pub fn expression(&self) -> Option<String> {
        self.node.borrow().string_expression().map(str::to_owned)
    }

    /// Whether both handles wrap the same expression.
    pub fn shares_node(&self, other: &Layout) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Run `f` against the underlying node, for diagnostics.
    pub fn inspect<R>(&self, f: impl FnOnce(&ExpressionNode) -> R) -> R {
        f(&self.node.borrow())
    }

    /// Replace this handle's update callback.
    ///
    /// The callback runs synchronously whenever the value is recomputed. It
    /// may read any layout, including this one.
    pub fn connect_update_callback(&self, callback: impl Fn() + 'static) {
        *self.slot.callback.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn disconnect_update_callback(&self) {
        self.slot.callback.borrow_mut().take();
    }

    /// Resolve expression strings in this layout against `widget`, and
    /// recompute.
    pub fn connect_widget(&self, widget: &WidgetRef) {
        node::connect_widget(&self.node, widget);
    }

    /// Overwrite a constant and propagate it to every expression using it.
    ///
    /// Only constants can be overwritten; anything else is left unchanged.
    pub fn reset_value(&self, value: f32) {
        if self.operation() == Operation::Value {
            node::reset_leaf(&self.node, value);
        } else {
            log::warn!("cannot overwrite computed layout {self}");
        }
    }

    pub fn less_than(&self, rhs: impl Into<Layout>) -> Layout {
        Layout::compose(Operation::LessThan, &[self, &rhs.into()])
    }

    pub fn less_or_equal(&self, rhs: impl Into<Layout>) -> Layout {
        Layout::compose(Operation::LessOrEqual, &[self, &rhs.into()])
    }

    pub fn greater_than(&self, rhs: impl Into<Layout>) -> Layout {
        Layout::compose(Operation::GreaterThan, &[self, &rhs.into()])
    }

    pub fn greater_or_equal(&self, rhs: impl Into<Layout>) -> Layout {
        Layout::compose(Operation::GreaterOrEqual, &[self, &rhs.into()])
    }

    pub fn equal(&self, rhs: impl Into<Layout>) -> Layout {
        Layout::compose(Operation::Equal, &[self, &rhs.into()])
    }

    pub fn not_equal(&self, rhs: impl Into<Layout>) -> Layout {
        Layout::compose(Operation::NotEqual, &[self, &rhs.into()])
    }

    /// `1` if both are nonzero.
    pub fn and(&self, rhs: impl Into<Layout>) -> Layout {
        Layout::compose(Operation::And, &[self, &rhs.into()])
    }

    /// `1` if either is nonzero.
    pub fn or(&self, rhs: impl Into<Layout>) -> Layout {
        Layout::compose(Operation::Or, &[self, &rhs.into()])
    }
}

impl Clone for Layout {
    fn clone(&self) -> Self {
        Self::from_node(self.node.clone())
    }
}

impl Drop for Layout {
    fn drop(&mut self) {
        node::detach(&self.node, &self.slot);
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::new(0.0)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        node::write_expression(&self.node, f)
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("value", &self.value())
            .field("expression", &format_args!("{self}"))
            .finish()
    }
}

// ── Conversions ───────────────────────────────────────────────────────────

impl From<f32> for Layout {
    fn from(value: f32) -> Self {
        Layout::new(value)
    }
}

impl From<i32> for Layout {
    fn from(value: i32) -> Self {
        Layout::new(value as f32)
    }
}

impl From<&str> for Layout {
    fn from(expression: &str) -> Self {
        Layout::from_expression(expression)
    }
}

impl From<String> for Layout {
    fn from(expression: String) -> Self {
        Layout::from_expression(&expression)
    }
}

impl From<&Layout> for Layout {
    fn from(layout: &Layout) -> Self {
        layout.clone()
    }
}

// ── Operators ─────────────────────────────────────────────────────────────

macro_rules! layout_operator {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident, $operation:expr) => {
        impl $Op<&Layout> for &Layout {
            type Output = Layout;
            fn $op(self, rhs: &Layout) -> Layout {
                Layout::compose($operation, &[self, rhs])
            }
        }

        impl $Op<Layout> for &Layout {
            type Output = Layout;
            fn $op(self, rhs: Layout) -> Layout {
                $Op::$op(self, &rhs)
            }
        }

        impl $Op<&Layout> for Layout {
            type Output = Layout;
            fn $op(self, rhs: &Layout) -> Layout {
                $Op::$op(&self, rhs)
            }
        }

        impl $Op<Layout> for Layout {
            type Output = Layout;
            fn $op(self, rhs: Layout) -> Layout {
                $Op::$op(&self, &rhs)
            }
        }

        impl $Op<f32> for &Layout {
            type Output = Layout;
            fn $op(self, rhs: f32) -> Layout {
                $Op::$op(self, &Layout::new(rhs))
            }
        }

        impl $Op<f32> for Layout {
            type Output = Layout;
            fn $op(self, rhs: f32) -> Layout {
                $Op::$op(&self, &Layout::new(rhs))
            }
        }

        impl $Op<Layout> for f32 {
            type Output = Layout;
            fn $op(self, rhs: Layout) -> Layout {
                $Op::$op(&Layout::new(self), &rhs)
            }
        }

        impl $Op<&Layout> for f32 {
            type Output = Layout;
            fn $op(self, rhs: &Layout) -> Layout {
                $Op::$op(&Layout::new(self), rhs)
            }
        }

        impl $OpAssign<&Layout> for Layout {
            fn $op_assign(&mut self, rhs: &Layout) {
                *self = $Op::$op(&*self, rhs);
            }
        }

        impl $OpAssign<Layout> for Layout {
            fn $op_assign(&mut self, rhs: Layout) {
                *self = $Op::$op(&*self, &rhs);
            }
        }

        impl $OpAssign<f32> for Layout {
            fn $op_assign(&mut self, rhs: f32) {
                *self = $Op::$op(&*self, &Layout::new(rhs));
            }
        }
    };
}

layout_operator!(Add, add, AddAssign, add_assign, Operation::Plus);
layout_operator!(Sub, sub, SubAssign, sub_assign, Operation::Minus);
layout_operator!(Mul, mul, MulAssign, mul_assign, Operation::Multiplies);
layout_operator!(Div, div, DivAssign, div_assign, Operation::Divides);
layout_operator!(Rem, rem, RemAssign, rem_assign, Operation::Modulus);

impl Neg for &Layout {
    type Output = Layout;
    fn neg(self) -> Layout {
        Layout::compose(Operation::Minus, &[&Layout::new(0.0), self])
    }
}

impl Neg for Layout {
    type Output = Layout;
    fn neg(self) -> Layout {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn values_are_single_precision() {
        let third: f32 = Layout::from_expression("1 / 3").value();
        assert_eq!(third, 1.0_f32 / 3.0);
        assert_eq!(Layout::from_expression("0.1").value(), 0.1_f32);
    }

    #[test]
    fn constants_and_strings() {
        assert_eq!(Layout::new(3.5).value(), 3.5);
        assert_eq!(Layout::from(2).value(), 2.0);
        assert_eq!(Layout::from("2 * (3 + 4)").value(), 14.0);
        assert_eq!(Layout::from(String::from("min(4, 9)")).value(), 4.0);
        assert_eq!(Layout::default().value(), 0.0);
        assert_eq!(Layout::from("width").value(), 0.0);
    }

    #[test]
    fn composition_matches_evaluation() {
        let l1 = Layout::new(5.0);
        let l2 = Layout::new(3.0);
        let sum = &l1 + &l2;
        assert_eq!(sum.value(), 8.0);
        assert_eq!((&l1 - &l2).value(), 2.0);
        assert_eq!((&l1 * 2.0).value(), 10.0);
        assert_eq!((20.0 / &l1).value(), 4.0);
        assert_eq!((&l1 % &l2).value(), 2.0);
        assert_eq!((-&l1).value(), -5.0);
        assert_eq!((&sum * &l2 - 4.0).value(), 20.0);
    }

    #[test]
    fn comparisons() {
        let a = Layout::new(2.0);
        let b = Layout::new(3.0);
        assert_eq!(a.less_than(&b).value(), 1.0);
        assert_eq!(a.less_or_equal(2.0).value(), 1.0);
        assert_eq!(a.greater_than(&b).value(), 0.0);
        assert_eq!(b.greater_or_equal(3.0).value(), 1.0);
        assert_eq!(a.equal(&b).value(), 0.0);
        assert_eq!(a.not_equal(&b).value(), 1.0);
        assert_eq!(a.and(0.0).value(), 0.0);
        assert_eq!(a.or(0.0).value(), 1.0);
    }

    #[test]
    fn assign_operators() {
        let mut l = Layout::new(4.0);
        l += 6.0;
        assert_eq!(l.value(), 10.0);
        l -= Layout::new(2.0);
        assert_eq!(l.value(), 8.0);
        l *= &Layout::new(3.0);
        assert_eq!(l.value(), 24.0);
        l /= 4.0;
        assert_eq!(l.value(), 6.0);
        l %= 4.0;
        assert_eq!(l.value(), 2.0);
    }

    #[test]
    fn set_value_propagates_to_dependents() {
        let leaf = Layout::new(1.0);
        let doubled = &leaf * 2.0;
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            doubled.connect_update_callback(move || hits.set(hits.get() + 1));
        }

        leaf.reset_value(21.0);
        assert_eq!(doubled.value(), 42.0);
        assert_eq!(hits.get(), 1);

        // computed layouts cannot be overwritten
        doubled.reset_value(0.0);
        assert_eq!(doubled.value(), 42.0);
    }

    #[test]
    fn clones_share_the_value_but_not_the_callback() {
        let original = Layout::new(1.0);
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            original.connect_update_callback(move || hits.set(hits.get() + 1));
        }
        let copy = original.clone();
        assert!(copy.shares_node(&original));
        assert_eq!(original.inspect(|node| node.handle_count()), 2);

        copy.reset_value(9.0);
        assert_eq!(original.value(), 9.0);
        assert_eq!(hits.get(), 1);

        drop(copy);
        assert_eq!(original.inspect(|node| node.handle_count()), 1);
    }

    #[test]
    fn disconnected_callbacks_stay_quiet() {
        let l = Layout::new(1.0);
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            l.connect_update_callback(move || hits.set(hits.get() + 1));
        }
        l.disconnect_update_callback();
        l.reset_value(2.0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn callback_may_read_layouts() {
        let leaf = Layout::new(1.0);
        let sum = &leaf + 1.0;
        let seen = Rc::new(Cell::new(0.0));
        {
            let seen = seen.clone();
            let reader = sum.clone();
            sum.connect_update_callback(move || seen.set(reader.value()));
        }
        leaf.reset_value(5.0);
        assert_eq!(seen.get(), 6.0);
    }

    #[test]
    fn dropping_a_composite_frees_back_edges() {
        let leaf = Layout::new(1.0);
        {
            let _a = &leaf + 1.0;
            let _b = &leaf * 3.0;
            assert_eq!(leaf.inspect(|node| node.parent_count()), 2);
        }
        assert_eq!(leaf.inspect(|node| node.parent_count()), 0);
        leaf.reset_value(4.0);
        assert_eq!(leaf.value(), 4.0);
    }

    #[test]
    fn display_renders_the_tree() {
        let a = Layout::new(2.0);
        let b = Layout::from("parent.width");
        assert_eq!((&a + &b).to_string(), "2 + (parent.width)");
        assert_eq!((&(&a + 1.0) * 3.0).to_string(), "(2 + 1) * 3");
        assert_eq!(a.less_than(5.0).to_string(), "2 < 5");
        let rendered = (&(&a * 4.0) - 1.0).to_string();
        assert_eq!(Layout::from(rendered.as_str()).value(), 7.0);
    }
}
