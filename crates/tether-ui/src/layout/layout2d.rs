use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign};
use std::rc::Rc;

use tether_engine::coords::Vec2;

use crate::layout::error::ExpressionError;
use crate::layout::handle::Layout;
use crate::widget::WidgetRef;

/// One axis of a 2D layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn position(self) -> &'static str {
        match self {
            Axis::X => "left",
            Axis::Y => "top",
        }
    }

    fn size(self) -> &'static str {
        match self {
            Axis::X => "width",
            Axis::Y => "height",
        }
    }
}

// ── Layout2d ──────────────────────────────────────────────────────────────

/// A pair of layouts, one per axis, for a widget position or size.
#[derive(Clone, Default, Debug)]
pub struct Layout2d {
    pub x: Layout,
    pub y: Layout,
}

impl Layout2d {
    pub fn new(x: impl Into<Layout>, y: impl Into<Layout>) -> Self {
        Self { x: x.into(), y: y.into() }
    }

    /// A 2D expression string.
    ///
    /// `{a, b}` gives `a` to the x axis and `b` to the y axis; everything
    /// else is shared by both, with `pos`/`position`/`size` and `N%`
    /// rewritten per axis. `"{&.w - 20, &.h}"`, `"b1.position"` and
    /// `"50% - {10, 0}"` are all valid. Malformed braces give `(0, 0)`.
    pub fn from_expression(expression: &str) -> Self {
        match split_axes(expression) {
            Ok((x, y)) => Self {
                x: Layout::for_axis(&x, Axis::X),
                y: Layout::for_axis(&y, Axis::Y),
            },
            Err(e) => {
                log::warn!("layout expression {expression:?}: {e}");
                Self::new(0.0, 0.0)
            }
        }
    }

    pub fn value(&self) -> Vec2 {
        Vec2::new(self.x.value(), self.y.value())
    }

    /// Called when either axis changes.
    pub fn connect_update_callback(&self, callback: impl Fn() + 'static) {
        let callback = Rc::new(callback);
        let on_x = callback.clone();
        self.x.connect_update_callback(move || on_x());
        self.y.connect_update_callback(move || callback());
    }

    pub fn connect_widget(&self, widget: &WidgetRef) {
        self.x.connect_widget(widget);
        self.y.connect_widget(widget);
    }

    /// `1` if both axes are equal.
    pub fn equal(&self, rhs: &Layout2d) -> Layout {
        self.x.equal(&rhs.x).and(self.y.equal(&rhs.y))
    }

    /// `1` if either axis differs.
    pub fn not_equal(&self, rhs: &Layout2d) -> Layout {
        self.x.not_equal(&rhs.x).or(self.y.not_equal(&rhs.y))
    }
}

impl From<Vec2> for Layout2d {
    fn from(v: Vec2) -> Self {
        Layout2d::new(v.x, v.y)
    }
}

impl<X: Into<Layout>, Y: Into<Layout>> From<(X, Y)> for Layout2d {
    fn from((x, y): (X, Y)) -> Self {
        Layout2d::new(x, y)
    }
}

impl From<f32> for Layout2d {
    fn from(v: f32) -> Self {
        Layout2d::new(v, v)
    }
}

impl From<&str> for Layout2d {
    fn from(expression: &str) -> Self {
        Layout2d::from_expression(expression)
    }
}

impl From<String> for Layout2d {
    fn from(expression: String) -> Self {
        Layout2d::from_expression(&expression)
    }
}

impl From<&Layout2d> for Layout2d {
    fn from(layout: &Layout2d) -> Self {
        layout.clone()
    }
}

// ── Operators ─────────────────────────────────────────────────────────────

macro_rules! componentwise {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident) => {
        impl $Op<&Layout2d> for &Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: &Layout2d) -> Layout2d {
                Layout2d { x: $Op::$op(&self.x, &rhs.x), y: $Op::$op(&self.y, &rhs.y) }
            }
        }

        impl $Op<Layout2d> for &Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: Layout2d) -> Layout2d {
                $Op::$op(self, &rhs)
            }
        }

        impl $Op<&Layout2d> for Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: &Layout2d) -> Layout2d {
                $Op::$op(&self, rhs)
            }
        }

        impl $Op<Layout2d> for Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: Layout2d) -> Layout2d {
                $Op::$op(&self, &rhs)
            }
        }

        impl $Op<Vec2> for &Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: Vec2) -> Layout2d {
                $Op::$op(self, &Layout2d::from(rhs))
            }
        }

        impl $Op<Vec2> for Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: Vec2) -> Layout2d {
                $Op::$op(&self, &Layout2d::from(rhs))
            }
        }

        impl $OpAssign<&Layout2d> for Layout2d {
            fn $op_assign(&mut self, rhs: &Layout2d) {
                *self = $Op::$op(&*self, rhs);
            }
        }

        impl $OpAssign<Layout2d> for Layout2d {
            fn $op_assign(&mut self, rhs: Layout2d) {
                *self = $Op::$op(&*self, &rhs);
            }
        }
    };
}

componentwise!(Add, add, AddAssign, add_assign);
componentwise!(Sub, sub, SubAssign, sub_assign);

macro_rules! scaled {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident) => {
        impl $Op<&Layout> for &Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: &Layout) -> Layout2d {
                Layout2d { x: $Op::$op(&self.x, rhs), y: $Op::$op(&self.y, rhs) }
            }
        }

        impl $Op<Layout> for &Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: Layout) -> Layout2d {
                $Op::$op(self, &rhs)
            }
        }

        impl $Op<&Layout> for Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: &Layout) -> Layout2d {
                $Op::$op(&self, rhs)
            }
        }

        impl $Op<Layout> for Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: Layout) -> Layout2d {
                $Op::$op(&self, &rhs)
            }
        }

        impl $Op<f32> for &Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: f32) -> Layout2d {
                $Op::$op(self, &Layout::new(rhs))
            }
        }

        impl $Op<f32> for Layout2d {
            type Output = Layout2d;
            fn $op(self, rhs: f32) -> Layout2d {
                $Op::$op(&self, &Layout::new(rhs))
            }
        }

        impl $OpAssign<&Layout> for Layout2d {
            fn $op_assign(&mut self, rhs: &Layout) {
                *self = $Op::$op(&*self, rhs);
            }
        }

        impl $OpAssign<f32> for Layout2d {
            fn $op_assign(&mut self, rhs: f32) {
                *self = $Op::$op(&*self, &Layout::new(rhs));
            }
        }
    };
}

scaled!(Mul, mul, MulAssign, mul_assign);
scaled!(Div, div, DivAssign, div_assign);
scaled!(Rem, rem, RemAssign, rem_assign);

impl Mul<&Layout2d> for &Layout {
    type Output = Layout2d;
    fn mul(self, rhs: &Layout2d) -> Layout2d {
        rhs * self
    }
}

impl Mul<Layout2d> for &Layout {
    type Output = Layout2d;
    fn mul(self, rhs: Layout2d) -> Layout2d {
        &rhs * self
    }
}

impl Mul<Layout2d> for Layout {
    type Output = Layout2d;
    fn mul(self, rhs: Layout2d) -> Layout2d {
        &rhs * &self
    }
}

impl Mul<&Layout2d> for f32 {
    type Output = Layout2d;
    fn mul(self, rhs: &Layout2d) -> Layout2d {
        rhs * self
    }
}

impl Mul<Layout2d> for f32 {
    type Output = Layout2d;
    fn mul(self, rhs: Layout2d) -> Layout2d {
        &rhs * self
    }
}

impl Neg for &Layout2d {
    type Output = Layout2d;
    fn neg(self) -> Layout2d {
        Layout2d { x: -&self.x, y: -&self.y }
    }
}

impl Neg for Layout2d {
    type Output = Layout2d;
    fn neg(self) -> Layout2d {
        -&self
    }
}

// ── String expansion ──────────────────────────────────────────────────────

/// Split `{a, b}` groups into per-axis text: the x text gets `(a)`, the y
/// text `(b)`, and text outside braces goes to both.
pub(crate) fn split_axes(expression: &str) -> Result<(String, String), ExpressionError> {
    let mut x = String::new();
    let mut y = String::new();
    let mut rest = expression;

    while let Some(open) = rest.find(['{', '}']) {
        if rest[open..].starts_with('}') {
            return Err(ExpressionError::MalformedBraces);
        }
        let close = rest[open + 1..]
            .find(['{', '}'])
            .map(|i| open + 1 + i)
            .ok_or(ExpressionError::MalformedBraces)?;
        if rest[close..].starts_with('{') {
            return Err(ExpressionError::MalformedBraces);
        }
        let (a, b) = split_pair(&rest[open + 1..close]).ok_or(ExpressionError::MalformedBraces)?;

        x.push_str(&rest[..open]);
        y.push_str(&rest[..open]);
        x.push_str(&format!("({a})"));
        y.push_str(&format!("({b})"));
        rest = &rest[close + 1..];
    }

    x.push_str(rest);
    y.push_str(rest);
    Ok((x, y))
}

/// `a, b` split at its only top-level comma.
fn split_pair(inner: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut comma = None;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                if comma.is_some() {
                    return None;
                }
                comma = Some(i);
            }
            _ => {}
        }
    }
    let comma = comma?;
    Some((inner[..comma].trim(), inner[comma + 1..].trim()))
}

/// Rewrite axis-generic words for `axis`.
///
/// `pos`/`position` become `left`/`top` and `size` becomes `width`/`height`,
/// also as the last segment of a dotted path. A number directly followed by
/// `%` becomes that fraction of the parent's width or height.
pub(crate) fn expand_axis(expression: &str, axis: Axis) -> String {
    let mut out = String::with_capacity(expression.len());
    let mut chars = expression.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if !starts_word(c, expression[start + c.len_utf8()..].chars().next()) {
            out.push(c);
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if !continues_word(next, expression[i + next.len_utf8()..].chars().next()) {
                break;
            }
            end = i + next.len_utf8();
            chars.next();
        }
        let word = &expression[start..end];

        if let Some(percent) = percentage(word, &expression[end..]) {
            out.push_str(&format!("({} * &.{})", percent / 100.0, axis.size()));
            chars.next(); // the `%`
            continue;
        }

        let (path, last) = match word.rfind('.') {
            Some(dot) => (&word[..=dot], &word[dot + 1..]),
            None => ("", word),
        };
        let replacement = match last.to_ascii_lowercase().as_str() {
            "pos" | "position" => Some(axis.position()),
            "size" => Some(axis.size()),
            _ => None,
        };
        match replacement {
            Some(name) => {
                out.push_str(path);
                out.push_str(name);
            }
            None => out.push_str(word),
        }
    }
    out
}

fn starts_word(c: char, next: Option<char>) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || (c == '&' && next == Some('.'))
}

fn continues_word(c: char, next: Option<char>) -> bool {
    starts_word(c, next)
}

/// `Some(n)` if `word` is a number and `rest` starts with a percent sign
/// that is not a modulus.
fn percentage(word: &str, rest: &str) -> Option<f32> {
    let after = rest.strip_prefix('%')?;
    let value = word.parse::<f32>().ok()?;
    let modulus = after
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '(' || c == '&');
    (!modulus).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn braces_split_per_axis() {
        let (x, y) = split_axes("{2, 3} + -{-1, 5}").unwrap();
        assert_eq!(x, "(2) + -(-1)");
        assert_eq!(y, "(3) + -(5)");
        assert_eq!(Layout2d::from("{2, 3} + -{-1, 5}").value(), Vec2::new(3.0, -2.0));
    }

    #[test]
    fn commas_inside_functions_stay_put() {
        let (x, y) = split_axes("{min(1, 2), max(3, 4)}").unwrap();
        assert_eq!(x, "(min(1, 2))");
        assert_eq!(y, "(max(3, 4))");
    }

    #[test]
    fn malformed_braces_are_zero() {
        for bad in ["{3}", "{1", "2}", "{1, 2, 3}", "{{1, 2}, 3}"] {
            assert!(split_axes(bad).is_err(), "{bad}");
            assert_eq!(Layout2d::from(bad).value(), Vec2::zero(), "{bad}");
        }
        assert_eq!(Layout2d::from("[1, 2]").value(), Vec2::zero());
    }

    #[test]
    fn shared_text_goes_to_both_axes() {
        assert_eq!(Layout2d::from("5").value(), Vec2::new(5.0, 5.0));
        assert_eq!(Layout2d::from("2 * {3, 4} - 1").value(), Vec2::new(5.0, 7.0));
    }

    #[test]
    fn axis_words_are_rewritten() {
        assert_eq!(expand_axis("b1.pos + b2.size", Axis::X), "b1.left + b2.width");
        assert_eq!(expand_axis("b1.position * 2", Axis::Y), "b1.top * 2");
        assert_eq!(expand_axis("&.size - 20", Axis::Y), "&.height - 20");
        assert_eq!(expand_axis("size", Axis::X), "width");
        assert_eq!(expand_axis("sizes.x + b1.w", Axis::X), "sizes.x + b1.w");
        assert_eq!(expand_axis("1 && 2", Axis::X), "1 && 2");
    }

    #[test]
    fn percentages_read_the_parent() {
        assert_eq!(expand_axis("50%", Axis::X), "(0.5 * &.width)");
        assert_eq!(expand_axis("25% - 4", Axis::Y), "(0.25 * &.height) - 4");
        assert_eq!(expand_axis("10 % 3", Axis::X), "10 % 3");
        assert_eq!(expand_axis("10%3", Axis::X), "10%3");
    }

    #[test]
    fn operators_compose_per_axis() {
        let a = Layout2d::new(1.0, 2.0);
        let b = Layout2d::from(Vec2::new(10.0, 20.0));
        assert_eq!((&a + &b).value(), Vec2::new(11.0, 22.0));
        assert_eq!((&b - &a).value(), Vec2::new(9.0, 18.0));
        assert_eq!((&b * 2.0).value(), Vec2::new(20.0, 40.0));
        assert_eq!((3.0 * &a).value(), Vec2::new(3.0, 6.0));
        assert_eq!((&Layout::new(2.0) * &a).value(), Vec2::new(2.0, 4.0));
        assert_eq!((&b / 4.0).value(), Vec2::new(2.5, 5.0));
        assert_eq!((&b % 3.0).value(), Vec2::new(1.0, 2.0));
        assert_eq!((-&a).value(), Vec2::new(-1.0, -2.0));
        assert_eq!((&a + Vec2::new(100.0, 50.0)).value(), Vec2::new(101.0, 52.0));
    }

    #[test]
    fn assign_operators() {
        let mut l = Layout2d::from((1.0, 2.0));
        l += Layout2d::from(1.0);
        l *= 3.0;
        l -= &Layout2d::new(1.0, 0.0);
        assert_eq!(l.value(), Vec2::new(5.0, 9.0));
    }

    #[test]
    fn equality_across_axes() {
        let a = Layout2d::new(1.0, 2.0);
        assert_eq!(a.equal(&Layout2d::new(1.0, 2.0)).value(), 1.0);
        assert_eq!(a.equal(&Layout2d::new(1.0, 3.0)).value(), 0.0);
        assert_eq!(a.not_equal(&Layout2d::new(1.0, 3.0)).value(), 1.0);
        assert_eq!(a.not_equal(&Layout2d::new(1.0, 2.0)).value(), 0.0);
    }

    #[test]
    fn update_callback_hears_both_axes() {
        use std::cell::Cell;

        let x = Layout::new(1.0);
        let y = Layout::new(2.0);
        let l = Layout2d::new(&x + 0.0, &y + 0.0);
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            l.connect_update_callback(move || hits.set(hits.get() + 1));
        }
        x.reset_value(5.0);
        y.reset_value(6.0);
        assert_eq!(hits.get(), 2);
        assert_eq!(l.value(), Vec2::new(5.0, 6.0));
    }
}
