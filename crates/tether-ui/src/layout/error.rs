use std::fmt;

/// Why a layout expression could not be evaluated.
///
/// Layout evaluation never surfaces this: a malformed expression evaluates to
/// `0` and the error is logged. [`crate::layout::try_parse`] returns it for
/// tooling that wants to report the problem.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// `(` without its `)`.
    UnmatchedBracket,
    /// A `)` or `:` left over once brackets and conditionals are resolved.
    StrayToken(char),
    /// `if` without `then`/`else`, or `?` without `:`.
    MalformedConditional,
    /// `range` called with other than three arguments.
    ArgumentCount { function: &'static str, found: usize },
    /// A token that is neither a number nor a widget attribute.
    InvalidNumber(String),
    /// Unbalanced or misplaced `{x, y}` braces in a 2D expression.
    MalformedBraces,
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionError::UnmatchedBracket => write!(f, "bracket mismatch"),
            ExpressionError::StrayToken(c) => write!(f, "unexpected {c:?}"),
            ExpressionError::MalformedConditional => write!(f, "malformed conditional"),
            ExpressionError::ArgumentCount { function, found } => {
                write!(f, "{function} takes 3 arguments, got {found}")
            }
            ExpressionError::InvalidNumber(s) => write!(f, "invalid value {s:?}"),
            ExpressionError::MalformedBraces => write!(f, "malformed {{x, y}} braces"),
        }
    }
}

impl std::error::Error for ExpressionError {}
