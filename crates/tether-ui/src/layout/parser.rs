//! Layout expression text to a number.
//!
//! Evaluation works on the text directly, by recursive splitting:
//!
//! 1. Innermost bracket groups are evaluated first and replaced by their
//!    value; `min(..)`, `max(..)` and `range(..)` groups are applied as
//!    functions.
//! 2. Conditionals: `if c then a else b` or `c ? a : b`, whichever starts
//!    first.
//! 3. Binary operators, split at the rightmost occurrence of the loosest
//!    operator present: `||`/`or`, `&&`/`and`, `==`/`!=`, `<`/`<=`/`>`/`>=`,
//!    `+`/`-`, then `*`/`/`/`%`.
//! 4. Unary sign, then a number literal or a widget attribute reference.
//!
//! A syntax error makes the whole expression `0`. A reference that cannot be
//! resolved is `0` where it appears and the rest of the expression still
//! evaluates.

use crate::layout::error::ExpressionError;
use crate::layout::operation::Operation;
use crate::layout::resolve::{self, NoSubscriptions, Subscriber};
use crate::widget::WidgetRef;

type Result<T> = std::result::Result<T, ExpressionError>;

/// Evaluate `expression`, reading widget attributes relative to `context`.
///
/// Malformed text evaluates to `0` and is logged at `warn`.
pub fn parse(expression: &str, context: Option<&WidgetRef>) -> f32 {
    evaluate(expression, context, &mut NoSubscriptions)
}

/// Like [`parse`] but reports syntax errors instead of degrading to `0`.
///
/// Unresolvable widget references still evaluate to `0`.
pub fn try_parse(expression: &str, context: Option<&WidgetRef>) -> Result<f32> {
    Parser::new(context, &mut NoSubscriptions).run(expression)
}

/// [`parse`], registering every resolved reference with `subscriber`.
pub(crate) fn evaluate(
    expression: &str,
    context: Option<&WidgetRef>,
    subscriber: &mut dyn Subscriber,
) -> f32 {
    match Parser::new(context, subscriber).run(expression) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("layout expression {expression:?}: {e}");
            0.0
        }
    }
}

// ── Parser ────────────────────────────────────────────────────────────────

pub(crate) struct Parser<'a> {
    context: Option<&'a WidgetRef>,
    subscriber: &'a mut dyn Subscriber,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(context: Option<&'a WidgetRef>, subscriber: &'a mut dyn Subscriber) -> Self {
        Self { context, subscriber }
    }

    pub(crate) fn run(&mut self, expression: &str) -> Result<f32> {
        self.parse(&expression.to_lowercase())
    }

    fn parse(&mut self, text: &str) -> Result<f32> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(0.0);
        }
        let flat = self.resolve_brackets(text)?;
        self.parse_flat(&flat)
    }

    // ── Brackets ──────────────────────────────────────────────────────────

    /// Replace every bracket group with its value, innermost first.
    fn resolve_brackets(&mut self, text: &str) -> Result<String> {
        let mut text = text.to_owned();
        while let Some(open) = text.rfind('(') {
            let close = text[open..]
                .find(')')
                .map(|i| open + i)
                .ok_or(ExpressionError::UnmatchedBracket)?;
            let inner = text[open + 1..close].to_owned();
            let head = text[..open].trim_end();

            let (start, value) = if let Some(start) = function_start(head, "max") {
                (start, self.fold(&inner, Operation::Maximum)?)
            } else if let Some(start) = function_start(head, "min") {
                (start, self.fold(&inner, Operation::Minimum)?)
            } else if let Some(start) = function_start(head, "range") {
                (start, self.range(&inner)?)
            } else {
                (open, self.parse(&inner)?)
            };

            // Padding keeps the value from fusing with neighbouring keywords.
            text = format!("{} {} {}", &text[..start], value, &text[close + 1..]);
        }
        Ok(text)
    }

    /// `min(a, b, ..)` / `max(a, b, ..)`. No arguments gives `0`.
    fn fold(&mut self, arguments: &str, operation: Operation) -> Result<f32> {
        if arguments.trim().is_empty() {
            return Ok(0.0);
        }
        let mut result: Option<f32> = None;
        for argument in arguments.split(',') {
            let value = self.parse_flat(argument)?;
            result = Some(match result {
                Some(acc) => operation.apply(&[acc, value]),
                None => value,
            });
        }
        Ok(result.unwrap_or(0.0))
    }

    /// `range(min, max, value)`: the value clamped to `[min, max]`.
    fn range(&mut self, arguments: &str) -> Result<f32> {
        let arguments: Vec<&str> = if arguments.trim().is_empty() {
            Vec::new()
        } else {
            arguments.split(',').collect()
        };
        let [minimum, maximum, value] = arguments.as_slice() else {
            return Err(ExpressionError::ArgumentCount { function: "range", found: arguments.len() });
        };

        let minimum = self.parse_flat(minimum)?;
        let maximum = self.parse_flat(maximum)?;
        let value = self.parse_flat(value)?;
        let at_least = Operation::Maximum.apply(&[value, minimum]);
        Ok(Operation::Minimum.apply(&[at_least, maximum]))
    }

    // ── Bracket-free text ─────────────────────────────────────────────────

    fn parse_flat(&mut self, text: &str) -> Result<f32> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(0.0);
        }

        if let Some(value) = self.parse_conditional(text)? {
            return Ok(value);
        }
        if let Some(stray) = text.chars().find(|&c| c == ')' || c == ':') {
            return Err(ExpressionError::StrayToken(stray));
        }
        self.parse_binary(text)
    }

    // ── Conditionals ──────────────────────────────────────────────────────

    fn parse_conditional(&mut self, text: &str) -> Result<Option<f32>> {
        let keyword = find_keyword(text, "if", 0);
        let question = text.find('?');
        match (keyword, question) {
            (None, None) => Ok(None),
            (Some(at), Some(q)) if q < at => self.parse_ternary(text, q).map(Some),
            (Some(at), _) => self.parse_if(text, at).map(Some),
            (None, Some(q)) => self.parse_ternary(text, q).map(Some),
        }
    }

    /// `prefix if c then a else b`. The chosen value is substituted back
    /// into the prefix.
    fn parse_if(&mut self, text: &str, at: usize) -> Result<f32> {
        let body = at + "if".len();
        let mut cursor = body;
        let mut depth = 0usize;
        let mut then_at = None;
        let mut else_at = None;

        while let Some((pos, keyword)) = next_keyword(text, cursor) {
            cursor = pos + keyword.len();
            match keyword {
                "if" => depth += 1,
                "then" if depth == 0 && then_at.is_none() => then_at = Some(pos),
                "else" if depth > 0 => depth -= 1,
                "else" => {
                    else_at = Some(pos);
                    break;
                }
                _ => {}
            }
        }

        let (Some(then_at), Some(else_at)) = (then_at, else_at) else {
            return Err(ExpressionError::MalformedConditional);
        };

        let condition = self.parse_flat(&text[body..then_at])?;
        let then = self.parse_flat(&text[then_at + "then".len()..else_at])?;
        let otherwise = self.parse_flat(&text[else_at + "else".len()..])?;
        let value = Operation::Conditional.apply(&[condition, then, otherwise]);

        let prefix = text[..at].trim();
        if prefix.is_empty() {
            Ok(value)
        } else {
            self.parse_flat(&format!("{prefix} {value}"))
        }
    }

    /// `c ? a : b`, where `a` may hold nested ternaries.
    fn parse_ternary(&mut self, text: &str, question: usize) -> Result<f32> {
        let mut depth = 0usize;
        let mut colon = None;
        for (i, c) in text[question + 1..].char_indices() {
            match c {
                '?' => depth += 1,
                ':' if depth == 0 => {
                    colon = Some(question + 1 + i);
                    break;
                }
                ':' => depth -= 1,
                _ => {}
            }
        }
        let colon = colon.ok_or(ExpressionError::MalformedConditional)?;

        let condition = self.parse_flat(&text[..question])?;
        let then = self.parse_flat(&text[question + 1..colon])?;
        let otherwise = self.parse_flat(&text[colon + 1..])?;
        Ok(Operation::Conditional.apply(&[condition, then, otherwise]))
    }

    // ── Operators ─────────────────────────────────────────────────────────

    fn parse_binary(&mut self, text: &str) -> Result<f32> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(0.0);
        }

        let split = split_logical(text)
            .or_else(|| split_equality(text))
            .or_else(|| split_relational(text))
            .or_else(|| split_additive(text))
            .or_else(|| split_multiplicative(text));
        if let Some(Split { at, len, operation }) = split {
            let left = self.parse_binary(&text[..at])?;
            let right = self.parse_binary(&text[at + len..])?;
            return Ok(operation.apply(&[left, right]));
        }

        if let Some(rest) = text.strip_prefix('-') {
            return Ok(-self.parse_binary(rest)?);
        }
        if let Some(rest) = text.strip_prefix('+') {
            return self.parse_binary(rest);
        }
        self.parse_operand(text)
    }

    fn parse_operand(&mut self, token: &str) -> Result<f32> {
        if let Ok(value) = token.parse::<f32>() {
            return Ok(value);
        }
        resolve::attribute_reference(token, self.context, &mut *self.subscriber)
            .ok_or_else(|| ExpressionError::InvalidNumber(token.to_owned()))
    }
}

// ── Splitting helpers ─────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq)]
struct Split {
    at: usize,
    len: usize,
    operation: Operation,
}

impl Split {
    fn new(at: usize, len: usize, operation: Operation) -> Self {
        Self { at, len, operation }
    }
}

fn rightmost(candidates: impl IntoIterator<Item = Option<Split>>) -> Option<Split> {
    candidates.into_iter().flatten().max_by_key(|split| split.at)
}

/// `||`/`or` binds looser than `&&`/`and`.
fn split_logical(text: &str) -> Option<Split> {
    rightmost([
        text.rfind("||").map(|at| Split::new(at, 2, Operation::Or)),
        rfind_keyword(text, "or").map(|at| Split::new(at, 2, Operation::Or)),
    ])
    .or_else(|| {
        rightmost([
            text.rfind("&&").map(|at| Split::new(at, 2, Operation::And)),
            rfind_keyword(text, "and").map(|at| Split::new(at, 3, Operation::And)),
        ])
    })
}

fn split_equality(text: &str) -> Option<Split> {
    rightmost([
        text.rfind("==").map(|at| Split::new(at, 2, Operation::Equal)),
        text.rfind("!=").map(|at| Split::new(at, 2, Operation::NotEqual)),
    ])
}

fn split_relational(text: &str) -> Option<Split> {
    let at = text.rfind(['<', '>'])?;
    let or_equal = text[at + 1..].starts_with('=');
    let operation = match (text.as_bytes()[at], or_equal) {
        (b'<', false) => Operation::LessThan,
        (b'<', true) => Operation::LessOrEqual,
        (_, false) => Operation::GreaterThan,
        (_, true) => Operation::GreaterOrEqual,
    };
    Some(Split::new(at, if or_equal { 2 } else { 1 }, operation))
}

/// Rightmost binary `+`/`-`. A sign with nothing or another operator on its
/// left is unary, as is the sign of an exponent like `1e-3`.
fn split_additive(text: &str) -> Option<Split> {
    let mut end = text.len();
    while let Some(at) = text[..end].rfind(['+', '-']) {
        let left = text[..at].trim_end();
        let unary = left.is_empty() || left.ends_with(['+', '-', '*', '/', '%']);
        if !unary && !is_exponent(&text[..at]) {
            let operation = if text.as_bytes()[at] == b'+' {
                Operation::Plus
            } else {
                Operation::Minus
            };
            return Some(Split::new(at, 1, operation));
        }
        end = at;
    }
    None
}

fn split_multiplicative(text: &str) -> Option<Split> {
    let at = text.rfind(['*', '/', '%'])?;
    let operation = match text.as_bytes()[at] {
        b'*' => Operation::Multiplies,
        b'/' => Operation::Divides,
        _ => Operation::Modulus,
    };
    Some(Split::new(at, 1, operation))
}

/// Whether `left` ends in the mantissa of a number like `2.5e`.
fn is_exponent(left: &str) -> bool {
    let Some(mantissa) = left.strip_suffix(['e', 'E']) else {
        return false;
    };
    let start = mantissa
        .rfind(|c: char| !(c.is_ascii_digit() || c == '.'))
        .map_or(0, |i| i + 1);
    let digits = &mantissa[start..];
    let standalone = mantissa[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '.'));
    standalone && !digits.is_empty() && digits.parse::<f32>().is_ok()
}

// ── Keywords ──────────────────────────────────────────────────────────────

/// First whitespace-delimited occurrence of `keyword` at or after `from`.
fn find_keyword(text: &str, keyword: &str, from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(offset) = text.get(from..)?.find(keyword) {
        let at = from + offset;
        if is_delimited(text, at, keyword.len()) {
            return Some(at);
        }
        from = at + keyword.len();
    }
    None
}

fn rfind_keyword(text: &str, keyword: &str) -> Option<usize> {
    let mut end = text.len();
    while let Some(at) = text[..end].rfind(keyword) {
        if is_delimited(text, at, keyword.len()) {
            return Some(at);
        }
        end = at;
    }
    None
}

fn is_delimited(text: &str, at: usize, len: usize) -> bool {
    let before = text[..at].chars().next_back();
    let after = text[at + len..].chars().next();
    before.is_none_or(char::is_whitespace) && after.is_none_or(char::is_whitespace)
}

/// The next `if`, `then` or `else` at or after `from`.
fn next_keyword(text: &str, from: usize) -> Option<(usize, &'static str)> {
    ["if", "then", "else"]
        .into_iter()
        .filter_map(|keyword| find_keyword(text, keyword, from).map(|at| (at, keyword)))
        .min_by_key(|&(at, _)| at)
}

/// Start of `name` if `head` ends with it as a whole word.
fn function_start(head: &str, name: &str) -> Option<usize> {
    let start = head.len().checked_sub(name.len())?;
    if !head.ends_with(name) {
        return None;
    }
    let standalone = head[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '.'));
    standalone.then_some(start)
}
