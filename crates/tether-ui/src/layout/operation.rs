/// What an expression node computes from its operands.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operation {
    /// Literal or bound leaf: the value is set directly, never computed.
    Value,
    /// Unparsed expression text, evaluated by the parser on every recompute.
    StringExpr,
    Plus,
    Minus,
    Multiplies,
    Divides,
    Modulus,
    And,
    Or,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Minimum,
    Maximum,
    /// `condition ? then : else`, three operands.
    Conditional,
}

impl Operation {
    /// Number of operands a node with this operation owns.
    pub fn arity(self) -> usize {
        match self {
            Operation::Value | Operation::StringExpr => 0,
            Operation::Conditional => 3,
            _ => 2,
        }
    }

    /// Infix spelling used when rendering an expression back to text.
    pub fn symbol(self) -> Option<&'static str> {
        Some(match self {
            Operation::Plus => "+",
            Operation::Minus => "-",
            Operation::Multiplies => "*",
            Operation::Divides => "/",
            Operation::Modulus => "%",
            Operation::And => "&&",
            Operation::Or => "||",
            Operation::LessThan => "<",
            Operation::LessOrEqual => "<=",
            Operation::GreaterThan => ">",
            Operation::GreaterOrEqual => ">=",
            Operation::Equal => "==",
            Operation::NotEqual => "!=",
            _ => return None,
        })
    }

    /// Apply this operation to already computed operand values.
    ///
    /// Boolean results are `1.0`/`0.0`; any nonzero operand is true.
    /// Division and modulus by zero give `0`. Leaf operations and a wrong
    /// operand count also give `0`.
    pub fn apply(self, operands: &[f32]) -> f32 {
        if operands.len() != self.arity() || operands.is_empty() {
            return 0.0;
        }

        let a = operands[0];
        let b = operands.get(1).copied().unwrap_or(0.0);
        match self {
            Operation::Value | Operation::StringExpr => 0.0,
            Operation::Plus => a + b,
            Operation::Minus => a - b,
            Operation::Multiplies => a * b,
            Operation::Divides => {
                if b != 0.0 { a / b } else { 0.0 }
            }
            Operation::Modulus => {
                if b != 0.0 { a % b } else { 0.0 }
            }
            Operation::And => truth(a != 0.0 && b != 0.0),
            Operation::Or => truth(a != 0.0 || b != 0.0),
            Operation::LessThan => truth(a < b),
            Operation::LessOrEqual => truth(a <= b),
            Operation::GreaterThan => truth(a > b),
            Operation::GreaterOrEqual => truth(a >= b),
            Operation::Equal => truth(a == b),
            Operation::NotEqual => truth(a != b),
            // std::min / std::max ordering: the first operand wins ties.
            Operation::Minimum => {
                if b < a { b } else { a }
            }
            Operation::Maximum => {
                if a < b { b } else { a }
            }
            Operation::Conditional => {
                if a != 0.0 { operands[1] } else { operands[2] }
            }
        }
    }
}

#[inline]
pub(crate) fn truth(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}
