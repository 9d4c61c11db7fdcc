use super::{single_operand, values_equal, Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::tree::{AttributeNode, Value};

/// Loose equality used by membership checks: deep equality, then numeric
/// equality, then equality of the rendered strings.
fn loosely_equal(value: &Value, operand: &Value) -> bool {
    if values_equal(value, operand) {
        return true;
    }
    if let (Some(a), Some(b)) = (value.as_f64(), operand.as_f64()) {
        return a == b;
    }
    value.to_string() == operand.to_string()
}

/// `in` / `notIn`: the target value equals one of the operands.
#[derive(Debug, Clone, Copy)]
pub struct Membership {
    negate: bool,
}

impl Membership {
    pub fn is_in() -> Self {
        Membership { negate: false }
    }

    pub fn not_in() -> Self {
        Membership { negate: true }
    }
}

impl Operator for Membership {
    fn name(&self) -> &'static str {
        if self.negate {
            "notIn"
        } else {
            "in"
        }
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        _ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let Some(node) = target else {
            return Ok(false);
        };
        if operands.is_empty() {
            return Err(OperatorError::Arity {
                operator: self.name(),
                expected: "at least 1",
                got: 0,
            });
        }
        let found = node
            .value
            .as_ref()
            .is_some_and(|value| operands.iter().any(|op| loosely_equal(value, op)));
        Ok(found != self.negate)
    }
}

/// `contains`: a list value holds the operand, a child carries it, or a
/// string value contains it as a substring.
#[derive(Debug, Clone, Copy)]
pub struct Contains;

impl Operator for Contains {
    fn name(&self) -> &'static str {
        "contains"
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        _ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let Some(node) = target else {
            return Ok(false);
        };
        let operand = single_operand(self.name(), operands)?;
        match &node.value {
            Some(Value::List(items)) => Ok(items.iter().any(|item| loosely_equal(item, operand))),
            Some(Value::String(s)) => Ok(s.contains(operand.to_string().as_str())),
            _ if !node.children.is_empty() => Ok(node
                .children
                .values()
                .filter_map(|child| child.value.as_ref())
                .any(|value| loosely_equal(value, operand))),
            Some(other) => Err(OperatorError::UnsupportedShape {
                operator: self.name(),
                shape: other.type_name().to_string(),
            }),
            None => Err(OperatorError::UnsupportedShape {
                operator: self.name(),
                shape: "node without value or children".to_string(),
            }),
        }
    }
}
