use super::{node_value, values_equal, Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::tree::{AttributeNode, Value};

/// `eq` / `neq`: deep value equality against a single operand.
///
/// Any operand count other than one is a plain `false` for both.
#[derive(Debug, Clone, Copy)]
pub struct Equality {
    negate: bool,
}

impl Equality {
    pub fn eq() -> Self {
        Equality { negate: false }
    }

    pub fn neq() -> Self {
        Equality { negate: true }
    }
}

impl Operator for Equality {
    fn name(&self) -> &'static str {
        if self.negate {
            "neq"
        } else {
            "eq"
        }
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        _ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let (Some(node), [operand]) = (target, operands) else {
            return Ok(false);
        };
        let equal = node
            .value
            .as_ref()
            .is_some_and(|value| values_equal(value, operand));
        Ok(equal != self.negate)
    }
}

/// `matches`: the target equals the value at another path of the same tree.
#[derive(Debug, Clone, Copy)]
pub struct Matches;

impl Operator for Matches {
    fn name(&self) -> &'static str {
        "matches"
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError> {
        if target.is_none() {
            return Ok(false);
        }
        let path = match super::single_operand(self.name(), operands)? {
            Value::String(path) => path,
            other => {
                return Err(OperatorError::InvalidOperand {
                    operator: self.name(),
                    reason: format!("expected a path string, got {}", other.type_name()),
                })
            }
        };
        let (Some(left), Some(right)) = (node_value(target), node_value(ctx.root.resolve(path)))
        else {
            return Ok(false);
        };
        Ok(values_equal(left, right))
    }
}
