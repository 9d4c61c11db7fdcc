use super::{single_operand, Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::tree::{AttributeNode, Value};

/// Length of a node: characters of a string, bytes, list items, or the
/// number of children when the node has no value. Other scalars have none.
fn node_len(node: &AttributeNode) -> Option<usize> {
    match &node.value {
        Some(Value::String(s)) => Some(s.chars().count()),
        Some(Value::Bytes(b)) => Some(b.len()),
        Some(Value::List(items)) => Some(items.len()),
        Some(_) => None,
        None => Some(node.children.len()),
    }
}

/// `minLength` / `maxLength`.
#[derive(Debug, Clone, Copy)]
pub struct Length {
    max: bool,
}

impl Length {
    pub fn min() -> Self {
        Length { max: false }
    }

    pub fn max() -> Self {
        Length { max: true }
    }
}

impl Operator for Length {
    fn name(&self) -> &'static str {
        if self.max {
            "maxLength"
        } else {
            "minLength"
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
        let operand = single_operand(self.name(), operands)?;
        let bound = match operand {
            Value::Int(n) => usize::try_from(*n).ok(),
            Value::UInt(n) => usize::try_from(*n).ok(),
            _ => None,
        }
        .ok_or_else(|| OperatorError::InvalidOperand {
            operator: self.name(),
            reason: format!("expected a non-negative integer, got {}", operand),
        })?;

        let Some(len) = node_len(node) else {
            return Ok(false);
        };
        Ok(if self.max { len <= bound } else { len >= bound })
    }
}

/// `isEmpty` / `notEmpty`. An absent node counts as empty.
#[derive(Debug, Clone, Copy)]
pub struct Emptiness {
    negate: bool,
}

impl Emptiness {
    pub fn is_empty() -> Self {
        Emptiness { negate: false }
    }

    pub fn not_empty() -> Self {
        Emptiness { negate: true }
    }
}

fn is_empty_node(target: Option<&AttributeNode>) -> bool {
    let Some(node) = target else {
        return true;
    };
    match &node.value {
        None => node.children.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bytes(b)) => b.is_empty(),
        Some(Value::List(items)) => items.is_empty(),
        Some(_) => false,
    }
}

impl Operator for Emptiness {
    fn name(&self) -> &'static str {
        if self.negate {
            "notEmpty"
        } else {
            "isEmpty"
        }
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        _ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        Ok(is_empty_node(target) != self.negate)
    }
}

/// `present`: the target path exists.
#[derive(Debug, Clone, Copy)]
pub struct Present;

impl Operator for Present {
    fn name(&self) -> &'static str {
        "present"
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        _ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        Ok(target.is_some())
    }
}
