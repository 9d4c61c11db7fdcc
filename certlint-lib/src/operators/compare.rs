use super::{single_operand, Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::tree::{AttributeNode, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Numeric comparison of the target against one operand. Both sides are
/// coerced to `f64`; a non-numeric side is an error.
#[derive(Debug, Clone, Copy)]
pub struct Compare {
    op: CompareOp,
}

impl Compare {
    pub fn new(op: CompareOp) -> Self {
        Compare { op }
    }
}

fn numeric(operator: &'static str, value: Option<&Value>) -> Result<f64, OperatorError> {
    match value {
        Some(v) => v.as_f64().ok_or_else(|| OperatorError::NotNumeric {
            operator,
            value: v.to_string(),
        }),
        None => Err(OperatorError::NotNumeric {
            operator,
            value: "<no value>".into(),
        }),
    }
}

impl Operator for Compare {
    fn name(&self) -> &'static str {
        match self.op {
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
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
        let left = numeric(self.name(), node.value.as_ref())?;
        let right = numeric(self.name(), Some(operand))?;
        Ok(match self.op {
            CompareOp::Gt => left > right,
            CompareOp::Gte => left >= right,
            CompareOp::Lt => left < right,
            CompareOp::Lte => left <= right,
        })
    }
}

/// `positive`: the target is a number greater than zero. Byte values are
/// read as unsigned big-endian integers and strings as decimal numbers.
#[derive(Debug, Clone, Copy)]
pub struct Positive;

impl Operator for Positive {
    fn name(&self) -> &'static str {
        "positive"
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        _ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let Some(value) = super::node_value(target) else {
            return Ok(false);
        };
        Ok(match value {
            Value::Int(v) => *v > 0,
            Value::UInt(v) => *v > 0,
            Value::Float(v) => *v > 0.0,
            Value::Bytes(bytes) => bytes.iter().any(|b| *b != 0),
            Value::String(s) => decimal_is_positive(s.trim()),
            _ => false,
        })
    }
}

/// Whether a decimal string (integer of any length, or float) is above zero.
fn decimal_is_positive(text: &str) -> bool {
    let digits = text.strip_prefix('+').unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return digits.bytes().any(|b| b != b'0');
    }
    text.parse::<f64>().is_ok_and(|v| v > 0.0)
}
