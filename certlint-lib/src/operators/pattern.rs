use super::{single_operand, Operator, OperatorError, RegexCache};
use crate::context::EvaluationContext;
use crate::tree::{AttributeNode, Value};
use std::sync::Arc;

/// `regex` / `notRegex`: match a string value against a pattern.
///
/// Non-string values are `false` for both forms. Compiled patterns come
/// from the shared [`RegexCache`].
#[derive(Debug, Clone)]
pub struct RegexMatch {
    negate: bool,
    cache: Arc<RegexCache>,
}

impl RegexMatch {
    pub fn new(cache: Arc<RegexCache>) -> Self {
        RegexMatch {
            negate: false,
            cache,
        }
    }

    pub fn negated(cache: Arc<RegexCache>) -> Self {
        RegexMatch {
            negate: true,
            cache,
        }
    }
}

impl Operator for RegexMatch {
    fn name(&self) -> &'static str {
        if self.negate {
            "notRegex"
        } else {
            "regex"
        }
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        _ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError> {
        if target.is_none() {
            return Ok(false);
        }
        let pattern = match single_operand(self.name(), operands)? {
            Value::String(p) => p,
            other => {
                return Err(OperatorError::InvalidOperand {
                    operator: self.name(),
                    reason: format!("pattern must be a string, got {}", other.type_name()),
                })
            }
        };
        let re = self
            .cache
            .get_or_compile(pattern)
            .map_err(|e| OperatorError::InvalidPattern {
                operator: self.name(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;

        let Some(Value::String(text)) = super::node_value(target) else {
            return Ok(false);
        };
        Ok(re.is_match(text) != self.negate)
    }
}
