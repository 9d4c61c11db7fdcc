use super::{Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::tree::{AttributeNode, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// `before` / `after`: compare a timestamp value with the operand, or with
/// the context clock when the operand is absent or `"now"`.
#[derive(Debug, Clone, Copy)]
pub struct Temporal {
    after: bool,
}

impl Temporal {
    pub fn before() -> Self {
        Temporal { after: false }
    }

    pub fn after() -> Self {
        Temporal { after: true }
    }
}

/// Accepted operand formats: RFC 3339, `YYYY-MM-DDTHH:MM:SSZ`, and a bare
/// date (midnight UTC). Integers are read as Unix seconds.
pub(crate) fn parse_timestamp(text: &str) -> Option<OffsetDateTime> {
    if let Ok(t) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(t);
    }
    let zulu = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    if let Ok(t) = PrimitiveDateTime::parse(text, &zulu) {
        return Some(t.assume_utc());
    }
    let date_only = format_description!("[year]-[month]-[day]");
    Date::parse(text, &date_only)
        .ok()
        .map(|d| d.midnight().assume_utc())
}

impl Temporal {
    fn reference(
        &self,
        ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<OffsetDateTime, OperatorError> {
        let invalid = |value: &Value| OperatorError::InvalidTimestamp {
            operator: self.name(),
            value: value.to_string(),
        };
        match operands {
            [] => Ok(ctx.now),
            [Value::String(s)] if s.eq_ignore_ascii_case("now") => Ok(ctx.now),
            [v @ Value::String(s)] => parse_timestamp(s).ok_or_else(|| invalid(v)),
            [Value::Time(t)] => Ok(*t),
            [v @ Value::Int(secs)] => {
                OffsetDateTime::from_unix_timestamp(*secs).map_err(|_| invalid(v))
            }
            [other] => Err(invalid(other)),
            _ => Err(OperatorError::Arity {
                operator: self.name(),
                expected: "0 or 1",
                got: operands.len(),
            }),
        }
    }
}

impl Operator for Temporal {
    fn name(&self) -> &'static str {
        if self.after {
            "after"
        } else {
            "before"
        }
    }

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let Some(node) = target else {
            return Ok(false);
        };
        let reference = self.reference(ctx, operands)?;
        let value = match &node.value {
            Some(Value::Time(t)) => *t,
            Some(other) => {
                return Err(OperatorError::UnsupportedShape {
                    operator: self.name(),
                    shape: format!("{} (expected timestamp)", other.type_name()),
                })
            }
            None => return Ok(false),
        };
        Ok(if self.after {
            value > reference
        } else {
            value < reference
        })
    }
}
