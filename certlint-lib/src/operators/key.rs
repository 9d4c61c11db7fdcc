use super::{single_operand, string_operands, Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::fields::KeyAlgorithm;
use crate::tree::{AttributeNode, Value};

/// `keyAlgorithm`: the public key algorithm of the certificate under test is
/// one of the operands (`RSA`, `EC`/`ECDSA`, `Ed25519`, `Ed448`, case
/// insensitive). Unknown algorithms never match.
#[derive(Debug, Clone, Copy)]
pub struct KeyAlgorithmIn;

impl Operator for KeyAlgorithmIn {
    fn name(&self) -> &'static str {
        "keyAlgorithm"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError> {
        if operands.is_empty() {
            return Err(OperatorError::Arity {
                operator: self.name(),
                expected: "at least 1",
                got: 0,
            });
        }
        let Some(cert) = ctx.certificate() else {
            return Ok(false);
        };
        let algorithm = &cert.public_key.algorithm;
        if matches!(algorithm, KeyAlgorithm::Unknown { .. }) {
            return Ok(false);
        }
        Ok(string_operands(operands).iter().any(|wanted| {
            wanted.eq_ignore_ascii_case(algorithm.name())
                || (wanted.eq_ignore_ascii_case("ECDSA")
                    && matches!(algorithm, KeyAlgorithm::Ec { .. }))
        }))
    }
}

/// `minKeySize`: the key of the certificate under test has at least the
/// given number of bits. Keys of unknown size fail.
#[derive(Debug, Clone, Copy)]
pub struct MinKeySize;

impl Operator for MinKeySize {
    fn name(&self) -> &'static str {
        "minKeySize"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let operand = single_operand(self.name(), operands)?;
        let minimum = operand.as_f64().ok_or_else(|| OperatorError::NotNumeric {
            operator: self.name(),
            value: operand.to_string(),
        })?;
        let Some(bits) = ctx.certificate().and_then(|c| c.public_key.algorithm.key_size()) else {
            return Ok(false);
        };
        Ok(f64::from(bits) >= minimum)
    }
}
