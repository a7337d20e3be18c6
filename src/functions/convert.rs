//! Numeric conversion functions.

use std::sync::Arc;

use crate::attr::{AttrType, AttributeValue};
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{eval_args, Arity, Function, FunctionSignature, FUNCTION_NS_1};
use crate::result::EvaluationResult;

/// `double-to-integer` (truncation toward zero) and `integer-to-double`.
#[derive(Debug)]
pub struct NumericConvertFunction {
    identifier: String,
    arg_type: AttrType,
}

impl NumericConvertFunction {
    fn new(name: &str, arg_type: AttrType) -> Self {
        Self {
            identifier: format!("{}{}", FUNCTION_NS_1, name),
            arg_type,
        }
    }
}

impl Function for NumericConvertFunction {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn return_type(&self) -> AttrType {
        match self.arg_type {
            AttrType::Double => AttrType::Integer,
            _ => AttrType::Double,
        }
    }

    fn returns_bag(&self) -> bool {
        false
    }

    fn signature(&self) -> FunctionSignature {
        FunctionSignature::Uniform {
            arg_type: self.arg_type,
            is_bag: false,
            arity: Arity::Exact(1),
        }
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(1);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        match &values[0] {
            AttributeValue::Double(d) => {
                if d.is_nan() || *d < i64::MIN as f64 || *d >= i64::MAX as f64 {
                    return EvaluationResult::processing_error(
                        "double out of integer range",
                    );
                }
                EvaluationResult::Value(AttributeValue::Integer(d.trunc() as i64))
            }
            AttributeValue::Integer(n) => {
                EvaluationResult::Value(AttributeValue::Double(*n as f64))
            }
            _ => EvaluationResult::processing_error("unexpected argument type"),
        }
    }
}

/// Both numeric conversion functions.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(NumericConvertFunction::new(
            "double-to-integer",
            AttrType::Double,
        )),
        Arc::new(NumericConvertFunction::new(
            "integer-to-double",
            AttrType::Integer,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BasicEvaluationCtx;
    use pretty_assertions::assert_eq;

    fn get(name: &str) -> Arc<dyn Function> {
        cluster()
            .into_iter()
            .find(|f| f.identifier() == format!("{}{}", FUNCTION_NS_1, name))
            .unwrap()
    }

    #[test]
    fn test_double_to_integer_truncates_toward_zero() {
        let f = get("double-to-integer");
        let ctx = BasicEvaluationCtx::new();
        assert_eq!(
            f.evaluate(&[Expression::Literal(AttributeValue::Double(2.9))], &ctx),
            EvaluationResult::Value(AttributeValue::Integer(2))
        );
        assert_eq!(
            f.evaluate(&[Expression::Literal(AttributeValue::Double(-2.9))], &ctx),
            EvaluationResult::Value(AttributeValue::Integer(-2))
        );
    }

    #[test]
    fn test_double_to_integer_rejects_nan() {
        let f = get("double-to-integer");
        let ctx = BasicEvaluationCtx::new();
        assert!(f
            .evaluate(&[Expression::Literal(AttributeValue::Double(f64::NAN))], &ctx)
            .is_indeterminate());
    }

    #[test]
    fn test_integer_to_double() {
        let f = get("integer-to-double");
        let ctx = BasicEvaluationCtx::new();
        assert_eq!(
            f.evaluate(&[Expression::Literal(AttributeValue::Integer(5))], &ctx),
            EvaluationResult::Value(AttributeValue::Double(5.0))
        );
        assert_eq!(f.return_type(), AttrType::Double);
    }
}
