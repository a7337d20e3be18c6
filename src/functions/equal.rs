//! The `*-equal` family: one implementation parameterized per datatype.
//!
//! Equality delegates to the value type's own notion of equality, so a
//! single implementation covers every supported datatype.

use std::sync::Arc;

use crate::attr::AttrType;
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{eval_args, Arity, Function, FunctionSignature, FUNCTION_NS_1};
use crate::result::EvaluationResult;

/// Value equality for one datatype.
#[derive(Debug)]
pub struct EqualFunction {
    identifier: String,
    arg_type: AttrType,
}

impl EqualFunction {
    pub fn new(arg_type: AttrType) -> Self {
        Self {
            identifier: format!("{}{}-equal", FUNCTION_NS_1, arg_type.function_prefix()),
            arg_type,
        }
    }
}

impl Function for EqualFunction {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn return_type(&self) -> AttrType {
        AttrType::Boolean
    }

    fn returns_bag(&self) -> bool {
        false
    }

    fn signature(&self) -> FunctionSignature {
        FunctionSignature::Uniform {
            arg_type: self.arg_type,
            is_bag: false,
            arity: Arity::Exact(2),
        }
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(2);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        EvaluationResult::of_bool(values[0] == values[1])
    }
}

/// One `*-equal` function for every supported datatype.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    AttrType::ALL
        .iter()
        .map(|ty| Arc::new(EqualFunction::new(*ty)) as Arc<dyn Function>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttributeValue, X500Name};
    use crate::context::BasicEvaluationCtx;
    use pretty_assertions::assert_eq;

    fn get(name: &str) -> Arc<dyn Function> {
        cluster()
            .into_iter()
            .find(|f| f.identifier() == format!("{}{}", FUNCTION_NS_1, name))
            .unwrap()
    }

    #[test]
    fn test_string_equal_is_case_sensitive() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("string-equal");
        let args = [
            Expression::Literal(AttributeValue::String("Hello".to_string())),
            Expression::Literal(AttributeValue::String("hello".to_string())),
        ];
        assert_eq!(f.evaluate(&args, &ctx), EvaluationResult::FALSE);
    }

    #[test]
    fn test_x500_equal_uses_canonical_form() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("x500Name-equal");
        let args = [
            Expression::Literal(AttributeValue::X500Name(X500Name::new(
                "CN = Alice, O=Example",
            ))),
            Expression::Literal(AttributeValue::X500Name(X500Name::new(
                "cn=alice,o=example",
            ))),
        ];
        assert_eq!(f.evaluate(&args, &ctx), EvaluationResult::TRUE);
    }

    #[test]
    fn test_cluster_covers_every_type() {
        assert_eq!(cluster().len(), AttrType::ALL.len());
    }

    #[test]
    fn test_equal_rejects_mismatched_types() {
        let f = get("integer-equal");
        let args = [
            Expression::Literal(AttributeValue::Integer(1)),
            Expression::Literal(AttributeValue::String("1".to_string())),
        ];
        assert!(f.check_inputs(&args).is_err());
    }
}
