//! The per-datatype bag functions: `*-one-and-only`, `*-bag-size`,
//! `*-is-in`, and `*-bag`.

use std::sync::Arc;

use crate::attr::{AttrType, AttributeValue, Bag};
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{
    eval_args, Arity, Function, FunctionSignature, Parameter, FUNCTION_NS_1,
};
use crate::result::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BagOp {
    OneAndOnly,
    Size,
    IsIn,
    Construct,
}

impl BagOp {
    fn name_suffix(&self) -> &'static str {
        match self {
            BagOp::OneAndOnly => "one-and-only",
            BagOp::Size => "bag-size",
            BagOp::IsIn => "is-in",
            BagOp::Construct => "bag",
        }
    }
}

/// One bag operation instantiated for one datatype.
#[derive(Debug)]
pub struct BagFunction {
    identifier: String,
    op: BagOp,
    element_type: AttrType,
}

impl BagFunction {
    fn new(element_type: AttrType, op: BagOp) -> Self {
        Self {
            identifier: format!(
                "{}{}-{}",
                FUNCTION_NS_1,
                element_type.function_prefix(),
                op.name_suffix()
            ),
            op,
            element_type,
        }
    }
}

impl Function for BagFunction {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn return_type(&self) -> AttrType {
        match self.op {
            BagOp::OneAndOnly | BagOp::Construct => self.element_type,
            BagOp::Size => AttrType::Integer,
            BagOp::IsIn => AttrType::Boolean,
        }
    }

    fn returns_bag(&self) -> bool {
        self.op == BagOp::Construct
    }

    fn signature(&self) -> FunctionSignature {
        match self.op {
            BagOp::OneAndOnly | BagOp::Size => {
                FunctionSignature::Positional(vec![Parameter::bag(self.element_type)])
            }
            BagOp::IsIn => FunctionSignature::Positional(vec![
                Parameter::scalar(self.element_type),
                Parameter::bag(self.element_type),
            ]),
            BagOp::Construct => FunctionSignature::Uniform {
                arg_type: self.element_type,
                is_bag: false,
                arity: Arity::AtLeast(0),
            },
        }
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(args.len());
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        match self.op {
            BagOp::OneAndOnly => match values[0].as_bag() {
                Some(bag) if bag.size() == 1 => {
                    EvaluationResult::Value(bag.values()[0].clone())
                }
                Some(bag) => EvaluationResult::processing_error(format!(
                    "expected a bag of exactly one value, got {}",
                    bag.size()
                )),
                None => EvaluationResult::processing_error("unexpected argument type"),
            },
            BagOp::Size => match values[0].as_bag() {
                Some(bag) => {
                    EvaluationResult::Value(AttributeValue::Integer(bag.size() as i64))
                }
                None => EvaluationResult::processing_error("unexpected argument type"),
            },
            BagOp::IsIn => match values[1].as_bag() {
                Some(bag) => EvaluationResult::of_bool(bag.contains(&values[0])),
                None => EvaluationResult::processing_error("unexpected argument type"),
            },
            BagOp::Construct => match Bag::new(self.element_type, values) {
                Ok(bag) => EvaluationResult::bag(bag),
                Err(e) => EvaluationResult::processing_error(e.to_string()),
            },
        }
    }
}

/// The four bag functions for every supported datatype.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    let mut out: Vec<Arc<dyn Function>> = Vec::with_capacity(AttrType::ALL.len() * 4);
    for ty in AttrType::ALL {
        for op in [BagOp::OneAndOnly, BagOp::Size, BagOp::IsIn, BagOp::Construct] {
            out.push(Arc::new(BagFunction::new(ty, op)));
        }
    }
    out
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

    fn int(n: i64) -> Expression {
        Expression::Literal(AttributeValue::Integer(n))
    }

    fn int_bag(values: &[i64]) -> Expression {
        Expression::Literal(AttributeValue::Bag(
            Bag::new(
                AttrType::Integer,
                values.iter().map(|n| AttributeValue::Integer(*n)).collect(),
            )
            .unwrap(),
        ))
    }

    #[test]
    fn test_one_and_only() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("integer-one-and-only");
        assert_eq!(
            f.evaluate(&[int_bag(&[7])], &ctx),
            EvaluationResult::Value(AttributeValue::Integer(7))
        );
        assert!(f.evaluate(&[int_bag(&[])], &ctx).is_indeterminate());
        assert!(f.evaluate(&[int_bag(&[1, 2])], &ctx).is_indeterminate());
    }

    #[test]
    fn test_bag_size() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("integer-bag-size");
        assert_eq!(
            f.evaluate(&[int_bag(&[1, 1, 2])], &ctx),
            EvaluationResult::Value(AttributeValue::Integer(3))
        );
    }

    #[test]
    fn test_is_in_uses_value_equality() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("integer-is-in");
        assert_eq!(
            f.evaluate(&[int(2), int_bag(&[1, 2, 3])], &ctx),
            EvaluationResult::TRUE
        );
        assert_eq!(
            f.evaluate(&[int(9), int_bag(&[1, 2, 3])], &ctx),
            EvaluationResult::FALSE
        );
    }

    #[test]
    fn test_bag_construction_keeps_duplicates() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("integer-bag");
        match f.evaluate(&[int(1), int(1), int(2)], &ctx) {
            EvaluationResult::Value(AttributeValue::Bag(bag)) => {
                assert_eq!(bag.size(), 3);
                assert_eq!(bag.element_type(), AttrType::Integer);
            }
            other => panic!("expected bag, got {:?}", other),
        }
        assert!(f.returns_bag());
    }

    #[test]
    fn test_empty_bag_construction() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("string-bag");
        match f.evaluate(&[], &ctx) {
            EvaluationResult::Value(AttributeValue::Bag(bag)) => {
                assert!(bag.is_empty());
                assert_eq!(bag.element_type(), AttrType::String);
            }
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn test_one_and_only_rejects_scalar_argument() {
        let f = get("integer-one-and-only");
        assert!(f.check_inputs(&[int(1)]).is_err());
    }
}
