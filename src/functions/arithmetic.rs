//! Arithmetic functions over integers and doubles.

use std::sync::Arc;

use crate::attr::{AttrType, AttributeValue};
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{eval_args, Arity, Function, FunctionSignature, FUNCTION_NS_1};
use crate::result::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Abs,
    Round,
    Floor,
}

/// One arithmetic operator instantiated for one numeric datatype.
#[derive(Debug)]
pub struct ArithmeticFunction {
    identifier: String,
    op: ArithmeticOp,
    arg_type: AttrType,
    arity: Arity,
}

impl ArithmeticFunction {
    fn new(name: &str, op: ArithmeticOp, arg_type: AttrType, arity: Arity) -> Self {
        Self {
            identifier: format!("{}{}", FUNCTION_NS_1, name),
            op,
            arg_type,
            arity,
        }
    }

    fn evaluate_integer(&self, values: &[AttributeValue]) -> EvaluationResult {
        let args: Vec<i64> = values.iter().filter_map(|v| v.as_i64()).collect();
        if args.len() != values.len() {
            return EvaluationResult::processing_error("unexpected argument type");
        }
        let out = match self.op {
            ArithmeticOp::Add => args
                .iter()
                .try_fold(0i64, |acc, n| acc.checked_add(*n)),
            ArithmeticOp::Multiply => args
                .iter()
                .try_fold(1i64, |acc, n| acc.checked_mul(*n)),
            ArithmeticOp::Subtract => args[0].checked_sub(args[1]),
            ArithmeticOp::Divide => {
                if args[1] == 0 {
                    return EvaluationResult::processing_error("divide by zero");
                }
                args[0].checked_div(args[1])
            }
            ArithmeticOp::Mod => {
                if args[1] == 0 {
                    return EvaluationResult::processing_error("divide by zero");
                }
                args[0].checked_rem(args[1])
            }
            ArithmeticOp::Abs => args[0].checked_abs(),
            ArithmeticOp::Round | ArithmeticOp::Floor => None,
        };
        match out {
            Some(n) => EvaluationResult::Value(AttributeValue::Integer(n)),
            None => EvaluationResult::processing_error("integer overflow"),
        }
    }

    fn evaluate_double(&self, values: &[AttributeValue]) -> EvaluationResult {
        let args: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
        if args.len() != values.len() {
            return EvaluationResult::processing_error("unexpected argument type");
        }
        // Double arithmetic follows IEEE-754: division by zero yields an
        // infinity, not an error.
        let out = match self.op {
            ArithmeticOp::Add => args.iter().sum(),
            ArithmeticOp::Multiply => args.iter().product(),
            ArithmeticOp::Subtract => args[0] - args[1],
            ArithmeticOp::Divide => args[0] / args[1],
            ArithmeticOp::Abs => args[0].abs(),
            // Half-up rounding, matching Java's Math.round.
            ArithmeticOp::Round => (args[0] + 0.5).floor(),
            ArithmeticOp::Floor => args[0].floor(),
            ArithmeticOp::Mod => {
                return EvaluationResult::processing_error("mod is not defined for double")
            }
        };
        EvaluationResult::Value(AttributeValue::Double(out))
    }
}

impl Function for ArithmeticFunction {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn return_type(&self) -> AttrType {
        self.arg_type
    }

    fn returns_bag(&self) -> bool {
        false
    }

    fn signature(&self) -> FunctionSignature {
        FunctionSignature::Uniform {
            arg_type: self.arg_type,
            is_bag: false,
            arity: self.arity,
        }
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(args.len());
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        match self.arg_type {
            AttrType::Integer => self.evaluate_integer(&values),
            _ => self.evaluate_double(&values),
        }
    }
}

/// All standard arithmetic functions.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    use ArithmeticOp::*;
    let two = Arity::Exact(2);
    let variadic = Arity::AtLeast(2);
    let one = Arity::Exact(1);
    let integer = AttrType::Integer;
    let double = AttrType::Double;

    vec![
        Arc::new(ArithmeticFunction::new("integer-add", Add, integer, variadic)),
        Arc::new(ArithmeticFunction::new("double-add", Add, double, variadic)),
        Arc::new(ArithmeticFunction::new("integer-subtract", Subtract, integer, two)),
        Arc::new(ArithmeticFunction::new("double-subtract", Subtract, double, two)),
        Arc::new(ArithmeticFunction::new("integer-multiply", Multiply, integer, variadic)),
        Arc::new(ArithmeticFunction::new("double-multiply", Multiply, double, variadic)),
        Arc::new(ArithmeticFunction::new("integer-divide", Divide, integer, two)),
        Arc::new(ArithmeticFunction::new("double-divide", Divide, double, two)),
        Arc::new(ArithmeticFunction::new("integer-mod", Mod, integer, two)),
        Arc::new(ArithmeticFunction::new("integer-abs", Abs, integer, one)),
        Arc::new(ArithmeticFunction::new("double-abs", Abs, double, one)),
        Arc::new(ArithmeticFunction::new("round", Round, double, one)),
        Arc::new(ArithmeticFunction::new("floor", Floor, double, one)),
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

    fn int(n: i64) -> Expression {
        Expression::Literal(AttributeValue::Integer(n))
    }

    fn dbl(d: f64) -> Expression {
        Expression::Literal(AttributeValue::Double(d))
    }

    #[test]
    fn test_integer_add_variadic() {
        let f = get("integer-add");
        let ctx = BasicEvaluationCtx::new();
        assert_eq!(
            f.evaluate(&[int(2), int(3), int(5)], &ctx),
            EvaluationResult::Value(AttributeValue::Integer(10))
        );
    }

    #[test]
    fn test_integer_divide_by_zero() {
        let f = get("integer-divide");
        let ctx = BasicEvaluationCtx::new();
        let result = f.evaluate(&[int(7), int(0)], &ctx);
        let status = result.status().expect("should be indeterminate");
        assert_eq!(status.message, "divide by zero");
    }

    #[test]
    fn test_integer_mod_by_zero() {
        let f = get("integer-mod");
        let ctx = BasicEvaluationCtx::new();
        assert!(f.evaluate(&[int(7), int(0)], &ctx).is_indeterminate());
        assert_eq!(
            f.evaluate(&[int(7), int(3)], &ctx),
            EvaluationResult::Value(AttributeValue::Integer(1))
        );
    }

    #[test]
    fn test_double_divide_by_zero_is_infinity() {
        let f = get("double-divide");
        let ctx = BasicEvaluationCtx::new();
        assert_eq!(
            f.evaluate(&[dbl(1.0), dbl(0.0)], &ctx),
            EvaluationResult::Value(AttributeValue::Double(f64::INFINITY))
        );
    }

    #[test]
    fn test_round_half_up() {
        let f = get("round");
        let ctx = BasicEvaluationCtx::new();
        assert_eq!(
            f.evaluate(&[dbl(2.5)], &ctx),
            EvaluationResult::Value(AttributeValue::Double(3.0))
        );
        // Half-up, not half-away-from-zero.
        assert_eq!(
            f.evaluate(&[dbl(-2.5)], &ctx),
            EvaluationResult::Value(AttributeValue::Double(-2.0))
        );
    }

    #[test]
    fn test_abs_and_floor() {
        let ctx = BasicEvaluationCtx::new();
        assert_eq!(
            get("integer-abs").evaluate(&[int(-4)], &ctx),
            EvaluationResult::Value(AttributeValue::Integer(4))
        );
        assert_eq!(
            get("floor").evaluate(&[dbl(2.9)], &ctx),
            EvaluationResult::Value(AttributeValue::Double(2.0))
        );
    }

    #[test]
    fn test_integer_overflow_is_processing_error() {
        let f = get("integer-add");
        let ctx = BasicEvaluationCtx::new();
        assert!(f
            .evaluate(&[int(i64::MAX), int(1)], &ctx)
            .is_indeterminate());
    }

    #[test]
    fn test_indeterminate_child_propagates_unchanged() {
        let ctx = BasicEvaluationCtx::new();
        let failing = crate::test_support::CountingExpression::indeterminate("lookup failed");
        let untouched = crate::test_support::CountingExpression::boolean(true);
        let f = get("integer-add");
        let result = f.evaluate(
            &[int(1), failing.expression(), untouched.expression()],
            &ctx,
        );
        // The child's own status comes back, and later children never ran.
        assert_eq!(result, EvaluationResult::processing_error("lookup failed"));
        assert_eq!(untouched.count(), 0);
    }

    #[test]
    fn test_signature_rejects_double_for_integer_function() {
        let f = get("integer-add");
        assert!(f.check_inputs(&[int(1), dbl(2.0)]).is_err());
    }
}
