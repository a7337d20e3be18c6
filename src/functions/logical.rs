//! Logical functions: `or`, `and`, `not`, and `n-of`.
//!
//! `or` and `and` evaluate children left-to-right and stop at the first
//! determining child; an indeterminate child short-circuits exactly like a
//! determining one and becomes the whole expression's result.

use std::sync::Arc;

use crate::attr::{AttrType, AttributeValue};
use crate::context::EvaluationCtx;
use crate::error::{PolicyError, Result};
use crate::expression::Expression;
use crate::functions::{eval_args, Arity, Function, FunctionSignature, FUNCTION_NS_1};
use crate::result::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogicalOp {
    Or,
    And,
}

/// Short-circuiting `or` / `and`.
#[derive(Debug)]
pub struct LogicalFunction {
    identifier: String,
    op: LogicalOp,
}

impl LogicalFunction {
    fn new(op: LogicalOp) -> Self {
        let name = match op {
            LogicalOp::Or => "or",
            LogicalOp::And => "and",
        };
        Self {
            identifier: format!("{}{}", FUNCTION_NS_1, name),
            op,
        }
    }
}

impl Function for LogicalFunction {
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
            arg_type: AttrType::Boolean,
            is_bag: false,
            arity: Arity::AtLeast(0),
        }
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let determining = self.op == LogicalOp::Or;
        for arg in args {
            match arg.evaluate(ctx) {
                EvaluationResult::Value(AttributeValue::Boolean(b)) => {
                    if b == determining {
                        return EvaluationResult::of_bool(determining);
                    }
                }
                EvaluationResult::Value(_) => {
                    return EvaluationResult::processing_error("unexpected argument type")
                }
                indeterminate => return indeterminate,
            }
        }
        // Running off the end: or is false, and is true.
        EvaluationResult::of_bool(!determining)
    }
}

/// Boolean negation.
#[derive(Debug)]
pub struct NotFunction {
    identifier: String,
}

impl NotFunction {
    fn new() -> Self {
        Self {
            identifier: format!("{}not", FUNCTION_NS_1),
        }
    }
}

impl Function for NotFunction {
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
            arg_type: AttrType::Boolean,
            is_bag: false,
            arity: Arity::Exact(1),
        }
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(1);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        match values.first().and_then(|v| v.as_bool()) {
            Some(b) => EvaluationResult::of_bool(!b),
            None => EvaluationResult::processing_error("unexpected argument type"),
        }
    }
}

/// Threshold function: true once `n` of the boolean arguments are true.
///
/// The first argument is the integer threshold; the signature is bespoke,
/// so `check_inputs` is overridden rather than expressed as a shape.
#[derive(Debug)]
pub struct NOfFunction {
    identifier: String,
}

impl NOfFunction {
    fn new() -> Self {
        Self {
            identifier: format!("{}n-of", FUNCTION_NS_1),
        }
    }
}

impl Function for NOfFunction {
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
        // Nominal shape only; the real validation lives in check_inputs.
        FunctionSignature::Uniform {
            arg_type: AttrType::Boolean,
            is_bag: false,
            arity: Arity::AtLeast(1),
        }
    }

    fn check_inputs(&self, args: &[Expression]) -> Result<()> {
        if args.is_empty() {
            return Err(PolicyError::InvalidArity {
                function: self.identifier.clone(),
                expected: Arity::AtLeast(1).to_string(),
                actual: 0,
            });
        }
        for (i, arg) in args.iter().enumerate() {
            let expected = if i == 0 {
                AttrType::Integer
            } else {
                AttrType::Boolean
            };
            let actual = arg.attr_type()?;
            if actual != expected {
                return Err(PolicyError::TypeMismatch {
                    function: self.identifier.clone(),
                    position: i,
                    expected: expected.identifier().to_string(),
                    actual: actual.identifier().to_string(),
                });
            }
            if arg.returns_bag()? {
                return Err(PolicyError::BagMismatch {
                    function: self.identifier.clone(),
                    position: i,
                    message: "expected a scalar, got a bag".to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_inputs_no_bag(&self, args: &[Expression]) -> Result<()> {
        self.check_inputs(args)
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let threshold = match args.first() {
            Some(arg) => arg,
            None => {
                return EvaluationResult::processing_error(
                    "n-of requires a threshold argument",
                )
            }
        };
        let mut n = match threshold.evaluate(ctx) {
            EvaluationResult::Value(AttributeValue::Integer(n)) => n,
            EvaluationResult::Value(_) => {
                return EvaluationResult::processing_error("unexpected argument type")
            }
            indeterminate => return indeterminate,
        };
        if n < 0 {
            return EvaluationResult::processing_error("n-of threshold must be non-negative");
        }
        // A zero threshold is met without evaluating anything else.
        if n == 0 {
            return EvaluationResult::TRUE;
        }
        let mut remaining = (args.len() - 1) as i64;
        if n > remaining {
            return EvaluationResult::processing_error(
                "n-of cannot possibly reach its threshold",
            );
        }
        for arg in &args[1..] {
            match arg.evaluate(ctx) {
                EvaluationResult::Value(AttributeValue::Boolean(true)) => {
                    n -= 1;
                    if n == 0 {
                        return EvaluationResult::TRUE;
                    }
                }
                EvaluationResult::Value(AttributeValue::Boolean(false)) => {}
                EvaluationResult::Value(_) => {
                    return EvaluationResult::processing_error("unexpected argument type")
                }
                indeterminate => return indeterminate,
            }
            remaining -= 1;
            // Stop as soon as the threshold is out of reach.
            if n > remaining {
                return EvaluationResult::FALSE;
            }
        }
        EvaluationResult::FALSE
    }
}

/// The logical function cluster.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(LogicalFunction::new(LogicalOp::Or)),
        Arc::new(LogicalFunction::new(LogicalOp::And)),
        Arc::new(NotFunction::new()),
        Arc::new(NOfFunction::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BasicEvaluationCtx;
    use crate::test_support::CountingExpression;
    use pretty_assertions::assert_eq;

    fn get(name: &str) -> Arc<dyn Function> {
        cluster()
            .into_iter()
            .find(|f| f.identifier() == format!("{}{}", FUNCTION_NS_1, name))
            .unwrap()
    }

    fn boolean(b: bool) -> Expression {
        Expression::Literal(AttributeValue::Boolean(b))
    }

    fn int(n: i64) -> Expression {
        Expression::Literal(AttributeValue::Integer(n))
    }

    #[test]
    fn test_or_short_circuits() {
        let ctx = BasicEvaluationCtx::new();
        let witness = CountingExpression::boolean(true);
        let args = [boolean(false), witness.expression(), witness.expression()];
        assert_eq!(get("or").evaluate(&args, &ctx), EvaluationResult::TRUE);
        // The child after the determining one was never evaluated.
        assert_eq!(witness.count(), 1);
    }

    #[test]
    fn test_and_short_circuits_on_false() {
        let ctx = BasicEvaluationCtx::new();
        let witness = CountingExpression::boolean(true);
        let args = [boolean(false), witness.expression()];
        assert_eq!(get("and").evaluate(&args, &ctx), EvaluationResult::FALSE);
        assert_eq!(witness.count(), 0);
    }

    #[test]
    fn test_empty_or_and() {
        let ctx = BasicEvaluationCtx::new();
        assert_eq!(get("or").evaluate(&[], &ctx), EvaluationResult::FALSE);
        assert_eq!(get("and").evaluate(&[], &ctx), EvaluationResult::TRUE);
    }

    #[test]
    fn test_indeterminate_short_circuits_like_a_value() {
        let ctx = BasicEvaluationCtx::new();
        let failing = CountingExpression::indeterminate("attribute unavailable");
        let witness = CountingExpression::boolean(true);
        let args = [boolean(false), failing.expression(), witness.expression()];
        let result = get("or").evaluate(&args, &ctx);
        assert_eq!(
            result.status().unwrap().message,
            "attribute unavailable"
        );
        assert_eq!(witness.count(), 0);
    }

    #[test]
    fn test_not() {
        let ctx = BasicEvaluationCtx::new();
        assert_eq!(
            get("not").evaluate(&[boolean(false)], &ctx),
            EvaluationResult::TRUE
        );
    }

    #[test]
    fn test_n_of_reaches_threshold() {
        let ctx = BasicEvaluationCtx::new();
        let args = [int(2), boolean(true), boolean(false), boolean(true)];
        assert_eq!(get("n-of").evaluate(&args, &ctx), EvaluationResult::TRUE);
    }

    #[test]
    fn test_n_of_threshold_out_of_reach_mid_stream() {
        let ctx = BasicEvaluationCtx::new();
        let witness = CountingExpression::boolean(true);
        let args = [int(3), boolean(true), boolean(false), witness.expression()];
        assert_eq!(get("n-of").evaluate(&args, &ctx), EvaluationResult::FALSE);
        // After the false, only one argument remained for a threshold of 2.
        assert_eq!(witness.count(), 0);
    }

    #[test]
    fn test_n_of_zero_threshold_evaluates_nothing() {
        let ctx = BasicEvaluationCtx::new();
        let witness = CountingExpression::boolean(true);
        let args = [int(0), witness.expression()];
        assert_eq!(get("n-of").evaluate(&args, &ctx), EvaluationResult::TRUE);
        assert_eq!(witness.count(), 0);
    }

    #[test]
    fn test_n_of_impossible_threshold_is_processing_error() {
        let ctx = BasicEvaluationCtx::new();
        let args = [int(3), boolean(true)];
        assert!(get("n-of").evaluate(&args, &ctx).is_indeterminate());
    }

    #[test]
    fn test_empty_argument_list_is_a_processing_error() {
        let ctx = BasicEvaluationCtx::new();
        assert!(get("not").evaluate(&[], &ctx).is_indeterminate());
        assert!(get("n-of").evaluate(&[], &ctx).is_indeterminate());
    }

    #[test]
    fn test_n_of_signature() {
        let f = get("n-of");
        assert!(f.check_inputs(&[int(1), boolean(true)]).is_ok());
        assert!(f.check_inputs(&[boolean(true), boolean(true)]).is_err());
        assert!(f.check_inputs(&[]).is_err());
    }
}
