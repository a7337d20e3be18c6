//! Test-only helpers shared across function modules.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::apply::Apply;
use crate::attr::AttrType;
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{Arity, Function, FunctionSignature};
use crate::result::{EvaluationResult, Status};

/// A zero-argument witness that counts how many times it was evaluated.
///
/// Wraps a fixed result behind an `Apply` node, so tests can assert on
/// short-circuit behavior: which children were reached and which were not.
pub struct CountingExpression {
    witness: Arc<WitnessFunction>,
}

impl CountingExpression {
    pub fn boolean(value: bool) -> Self {
        Self {
            witness: Arc::new(WitnessFunction {
                result: EvaluationResult::of_bool(value),
                count: AtomicUsize::new(0),
            }),
        }
    }

    pub fn indeterminate(message: &str) -> Self {
        Self {
            witness: Arc::new(WitnessFunction {
                result: EvaluationResult::Indeterminate(Status::processing_error(message)),
                count: AtomicUsize::new(0),
            }),
        }
    }

    /// An expression that shares this witness; every clone counts into the
    /// same counter.
    pub fn expression(&self) -> Expression {
        Expression::Apply(
            Apply::new(self.witness.clone() as Arc<dyn Function>, Vec::new()).unwrap(),
        )
    }

    pub fn count(&self) -> usize {
        self.witness.count.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct WitnessFunction {
    result: EvaluationResult,
    count: AtomicUsize,
}

impl Function for WitnessFunction {
    fn identifier(&self) -> &str {
        "urn:example:function:witness"
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
            arity: Arity::Exact(0),
        }
    }

    fn evaluate(&self, _args: &[Expression], _ctx: &dyn EvaluationCtx) -> EvaluationResult {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
