//! The `Apply` composite node: a function plus validated children.

use std::sync::Arc;

use crate::context::EvaluationCtx;
use crate::error::Result;
use crate::expression::Expression;
use crate::functions::Function;
use crate::result::EvaluationResult;

/// A function application.
///
/// Construction runs `check_inputs` once; child-count, type, and bag/scalar
/// mismatches are rejected before any evaluation can occur, and the children
/// list is immutable afterwards. Evaluation forwards the unevaluated
/// children to the function, which evaluates them in the order and
/// multiplicity it requires.
#[derive(Debug, Clone)]
pub struct Apply {
    function: Arc<dyn Function>,
    children: Vec<Expression>,
}

impl Apply {
    /// Builds an application, validating the children against the
    /// function's signature.
    pub fn new(function: Arc<dyn Function>, children: Vec<Expression>) -> Result<Self> {
        function.check_inputs(&children)?;
        Ok(Self { function, children })
    }

    pub fn function(&self) -> &Arc<dyn Function> {
        &self.function
    }

    pub fn children(&self) -> &[Expression] {
        &self.children
    }

    /// Delegates to the function.
    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        self.function.evaluate(&self.children, ctx)
    }
}
