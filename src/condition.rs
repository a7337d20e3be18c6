//! The `Condition` node: the boolean root of a policy rule.

use crate::attr::AttrType;
use crate::context::EvaluationCtx;
use crate::error::{PolicyError, Result};
use crate::expression::Expression;
use crate::result::EvaluationResult;

/// A boolean, non-bag expression wrapped as a rule root.
///
/// This is a distinct type rather than a flavor of `Apply` because the two
/// policy-language generations construct it differently (a function
/// application vs. a bare boolean expression), yet both must evaluate
/// identically once built. The wrapper captures "boolean root of a rule"
/// independent of how it was authored.
#[derive(Debug, Clone)]
pub struct Condition {
    root: Expression,
}

impl Condition {
    /// Wraps a root expression, enforcing that it is boolean and not a bag.
    pub fn new(root: Expression) -> Result<Self> {
        let ty = root.attr_type()?;
        if ty != AttrType::Boolean {
            return Err(PolicyError::InvalidCondition(format!(
                "root must be boolean, got {}",
                ty.identifier()
            )));
        }
        if root.returns_bag()? {
            return Err(PolicyError::InvalidCondition(
                "root must not be a bag".to_string(),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Expression {
        &self.root
    }

    /// Delegates to the root expression.
    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        self.root.evaluate(ctx)
    }
}
