//! XACML Expression Evaluation Core
//!
//! The expression, condition, and function machinery of an attribute-based
//! access control engine: typed attribute values and bags, a validated
//! expression tree, the standard function library behind the three nested
//! factories, lazily resolved variable definitions, and XML encoding of
//! every node.
//!
//! Construction and evaluation keep separate error channels. Building a
//! tree returns [`error::Result`] and rejects malformed applications up
//! front; evaluating one never fails, it produces an
//! [`result::EvaluationResult`] in which request-time trouble travels as an
//! `Indeterminate` value.

pub mod apply;
pub mod attr;
pub mod condition;
pub mod context;
pub mod encode;
pub mod error;
pub mod expression;
pub mod factory;
pub mod functions;
pub mod result;
pub mod variable;

mod lexical_regex;
#[cfg(test)]
mod test_support;

pub use apply::Apply;
pub use attr::{AttrType, AttributeValue, Bag};
pub use condition::Condition;
pub use context::{BasicEvaluationCtx, EvaluationCtx};
pub use error::{PolicyError, Result};
pub use expression::Expression;
pub use factory::{FunctionFactory, StandardFunctionFactory, Tier, TieredFactorySet};
pub use result::{EvaluationResult, Status, StatusCode};

/// Version of the evaluation core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::apply::Apply;
    pub use crate::attr::{AttrType, AttributeValue, Bag};
    pub use crate::condition::Condition;
    pub use crate::context::{BasicEvaluationCtx, EvaluationCtx};
    pub use crate::encode::XmlEncode;
    pub use crate::error::{PolicyError, Result};
    pub use crate::expression::{
        AttributeCategory, AttributeDesignator, AttributeSelector, Expression,
    };
    pub use crate::factory::{
        FunctionFactory, FunctionProxy, StandardFunctionFactory, Tier, TieredFactorySet,
    };
    pub use crate::functions::Function;
    pub use crate::result::{EvaluationResult, Status, StatusCode};
    pub use crate::variable::{VariableDefinition, VariableManager, VariableReference};
}
