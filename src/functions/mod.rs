//! The function contract and the built-in function families.
//!
//! Every function has a namespaced identifier, a parameter signature, and a
//! return type. `check_inputs` runs once, at `Apply` construction, and is
//! the system's static type-checking pass; `evaluate` runs once per request.
//! Since XACML 2.0 the `Apply` node does not pre-evaluate children on the
//! function's behalf — each function evaluates its own children in the order
//! and multiplicity it requires, which is what lets the higher-order family
//! re-apply a sub-function per bag element.

pub mod arithmetic;
pub mod bag_fns;
pub mod comparison;
pub mod convert;
pub mod date_math;
pub mod equal;
pub mod higher_order;
pub mod logical;
pub mod matching;
pub mod normalize;
pub mod set_fns;
pub mod time_range;
pub mod uri_cat;

use std::fmt;

use crate::attr::{AttrType, AttributeValue};
use crate::context::EvaluationCtx;
use crate::error::{PolicyError, Result};
use crate::expression::Expression;
use crate::result::EvaluationResult;

/// The XACML 1.0 function namespace prefix.
pub const FUNCTION_NS_1: &str = "urn:oasis:names:tc:xacml:1.0:function:";

/// The XACML 2.0 function namespace prefix.
pub const FUNCTION_NS_2: &str = "urn:oasis:names:tc:xacml:2.0:function:";

/// A named, typed, arity-checked capability applied by `Apply` nodes.
///
/// Implementations are immutable after construction and shared read-only
/// across concurrent evaluations.
pub trait Function: Send + Sync + fmt::Debug {
    /// The full namespaced identifier.
    fn identifier(&self) -> &str;

    /// The datatype of the produced value (for a bag, the element type).
    fn return_type(&self) -> AttrType;

    /// Whether the produced value is a bag.
    fn returns_bag(&self) -> bool;

    /// Validates child count, types, and bag-ness. Called once at `Apply`
    /// construction; never during evaluation.
    fn check_inputs(&self, args: &[Expression]) -> Result<()> {
        self.signature().check(self.identifier(), args)
    }

    /// Stricter variant that forbids bag arguments entirely. Used by
    /// higher-order callers that pass scalars extracted from a bag.
    fn check_inputs_no_bag(&self, args: &[Expression]) -> Result<()> {
        self.signature().check_no_bag(self.identifier(), args)
    }

    /// The declared parameter signature.
    fn signature(&self) -> FunctionSignature;

    /// Applies the function. `args` are the unevaluated child expressions.
    ///
    /// Callers are expected to have passed `args` through [`check_inputs`]
    /// first ([`Apply::new`] does); implementations may index arguments by
    /// the positions that check admitted. Argument *values* are still
    /// re-checked at evaluation time, since a child's runtime value can
    /// disagree with its declared type.
    ///
    /// [`check_inputs`]: Function::check_inputs
    /// [`Apply::new`]: crate::apply::Apply::new
    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult;
}

/// How many arguments a uniform signature accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == *k,
            Arity::AtLeast(k) => n >= *k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "exactly {}", k),
            Arity::AtLeast(k) => write!(f, "at least {}", k),
        }
    }
}

/// One positional parameter: a datatype and whether it is a bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub attr_type: AttrType,
    pub is_bag: bool,
}

impl Parameter {
    pub fn scalar(attr_type: AttrType) -> Self {
        Self {
            attr_type,
            is_bag: false,
        }
    }

    pub fn bag(attr_type: AttrType) -> Self {
        Self {
            attr_type,
            is_bag: true,
        }
    }
}

/// The two signature shapes that cover all standard functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionSignature {
    /// Every parameter shares one type and bag-flag.
    Uniform {
        arg_type: AttrType,
        is_bag: bool,
        arity: Arity,
    },
    /// Each parameter has its own type and bag-flag.
    Positional(Vec<Parameter>),
}

impl FunctionSignature {
    /// Validates length and per-position type and bag-flag.
    pub fn check(&self, function: &str, args: &[Expression]) -> Result<()> {
        match self {
            FunctionSignature::Uniform {
                arg_type,
                is_bag,
                arity,
            } => {
                if !arity.accepts(args.len()) {
                    return Err(PolicyError::InvalidArity {
                        function: function.to_string(),
                        expected: arity.to_string(),
                        actual: args.len(),
                    });
                }
                for (i, arg) in args.iter().enumerate() {
                    check_argument(function, i, arg, *arg_type, *is_bag)?;
                }
                Ok(())
            }
            FunctionSignature::Positional(params) => {
                if args.len() != params.len() {
                    return Err(PolicyError::InvalidArity {
                        function: function.to_string(),
                        expected: Arity::Exact(params.len()).to_string(),
                        actual: args.len(),
                    });
                }
                for (i, (arg, param)) in args.iter().zip(params).enumerate() {
                    check_argument(function, i, arg, param.attr_type, param.is_bag)?;
                }
                Ok(())
            }
        }
    }

    /// Like `check`, but additionally forbids any bag parameter.
    pub fn check_no_bag(&self, function: &str, args: &[Expression]) -> Result<()> {
        self.check(function, args)?;
        for (i, arg) in args.iter().enumerate() {
            if arg.returns_bag()? {
                return Err(PolicyError::BagMismatch {
                    function: function.to_string(),
                    position: i,
                    message: "bags are not allowed here".to_string(),
                });
            }
        }
        // A signature that itself declares bag parameters can never pass.
        if let FunctionSignature::Uniform { is_bag: true, .. } = self {
            return Err(PolicyError::BagMismatch {
                function: function.to_string(),
                position: 0,
                message: "bags are not allowed here".to_string(),
            });
        }
        if let FunctionSignature::Positional(params) = self {
            if let Some(i) = params.iter().position(|p| p.is_bag) {
                return Err(PolicyError::BagMismatch {
                    function: function.to_string(),
                    position: i,
                    message: "bags are not allowed here".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn check_argument(
    function: &str,
    position: usize,
    arg: &Expression,
    expected: AttrType,
    expected_bag: bool,
) -> Result<()> {
    // Bare functions are only legal under the higher-order family, which
    // validates them itself instead of going through a signature.
    if matches!(arg, Expression::Function(_)) {
        return Err(PolicyError::TypeMismatch {
            function: function.to_string(),
            position,
            expected: expected.identifier().to_string(),
            actual: "a function".to_string(),
        });
    }
    let actual = arg.attr_type()?;
    if actual != expected {
        return Err(PolicyError::TypeMismatch {
            function: function.to_string(),
            position,
            expected: expected.identifier().to_string(),
            actual: actual.identifier().to_string(),
        });
    }
    let actual_bag = arg.returns_bag()?;
    if actual_bag != expected_bag {
        return Err(PolicyError::BagMismatch {
            function: function.to_string(),
            position,
            message: if expected_bag {
                "expected a bag, got a scalar".to_string()
            } else {
                "expected a scalar, got a bag".to_string()
            },
        });
    }
    Ok(())
}

/// Evaluates all children left-to-right, failing fast: returns the first
/// indeterminate child result, or `None` with `out` fully populated.
pub(crate) fn eval_args(
    args: &[Expression],
    ctx: &dyn EvaluationCtx,
    out: &mut Vec<AttributeValue>,
) -> Option<EvaluationResult> {
    for arg in args {
        match arg.evaluate(ctx) {
            EvaluationResult::Value(v) => out.push(v),
            indeterminate => return Some(indeterminate),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Bag;

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
    fn test_uniform_signature_arity() {
        let sig = FunctionSignature::Uniform {
            arg_type: AttrType::Integer,
            is_bag: false,
            arity: Arity::AtLeast(2),
        };
        assert!(sig.check("f", &[int(1), int(2), int(3)]).is_ok());
        assert!(matches!(
            sig.check("f", &[int(1)]),
            Err(PolicyError::InvalidArity { .. })
        ));
    }

    #[test]
    fn test_uniform_signature_type_mismatch() {
        let sig = FunctionSignature::Uniform {
            arg_type: AttrType::Integer,
            is_bag: false,
            arity: Arity::Exact(1),
        };
        let arg = Expression::Literal(AttributeValue::String("x".to_string()));
        assert!(matches!(
            sig.check("f", &[arg]),
            Err(PolicyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_bag_scalar_mismatch() {
        let sig = FunctionSignature::Uniform {
            arg_type: AttrType::Integer,
            is_bag: false,
            arity: Arity::Exact(1),
        };
        assert!(matches!(
            sig.check("f", &[int_bag(&[1, 2])]),
            Err(PolicyError::BagMismatch { .. })
        ));
    }

    #[test]
    fn test_positional_signature() {
        let sig = FunctionSignature::Positional(vec![
            Parameter::scalar(AttrType::String),
            Parameter::bag(AttrType::Integer),
        ]);
        let ok = [
            Expression::Literal(AttributeValue::String("x".to_string())),
            int_bag(&[1]),
        ];
        assert!(sig.check("f", &ok).is_ok());

        let swapped = [
            int_bag(&[1]),
            Expression::Literal(AttributeValue::String("x".to_string())),
        ];
        assert!(sig.check("f", &swapped).is_err());
    }

    #[test]
    fn test_check_no_bag_rejects_bag_signature() {
        let sig = FunctionSignature::Uniform {
            arg_type: AttrType::Integer,
            is_bag: true,
            arity: Arity::Exact(1),
        };
        assert!(sig.check_no_bag("f", &[int_bag(&[1])]).is_err());
    }
}
