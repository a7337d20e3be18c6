//! Higher-order bag functions: the `*-of-*` quantifier family and `map`.
//!
//! These take a boolean sub-function as their first child and re-apply it
//! across bag elements, which is why functions receive unevaluated children:
//! the quantifiers need to invoke the sub-function once per element (or per
//! pair), short-circuiting on the first determining outcome.
//!
//! `map` is the one abstract function in the standard set: its return type
//! is the sub-function's return type, so a concrete instance can only be
//! created once the arguments are known. [`MapFunctionProxy`] does that.

use std::sync::Arc;

use crate::apply::Apply;
use crate::attr::{AttrType, AttributeValue, Bag};
use crate::context::EvaluationCtx;
use crate::error::{PolicyError, Result};
use crate::expression::Expression;
use crate::factory::FunctionProxy;
use crate::functions::{
    Arity, Function, FunctionSignature, Parameter, FUNCTION_NS_1,
};
use crate::result::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuantifierOp {
    AnyOf,
    AllOf,
    AnyOfAny,
    AllOfAny,
    AnyOfAll,
    AllOfAll,
}

impl QuantifierOp {
    fn name(&self) -> &'static str {
        match self {
            QuantifierOp::AnyOf => "any-of",
            QuantifierOp::AllOf => "all-of",
            QuantifierOp::AnyOfAny => "any-of-any",
            QuantifierOp::AllOfAny => "all-of-any",
            QuantifierOp::AnyOfAll => "any-of-all",
            QuantifierOp::AllOfAll => "all-of-all",
        }
    }

    /// Whether the second child is a scalar (true for the two-operand
    /// `any-of`/`all-of`) or a bag like the third.
    fn first_operand_is_scalar(&self) -> bool {
        matches!(self, QuantifierOp::AnyOf | QuantifierOp::AllOf)
    }
}

/// A typed stand-in used to validate a sub-function against the element
/// types it will be called with.
#[derive(Debug)]
struct TypedPlaceholder {
    attr_type: AttrType,
}

impl Function for TypedPlaceholder {
    fn identifier(&self) -> &str {
        "urn:example:function:placeholder"
    }

    fn return_type(&self) -> AttrType {
        self.attr_type
    }

    fn returns_bag(&self) -> bool {
        false
    }

    fn signature(&self) -> FunctionSignature {
        FunctionSignature::Uniform {
            arg_type: self.attr_type,
            is_bag: false,
            arity: Arity::Exact(0),
        }
    }

    fn evaluate(&self, _args: &[Expression], _ctx: &dyn EvaluationCtx) -> EvaluationResult {
        EvaluationResult::processing_error("placeholder cannot be evaluated")
    }
}

fn placeholder(attr_type: AttrType) -> Result<Expression> {
    Ok(Expression::Apply(Apply::new(
        Arc::new(TypedPlaceholder { attr_type }),
        Vec::new(),
    )?))
}

/// The sub-function child: a bare function, or a variable reference whose
/// definition resolves to one.
fn sub_function(owner: &str, arg: &Expression) -> Result<Arc<dyn Function>> {
    match arg {
        Expression::Function(f) => return Ok(f.clone()),
        Expression::VariableReference(reference) => {
            let mut seen = vec![reference.variable_id().to_string()];
            let mut definition = reference.definition()?;
            loop {
                let next = match definition.expression() {
                    Expression::Function(f) => return Ok(f.clone()),
                    Expression::VariableReference(inner) => {
                        if seen.iter().any(|id| id == inner.variable_id()) {
                            return Err(PolicyError::CircularVariable(
                                inner.variable_id().to_string(),
                            ));
                        }
                        seen.push(inner.variable_id().to_string());
                        inner.definition()?
                    }
                    _ => break,
                };
                definition = next;
            }
        }
        _ => {}
    }
    Err(PolicyError::TypeMismatch {
        function: owner.to_string(),
        position: 0,
        expected: "a function".to_string(),
        actual: arg.attr_type()?.identifier().to_string(),
    })
}

fn apply_pair(
    f: &Arc<dyn Function>,
    a: &AttributeValue,
    b: &AttributeValue,
    ctx: &dyn EvaluationCtx,
) -> EvaluationResult {
    f.evaluate(
        &[
            Expression::Literal(a.clone()),
            Expression::Literal(b.clone()),
        ],
        ctx,
    )
}

/// Existential (`any = true`) or universal quantification with fail-fast
/// indeterminate propagation.
fn quantify<'a, I, P>(items: I, any: bool, mut pred: P) -> EvaluationResult
where
    I: IntoIterator<Item = &'a AttributeValue>,
    P: FnMut(&AttributeValue) -> EvaluationResult,
{
    for v in items {
        match pred(v) {
            EvaluationResult::Value(AttributeValue::Boolean(b)) => {
                if b == any {
                    return EvaluationResult::of_bool(any);
                }
            }
            EvaluationResult::Value(_) => {
                return EvaluationResult::processing_error(
                    "sub-function returned a non-boolean",
                )
            }
            indeterminate => return indeterminate,
        }
    }
    EvaluationResult::of_bool(!any)
}

/// One of the six boolean quantifier functions.
#[derive(Debug)]
pub struct HigherOrderFunction {
    identifier: String,
    op: QuantifierOp,
}

impl HigherOrderFunction {
    fn new(op: QuantifierOp) -> Self {
        Self {
            identifier: format!("{}{}", FUNCTION_NS_1, op.name()),
            op,
        }
    }
}

impl Function for HigherOrderFunction {
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
        // Nominal shape; the sub-function child defies signature checking,
        // so check_inputs is overridden.
        FunctionSignature::Positional(vec![
            Parameter::scalar(AttrType::Boolean),
            Parameter::scalar(AttrType::Boolean),
            Parameter::bag(AttrType::Boolean),
        ])
    }

    fn check_inputs(&self, args: &[Expression]) -> Result<()> {
        if args.len() != 3 {
            return Err(PolicyError::InvalidArity {
                function: self.identifier.clone(),
                expected: Arity::Exact(3).to_string(),
                actual: args.len(),
            });
        }
        let f = sub_function(&self.identifier, &args[0])?;
        if f.return_type() != AttrType::Boolean || f.returns_bag() {
            return Err(PolicyError::InvalidCondition(format!(
                "'{}' requires a boolean sub-function, got '{}'",
                self.identifier,
                f.identifier()
            )));
        }
        let first_bag = args[1].returns_bag()?;
        if first_bag == self.op.first_operand_is_scalar() {
            return Err(PolicyError::BagMismatch {
                function: self.identifier.clone(),
                position: 1,
                message: if first_bag {
                    "expected a scalar, got a bag".to_string()
                } else {
                    "expected a bag, got a scalar".to_string()
                },
            });
        }
        if !args[2].returns_bag()? {
            return Err(PolicyError::BagMismatch {
                function: self.identifier.clone(),
                position: 2,
                message: "expected a bag, got a scalar".to_string(),
            });
        }
        // The sub-function sees one scalar element from each side.
        f.check_inputs_no_bag(&[
            placeholder(args[1].attr_type()?)?,
            placeholder(args[2].attr_type()?)?,
        ])
    }

    fn check_inputs_no_bag(&self, args: &[Expression]) -> Result<()> {
        // Two of the children are bags by definition.
        let _ = args;
        Err(PolicyError::BagMismatch {
            function: self.identifier.clone(),
            position: 2,
            message: "bags are not allowed here".to_string(),
        })
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        if args.len() != 3 {
            return EvaluationResult::processing_error(format!(
                "'{}' expects 3 arguments, got {}",
                self.identifier,
                args.len()
            ));
        }
        let f = match sub_function(&self.identifier, &args[0]) {
            Ok(f) => f,
            Err(e) => return EvaluationResult::processing_error(e.to_string()),
        };
        // The simple forms quantify over the one bag with a fixed left side.
        if self.op.first_operand_is_scalar() {
            let a = match args[1].evaluate(ctx) {
                EvaluationResult::Value(v) => v,
                indeterminate => return indeterminate,
            };
            let bag = match args[2].evaluate(ctx) {
                EvaluationResult::Value(AttributeValue::Bag(bag)) => bag,
                EvaluationResult::Value(_) => {
                    return EvaluationResult::processing_error("unexpected argument type")
                }
                indeterminate => return indeterminate,
            };
            let any = self.op == QuantifierOp::AnyOf;
            return quantify(bag.iter(), any, |b| apply_pair(&f, &a, b, ctx));
        }

        let first = match args[1].evaluate(ctx) {
            EvaluationResult::Value(AttributeValue::Bag(bag)) => bag,
            EvaluationResult::Value(_) => {
                return EvaluationResult::processing_error("unexpected argument type")
            }
            indeterminate => return indeterminate,
        };
        let second = match args[2].evaluate(ctx) {
            EvaluationResult::Value(AttributeValue::Bag(bag)) => bag,
            EvaluationResult::Value(_) => {
                return EvaluationResult::processing_error("unexpected argument type")
            }
            indeterminate => return indeterminate,
        };
        match self.op {
            QuantifierOp::AnyOfAny => quantify(first.iter(), true, |a| {
                quantify(second.iter(), true, |b| apply_pair(&f, a, b, ctx))
            }),
            QuantifierOp::AllOfAny => quantify(first.iter(), false, |a| {
                quantify(second.iter(), true, |b| apply_pair(&f, a, b, ctx))
            }),
            // Every element of the second bag must match some element of
            // the first; note the reversed iteration, not reversed
            // sub-function arguments.
            QuantifierOp::AnyOfAll => quantify(second.iter(), false, |b| {
                quantify(first.iter(), true, |a| apply_pair(&f, a, b, ctx))
            }),
            QuantifierOp::AllOfAll => quantify(first.iter(), false, |a| {
                quantify(second.iter(), false, |b| apply_pair(&f, a, b, ctx))
            }),
            QuantifierOp::AnyOf | QuantifierOp::AllOf => unreachable!(),
        }
    }
}

/// A concrete `map` instance, pinned to its sub-function's return type.
#[derive(Debug)]
pub struct MapFunction {
    identifier: String,
    return_type: AttrType,
}

impl Function for MapFunction {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn return_type(&self) -> AttrType {
        self.return_type
    }

    fn returns_bag(&self) -> bool {
        true
    }

    fn signature(&self) -> FunctionSignature {
        FunctionSignature::Positional(vec![
            Parameter::scalar(self.return_type),
            Parameter::bag(self.return_type),
        ])
    }

    fn check_inputs(&self, args: &[Expression]) -> Result<()> {
        if args.len() != 2 {
            return Err(PolicyError::InvalidArity {
                function: self.identifier.clone(),
                expected: Arity::Exact(2).to_string(),
                actual: args.len(),
            });
        }
        let f = sub_function(&self.identifier, &args[0])?;
        if f.returns_bag() {
            return Err(PolicyError::InvalidCondition(format!(
                "'{}' requires a scalar-returning sub-function, got '{}'",
                self.identifier,
                f.identifier()
            )));
        }
        if f.return_type() != self.return_type {
            return Err(PolicyError::InvalidCondition(format!(
                "'{}' instance expects a sub-function returning {}, got '{}'",
                self.identifier,
                self.return_type.identifier(),
                f.identifier()
            )));
        }
        if !args[1].returns_bag()? {
            return Err(PolicyError::BagMismatch {
                function: self.identifier.clone(),
                position: 1,
                message: "expected a bag, got a scalar".to_string(),
            });
        }
        f.check_inputs_no_bag(&[placeholder(args[1].attr_type()?)?])
    }

    fn check_inputs_no_bag(&self, args: &[Expression]) -> Result<()> {
        let _ = args;
        Err(PolicyError::BagMismatch {
            function: self.identifier.clone(),
            position: 1,
            message: "bags are not allowed here".to_string(),
        })
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        if args.len() != 2 {
            return EvaluationResult::processing_error(format!(
                "'{}' expects 2 arguments, got {}",
                self.identifier,
                args.len()
            ));
        }
        let f = match sub_function(&self.identifier, &args[0]) {
            Ok(f) => f,
            Err(e) => return EvaluationResult::processing_error(e.to_string()),
        };
        let bag = match args[1].evaluate(ctx) {
            EvaluationResult::Value(AttributeValue::Bag(bag)) => bag,
            EvaluationResult::Value(_) => {
                return EvaluationResult::processing_error("unexpected argument type")
            }
            indeterminate => return indeterminate,
        };
        let mut out = Vec::with_capacity(bag.size());
        for v in bag.iter() {
            match f.evaluate(&[Expression::Literal(v.clone())], ctx) {
                EvaluationResult::Value(mapped) => out.push(mapped),
                indeterminate => return indeterminate,
            }
        }
        match Bag::new(self.return_type, out) {
            Ok(bag) => EvaluationResult::bag(bag),
            Err(e) => EvaluationResult::processing_error(e.to_string()),
        }
    }
}

/// The proxy that mints concrete [`MapFunction`] instances once the
/// sub-function, and with it the return type, is known.
#[derive(Debug)]
pub struct MapFunctionProxy {
    identifier: String,
}

impl MapFunctionProxy {
    pub fn new() -> Self {
        Self {
            identifier: format!("{}map", FUNCTION_NS_1),
        }
    }
}

impl Default for MapFunctionProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionProxy for MapFunctionProxy {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn instance_for(&self, args: &[Expression]) -> Result<Arc<dyn Function>> {
        let first = args.first().ok_or_else(|| PolicyError::InvalidArity {
            function: self.identifier.clone(),
            expected: Arity::Exact(2).to_string(),
            actual: 0,
        })?;
        let f = sub_function(&self.identifier, first)?;
        Ok(Arc::new(MapFunction {
            identifier: self.identifier.clone(),
            return_type: f.return_type(),
        }))
    }
}

/// The six concrete quantifier functions. `map` is not here: it is
/// abstract and registered through its proxy.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(HigherOrderFunction::new(QuantifierOp::AnyOf)),
        Arc::new(HigherOrderFunction::new(QuantifierOp::AllOf)),
        Arc::new(HigherOrderFunction::new(QuantifierOp::AnyOfAny)),
        Arc::new(HigherOrderFunction::new(QuantifierOp::AllOfAny)),
        Arc::new(HigherOrderFunction::new(QuantifierOp::AnyOfAll)),
        Arc::new(HigherOrderFunction::new(QuantifierOp::AllOfAll)),
    ]
}

/// The abstract functions of this family.
pub fn proxy_cluster() -> Vec<Arc<dyn FunctionProxy>> {
    vec![Arc::new(MapFunctionProxy::new())]
}
