//! The per-datatype set functions over bags: `*-intersection`, `*-union`,
//! `*-at-least-one-member-of`, `*-subset`, and `*-set-equals`.
//!
//! Bags are multisets; every function here coerces to set semantics first,
//! deduplicating by value equality. Equality is the value type's own, so
//! this stays a linear scan rather than hashing (doubles and names do not
//! hash consistently with their equality).

use std::sync::Arc;

use crate::attr::{AttrType, AttributeValue, Bag};
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{
    eval_args, Function, FunctionSignature, Parameter, FUNCTION_NS_1,
};
use crate::result::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetOp {
    Intersection,
    Union,
    AtLeastOneMemberOf,
    Subset,
    SetEquals,
}

impl SetOp {
    fn name_suffix(&self) -> &'static str {
        match self {
            SetOp::Intersection => "intersection",
            SetOp::Union => "union",
            SetOp::AtLeastOneMemberOf => "at-least-one-member-of",
            SetOp::Subset => "subset",
            SetOp::SetEquals => "set-equals",
        }
    }

    fn returns_bag(&self) -> bool {
        matches!(self, SetOp::Intersection | SetOp::Union)
    }
}

fn push_unique(out: &mut Vec<AttributeValue>, v: &AttributeValue) {
    if !out.iter().any(|existing| existing == v) {
        out.push(v.clone());
    }
}

fn is_subset(a: &Bag, b: &Bag) -> bool {
    a.iter().all(|v| b.contains(v))
}

/// One set operation instantiated for one datatype.
#[derive(Debug)]
pub struct SetFunction {
    identifier: String,
    op: SetOp,
    element_type: AttrType,
}

impl SetFunction {
    fn new(element_type: AttrType, op: SetOp) -> Self {
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

impl Function for SetFunction {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn return_type(&self) -> AttrType {
        match self.op {
            SetOp::Intersection | SetOp::Union => self.element_type,
            _ => AttrType::Boolean,
        }
    }

    fn returns_bag(&self) -> bool {
        self.op.returns_bag()
    }

    fn signature(&self) -> FunctionSignature {
        FunctionSignature::Positional(vec![
            Parameter::bag(self.element_type),
            Parameter::bag(self.element_type),
        ])
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(2);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        let (a, b) = match (values[0].as_bag(), values[1].as_bag()) {
            (Some(a), Some(b)) => (a, b),
            _ => return EvaluationResult::processing_error("unexpected argument type"),
        };
        match self.op {
            SetOp::Intersection => {
                let mut out = Vec::new();
                for v in a.iter() {
                    if b.contains(v) {
                        push_unique(&mut out, v);
                    }
                }
                match Bag::new(self.element_type, out) {
                    Ok(bag) => EvaluationResult::bag(bag),
                    Err(e) => EvaluationResult::processing_error(e.to_string()),
                }
            }
            SetOp::Union => {
                let mut out = Vec::new();
                for v in a.iter().chain(b.iter()) {
                    push_unique(&mut out, v);
                }
                match Bag::new(self.element_type, out) {
                    Ok(bag) => EvaluationResult::bag(bag),
                    Err(e) => EvaluationResult::processing_error(e.to_string()),
                }
            }
            SetOp::AtLeastOneMemberOf => {
                EvaluationResult::of_bool(a.iter().any(|v| b.contains(v)))
            }
            SetOp::Subset => EvaluationResult::of_bool(is_subset(a, b)),
            SetOp::SetEquals => {
                EvaluationResult::of_bool(is_subset(a, b) && is_subset(b, a))
            }
        }
    }
}

/// The five set functions for every supported datatype.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    let mut out: Vec<Arc<dyn Function>> = Vec::with_capacity(AttrType::ALL.len() * 5);
    for ty in AttrType::ALL {
        for op in [
            SetOp::Intersection,
            SetOp::Union,
            SetOp::AtLeastOneMemberOf,
            SetOp::Subset,
            SetOp::SetEquals,
        ] {
            out.push(Arc::new(SetFunction::new(ty, op)));
        }
    }
    out
}
