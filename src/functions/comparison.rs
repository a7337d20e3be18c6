//! Ordered comparison functions.
//!
//! The double comparator reproduces the XML-Schema order rather than the
//! IEEE-754 one: equal non-zero values compare equal, positive and negative
//! zero are distinguished by their lexical sign, any NaN is greater than any
//! non-NaN, and two NaNs are equal.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::attr::{AttrType, AttributeValue};
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{eval_args, Arity, Function, FunctionSignature, FUNCTION_NS_1};
use crate::result::EvaluationResult;

/// The four ordering operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl CompareOp {
    fn name_suffix(&self) -> &'static str {
        match self {
            CompareOp::GreaterThan => "greater-than",
            CompareOp::GreaterThanOrEqual => "greater-than-or-equal",
            CompareOp::LessThan => "less-than",
            CompareOp::LessThanOrEqual => "less-than-or-equal",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::GreaterThan => ordering == Ordering::Greater,
            CompareOp::GreaterThanOrEqual => ordering != Ordering::Less,
            CompareOp::LessThan => ordering == Ordering::Less,
            CompareOp::LessThanOrEqual => ordering != Ordering::Greater,
        }
    }
}

/// One ordering operator instantiated for one orderable datatype.
#[derive(Debug)]
pub struct ComparisonFunction {
    identifier: String,
    op: CompareOp,
    arg_type: AttrType,
}

impl ComparisonFunction {
    fn new(arg_type: AttrType, op: CompareOp) -> Self {
        Self {
            identifier: format!(
                "{}{}-{}",
                FUNCTION_NS_1,
                arg_type.function_prefix(),
                op.name_suffix()
            ),
            op,
            arg_type,
        }
    }

    fn compare(&self, a: &AttributeValue, b: &AttributeValue) -> Option<Ordering> {
        match (a, b) {
            (AttributeValue::Integer(x), AttributeValue::Integer(y)) => Some(x.cmp(y)),
            (AttributeValue::Double(x), AttributeValue::Double(y)) => {
                Some(double_compare(*x, *y))
            }
            (AttributeValue::String(x), AttributeValue::String(y)) => Some(x.cmp(y)),
            (AttributeValue::Date(x), AttributeValue::Date(y)) => Some(x.cmp(y)),
            (AttributeValue::Time(x), AttributeValue::Time(y)) => Some(x.compare(y)),
            (AttributeValue::DateTime(x), AttributeValue::DateTime(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }
}

impl Function for ComparisonFunction {
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
            arg_type: self.arg_type,
            is_bag: false,
            arity: Arity::Exact(2),
        }
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(2);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        match self.compare(&values[0], &values[1]) {
            Some(ordering) => EvaluationResult::of_bool(self.op.accepts(ordering)),
            None => EvaluationResult::processing_error("unexpected argument type"),
        }
    }
}

/// Compares two doubles using the XML-Schema rules.
pub fn double_compare(d1: f64, d2: f64) -> Ordering {
    if d1 == d2 {
        if d1 != 0.0 {
            return Ordering::Equal;
        }
        // Both zeros: the lexical sign decides, so -0 sorts before +0.
        return d2
            .is_sign_negative()
            .cmp(&d1.is_sign_negative());
    }
    if d1.is_nan() {
        return if d2.is_nan() {
            Ordering::Equal
        } else {
            Ordering::Greater
        };
    }
    if d2.is_nan() {
        return Ordering::Less;
    }
    // Neither NaN and not equal: the basic comparison matches XML-Schema.
    if d1 > d2 { Ordering::Greater } else { Ordering::Less }
}

/// All 24 standard comparison functions.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    let mut out: Vec<Arc<dyn Function>> = Vec::with_capacity(24);
    for ty in [
        AttrType::Integer,
        AttrType::Double,
        AttrType::String,
        AttrType::Date,
        AttrType::Time,
        AttrType::DateTime,
    ] {
        for op in [
            CompareOp::GreaterThan,
            CompareOp::GreaterThanOrEqual,
            CompareOp::LessThan,
            CompareOp::LessThanOrEqual,
        ] {
            out.push(Arc::new(ComparisonFunction::new(ty, op)));
        }
    }
    out
}
