//! Date and dateTime arithmetic with durations.
//!
//! Calendar arithmetic is delegated to `chrono`: day-time durations become
//! exact timeline offsets, year-month durations shift calendar months with
//! day-of-month clamping. Out-of-range results are processing errors.

use std::sync::Arc;

use chrono::Months;

use crate::attr::{AttrType, AttributeValue, DayTimeDuration, YearMonthDuration};
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{
    eval_args, Function, FunctionSignature, Parameter, FUNCTION_NS_1,
};
use crate::result::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateMathOp {
    Add,
    Subtract,
}

/// One of the six duration-arithmetic functions, named by its operand pair.
#[derive(Debug)]
pub struct DateMathFunction {
    identifier: String,
    op: DateMathOp,
    value_type: AttrType,
    duration_type: AttrType,
}

impl DateMathFunction {
    fn new(op: DateMathOp, value_type: AttrType, duration_type: AttrType) -> Self {
        let verb = match op {
            DateMathOp::Add => "add",
            DateMathOp::Subtract => "subtract",
        };
        Self {
            identifier: format!(
                "{}{}-{}-{}",
                FUNCTION_NS_1,
                value_type.function_prefix(),
                verb,
                duration_type.function_prefix()
            ),
            op,
            value_type,
            duration_type,
        }
    }

    /// Duration sign folded together with the operator sign.
    fn effective_months(&self, d: &YearMonthDuration) -> Option<(bool, Months)> {
        let mut months = d.signed_months();
        if self.op == DateMathOp::Subtract {
            months = -months;
        }
        let magnitude: u32 = months.unsigned_abs().try_into().ok()?;
        Some((months < 0, Months::new(magnitude)))
    }

    fn apply_day_time(
        &self,
        value: &AttributeValue,
        d: &DayTimeDuration,
    ) -> Option<AttributeValue> {
        let mut offset = d.to_chrono()?;
        if self.op == DateMathOp::Subtract {
            offset = -offset;
        }
        match value {
            AttributeValue::DateTime(dt) => {
                dt.checked_add_signed(offset).map(AttributeValue::DateTime)
            }
            _ => None,
        }
    }

    fn apply_year_month(
        &self,
        value: &AttributeValue,
        d: &YearMonthDuration,
    ) -> Option<AttributeValue> {
        let (negative, months) = self.effective_months(d)?;
        match value {
            AttributeValue::DateTime(dt) => if negative {
                dt.checked_sub_months(months)
            } else {
                dt.checked_add_months(months)
            }
            .map(AttributeValue::DateTime),
            AttributeValue::Date(date) => if negative {
                date.checked_sub_months(months)
            } else {
                date.checked_add_months(months)
            }
            .map(AttributeValue::Date),
            _ => None,
        }
    }
}

impl Function for DateMathFunction {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn return_type(&self) -> AttrType {
        self.value_type
    }

    fn returns_bag(&self) -> bool {
        false
    }

    fn signature(&self) -> FunctionSignature {
        FunctionSignature::Positional(vec![
            Parameter::scalar(self.value_type),
            Parameter::scalar(self.duration_type),
        ])
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(2);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        let out = match &values[1] {
            AttributeValue::DayTimeDuration(d) => self.apply_day_time(&values[0], d),
            AttributeValue::YearMonthDuration(d) => self.apply_year_month(&values[0], d),
            _ => None,
        };
        match out {
            Some(v) => EvaluationResult::Value(v),
            None => EvaluationResult::processing_error("date arithmetic out of range"),
        }
    }
}

/// All six duration-arithmetic functions.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    use DateMathOp::*;
    vec![
        Arc::new(DateMathFunction::new(
            Add,
            AttrType::DateTime,
            AttrType::DayTimeDuration,
        )),
        Arc::new(DateMathFunction::new(
            Subtract,
            AttrType::DateTime,
            AttrType::DayTimeDuration,
        )),
        Arc::new(DateMathFunction::new(
            Add,
            AttrType::DateTime,
            AttrType::YearMonthDuration,
        )),
        Arc::new(DateMathFunction::new(
            Subtract,
            AttrType::DateTime,
            AttrType::YearMonthDuration,
        )),
        Arc::new(DateMathFunction::new(
            Add,
            AttrType::Date,
            AttrType::YearMonthDuration,
        )),
        Arc::new(DateMathFunction::new(
            Subtract,
            AttrType::Date,
            AttrType::YearMonthDuration,
        )),
    ]
}
