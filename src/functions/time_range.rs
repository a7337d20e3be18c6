//! The `time-in-range` function.

use std::sync::Arc;

use crate::attr::{AttrType, AttributeValue, TimeValue};
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{eval_args, Arity, Function, FunctionSignature, FUNCTION_NS_2};
use crate::result::EvaluationResult;

const NANOS_PER_DAY: i64 = 86_400 * 1_000_000_000;

/// `time-in-range(time, lower, upper)`: inclusive on both ends, and a range
/// whose upper bound is lexically before its lower bound wraps across
/// midnight.
#[derive(Debug)]
pub struct TimeInRangeFunction {
    identifier: String,
}

impl TimeInRangeFunction {
    pub fn new() -> Self {
        Self {
            identifier: format!("{}time-in-range", FUNCTION_NS_2),
        }
    }
}

impl Default for TimeInRangeFunction {
    fn default() -> Self {
        Self::new()
    }
}

/// Instant in nanoseconds; a bound without its own offset borrows the
/// checked time's offset so the whole comparison happens in one frame.
fn instant_with_default(
    value: &TimeValue,
    default: Option<chrono::FixedOffset>,
) -> i64 {
    let offset = value.offset.or(default);
    let offset_nanos = offset
        .map(|o| o.local_minus_utc() as i64 * 1_000_000_000)
        .unwrap_or(0);
    value.nanos_of_day() - offset_nanos
}

fn wrap_day(nanos: i64) -> i64 {
    nanos.rem_euclid(NANOS_PER_DAY)
}

impl Function for TimeInRangeFunction {
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
            arg_type: AttrType::Time,
            is_bag: false,
            arity: Arity::Exact(3),
        }
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(3);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        let times: Vec<&TimeValue> = match values
            .iter()
            .map(|v| match v {
                AttributeValue::Time(t) => Some(t),
                _ => None,
            })
            .collect()
        {
            Some(ts) => ts,
            None => return EvaluationResult::processing_error("unexpected argument type"),
        };
        let default = times[0].offset;
        let middle = instant_with_default(times[0], default);
        let lower = instant_with_default(times[1], default);
        let upper = instant_with_default(times[2], default);

        // Shift the lower bound to midnight and wrap the other two into the
        // same day; a range crossing midnight then falls out naturally.
        let middle = wrap_day(middle - lower);
        let upper = wrap_day(upper - lower);
        EvaluationResult::of_bool(middle <= upper)
    }
}

/// The single time-range function.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    vec![Arc::new(TimeInRangeFunction::new())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BasicEvaluationCtx;
    use pretty_assertions::assert_eq;

    fn time(s: &str) -> Expression {
        Expression::Literal(AttributeValue::Time(TimeValue::parse(s).unwrap()))
    }

    fn check(middle: &str, lower: &str, upper: &str) -> EvaluationResult {
        let ctx = BasicEvaluationCtx::new();
        TimeInRangeFunction::new().evaluate(&[time(middle), time(lower), time(upper)], &ctx)
    }

    #[test]
    fn test_simple_range() {
        assert_eq!(
            check("10:00:00", "09:00:00", "17:00:00"),
            EvaluationResult::TRUE
        );
        assert_eq!(
            check("18:00:00", "09:00:00", "17:00:00"),
            EvaluationResult::FALSE
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert_eq!(
            check("09:00:00", "09:00:00", "17:00:00"),
            EvaluationResult::TRUE
        );
        assert_eq!(
            check("17:00:00", "09:00:00", "17:00:00"),
            EvaluationResult::TRUE
        );
    }

    #[test]
    fn test_range_wrapping_midnight() {
        assert_eq!(
            check("23:30:00", "22:00:00", "06:00:00"),
            EvaluationResult::TRUE
        );
        assert_eq!(
            check("05:00:00", "22:00:00", "06:00:00"),
            EvaluationResult::TRUE
        );
        assert_eq!(
            check("12:00:00", "22:00:00", "06:00:00"),
            EvaluationResult::FALSE
        );
    }

    #[test]
    fn test_bounds_borrow_the_checked_times_offset() {
        // 09:00 at +02:00 is 07:00Z; local bounds follow the same frame.
        assert_eq!(
            check("09:00:00+02:00", "08:00:00", "10:00:00"),
            EvaluationResult::TRUE
        );
        assert_eq!(
            check("09:00:00+02:00", "10:00:00", "11:00:00"),
            EvaluationResult::FALSE
        );
    }

    #[test]
    fn test_arity() {
        let f = TimeInRangeFunction::new();
        assert!(f
            .check_inputs(&[time("09:00:00"), time("10:00:00")])
            .is_err());
    }
}
