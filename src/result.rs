//! Three-valued evaluation results.
//!
//! Every evaluable node produces an [`EvaluationResult`]: a concrete value,
//! or an indeterminate outcome carrying a [`Status`]. Indeterminate is data,
//! not an error type — attribute-resolution failure and divide-by-zero are
//! normal outcomes of evaluating a request, and they propagate up the tree
//! to become part of the decision instead of crashing the evaluator.

use serde::{Deserialize, Serialize};

use crate::attr::{AttributeValue, Bag};

/// Classification of an indeterminate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusCode {
    Ok,
    MissingAttribute,
    SyntaxError,
    ProcessingError,
}

impl StatusCode {
    /// The standard XACML status URN.
    pub fn as_urn(&self) -> &'static str {
        match self {
            StatusCode::Ok => "urn:oasis:names:tc:xacml:1.0:status:ok",
            StatusCode::MissingAttribute => {
                "urn:oasis:names:tc:xacml:1.0:status:missing-attribute"
            }
            StatusCode::SyntaxError => "urn:oasis:names:tc:xacml:1.0:status:syntax-error",
            StatusCode::ProcessingError => {
                "urn:oasis:names:tc:xacml:1.0:status:processing-error"
            }
        }
    }
}

/// An indeterminate outcome: a classification code and a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn processing_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ProcessingError, message)
    }

    pub fn missing_attribute(message: impl Into<String>) -> Self {
        Self::new(StatusCode::MissingAttribute, message)
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SyntaxError, message)
    }
}

/// The result of evaluating an expression: exactly one variant populated.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    Value(AttributeValue),
    Indeterminate(Status),
}

impl EvaluationResult {
    /// Canonical boolean results. Boolean evaluation is the hot path, so
    /// the two possible outcomes are shared constants.
    pub const TRUE: EvaluationResult =
        EvaluationResult::Value(AttributeValue::Boolean(true));
    pub const FALSE: EvaluationResult =
        EvaluationResult::Value(AttributeValue::Boolean(false));

    /// The canonical result for a boolean.
    pub fn of_bool(b: bool) -> Self {
        if b { Self::TRUE } else { Self::FALSE }
    }

    pub fn value(value: AttributeValue) -> Self {
        EvaluationResult::Value(value)
    }

    pub fn bag(bag: Bag) -> Self {
        EvaluationResult::Value(AttributeValue::Bag(bag))
    }

    pub fn processing_error(message: impl Into<String>) -> Self {
        EvaluationResult::Indeterminate(Status::processing_error(message))
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, EvaluationResult::Indeterminate(_))
    }

    /// The concrete value, if any.
    pub fn as_value(&self) -> Option<&AttributeValue> {
        match self {
            EvaluationResult::Value(v) => Some(v),
            EvaluationResult::Indeterminate(_) => None,
        }
    }

    /// The status, if indeterminate.
    pub fn status(&self) -> Option<&Status> {
        match self {
            EvaluationResult::Value(_) => None,
            EvaluationResult::Indeterminate(s) => Some(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_booleans() {
        assert_eq!(EvaluationResult::of_bool(true), EvaluationResult::TRUE);
        assert_eq!(EvaluationResult::of_bool(false), EvaluationResult::FALSE);
        assert_eq!(
            EvaluationResult::TRUE.as_value(),
            Some(&AttributeValue::Boolean(true))
        );
    }

    #[test]
    fn test_indeterminate_carries_status() {
        let r = EvaluationResult::processing_error("divide by zero");
        assert!(r.is_indeterminate());
        let status = r.status().unwrap();
        assert_eq!(status.code, StatusCode::ProcessingError);
        assert_eq!(status.message, "divide by zero");
        assert_eq!(
            status.code.as_urn(),
            "urn:oasis:names:tc:xacml:1.0:status:processing-error"
        );
    }
}
