//! String normalization functions.

use std::sync::Arc;

use crate::attr::{AttrType, AttributeValue};
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{eval_args, Arity, Function, FunctionSignature, FUNCTION_NS_1};
use crate::result::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NormalizeOp {
    Space,
    LowerCase,
}

/// `string-normalize-space` and `string-normalize-to-lower-case`.
#[derive(Debug)]
pub struct NormalizeFunction {
    identifier: String,
    op: NormalizeOp,
}

impl NormalizeFunction {
    fn new(name: &str, op: NormalizeOp) -> Self {
        Self {
            identifier: format!("{}{}", FUNCTION_NS_1, name),
            op,
        }
    }
}

// The XML whitespace set, not Unicode whitespace.
fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

impl Function for NormalizeFunction {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn return_type(&self) -> AttrType {
        AttrType::String
    }

    fn returns_bag(&self) -> bool {
        false
    }

    fn signature(&self) -> FunctionSignature {
        FunctionSignature::Uniform {
            arg_type: AttrType::String,
            is_bag: false,
            arity: Arity::Exact(1),
        }
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(1);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        let s = match values[0].as_str() {
            Some(s) => s,
            None => return EvaluationResult::processing_error("unexpected argument type"),
        };
        let out = match self.op {
            NormalizeOp::Space => s
                .trim_matches(is_xml_space)
                .to_string(),
            NormalizeOp::LowerCase => s.to_lowercase(),
        };
        EvaluationResult::Value(AttributeValue::String(out))
    }
}

/// Both normalization functions.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(NormalizeFunction::new(
            "string-normalize-space",
            NormalizeOp::Space,
        )),
        Arc::new(NormalizeFunction::new(
            "string-normalize-to-lower-case",
            NormalizeOp::LowerCase,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BasicEvaluationCtx;
    use pretty_assertions::assert_eq;

    fn get(name: &str) -> Arc<dyn Function> {
        cluster()
            .into_iter()
            .find(|f| f.identifier() == format!("{}{}", FUNCTION_NS_1, name))
            .unwrap()
    }

    fn string(s: &str) -> Expression {
        Expression::Literal(AttributeValue::String(s.to_string()))
    }

    #[test]
    fn test_normalize_space_trims_xml_whitespace() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("string-normalize-space");
        assert_eq!(
            f.evaluate(&[string("\t\n  hello world \r")], &ctx),
            EvaluationResult::Value(AttributeValue::String("hello world".to_string()))
        );
    }

    #[test]
    fn test_normalize_space_keeps_interior_whitespace() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("string-normalize-space");
        assert_eq!(
            f.evaluate(&[string("a  b")], &ctx),
            EvaluationResult::Value(AttributeValue::String("a  b".to_string()))
        );
    }

    #[test]
    fn test_normalize_to_lower_case() {
        let ctx = BasicEvaluationCtx::new();
        let f = get("string-normalize-to-lower-case");
        assert_eq!(
            f.evaluate(&[string("HeLLo")], &ctx),
            EvaluationResult::Value(AttributeValue::String("hello".to_string()))
        );
    }
}
