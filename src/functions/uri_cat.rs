//! URI/string concatenation.

use std::sync::Arc;

use crate::attr::{validate_uri_reference, AttrType, AttributeValue};
use crate::context::EvaluationCtx;
use crate::error::{PolicyError, Result};
use crate::expression::Expression;
use crate::functions::{
    eval_args, Arity, Function, FunctionSignature, FUNCTION_NS_2,
};
use crate::result::EvaluationResult;

/// `uri-string-concatenate`: an anyURI followed by one or more strings,
/// producing an anyURI. The concatenation is over lexical forms; a result
/// that is not a valid URI reference is a processing error.
#[derive(Debug)]
pub struct UriStringConcatenateFunction {
    identifier: String,
}

impl UriStringConcatenateFunction {
    pub fn new() -> Self {
        Self {
            identifier: format!("{}uri-string-concatenate", FUNCTION_NS_2),
        }
    }
}

impl Default for UriStringConcatenateFunction {
    fn default() -> Self {
        Self::new()
    }
}

impl Function for UriStringConcatenateFunction {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn return_type(&self) -> AttrType {
        AttrType::AnyUri
    }

    fn returns_bag(&self) -> bool {
        false
    }

    fn signature(&self) -> FunctionSignature {
        // Nominal shape only; the mixed variadic form is checked below.
        FunctionSignature::Uniform {
            arg_type: AttrType::String,
            is_bag: false,
            arity: Arity::AtLeast(2),
        }
    }

    fn check_inputs(&self, args: &[Expression]) -> Result<()> {
        if args.len() < 2 {
            return Err(PolicyError::InvalidArity {
                function: self.identifier.clone(),
                expected: Arity::AtLeast(2).to_string(),
                actual: args.len(),
            });
        }
        for (i, arg) in args.iter().enumerate() {
            let expected = if i == 0 {
                AttrType::AnyUri
            } else {
                AttrType::String
            };
            let actual = arg.attr_type()?;
            if actual != expected {
                return Err(PolicyError::TypeMismatch {
                    function: self.identifier.clone(),
                    position: i,
                    expected: expected.identifier().to_string(),
                    actual: actual.identifier().to_string(),
                });
            }
            if arg.returns_bag()? {
                return Err(PolicyError::BagMismatch {
                    function: self.identifier.clone(),
                    position: i,
                    message: "expected a scalar, got a bag".to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_inputs_no_bag(&self, args: &[Expression]) -> Result<()> {
        self.check_inputs(args)
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(args.len());
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        let mut out = String::new();
        for v in &values {
            out.push_str(&v.to_string());
        }
        if validate_uri_reference(&out).is_err() {
            return EvaluationResult::processing_error(format!(
                "concatenation '{}' is not a valid URI reference",
                out
            ));
        }
        EvaluationResult::Value(AttributeValue::AnyUri(out))
    }
}

/// The single concatenation function.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    vec![Arc::new(UriStringConcatenateFunction::new())]
}
