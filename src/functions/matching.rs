//! Pattern-matching functions: the regexp family plus the structured
//! name matchers for X.500 and RFC 822 names.
//!
//! Patterns arrive in XML-Schema regular-expression syntax and are
//! translated before compilation: an unanchored pattern may match anywhere
//! in the string, `\p{IsBlock}` becomes `\p{Block}`, and the XML-Schema
//! class-subtraction form `[a-z-[aeiou]]` becomes a nested-class
//! intersection. A pattern that still fails to compile is a processing
//! error at evaluation time, not a construction failure, because the
//! pattern is itself an evaluated argument.

use std::sync::Arc;

use regex::Regex;

use crate::attr::{AttrType, AttributeValue, Rfc822Name};
use crate::context::EvaluationCtx;
use crate::expression::Expression;
use crate::functions::{
    eval_args, Function, FunctionSignature, Parameter, FUNCTION_NS_1, FUNCTION_NS_2,
};
use crate::result::EvaluationResult;

/// Rewrites an XML-Schema regular expression into `regex` crate syntax.
pub fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    if !pattern.starts_with('^') {
        out.push_str(".*");
    }
    let translated = pattern
        .replace("\\p{Is", "\\p{")
        .replace("\\P{Is", "\\P{")
        .replace("-[", "&&[^");
    out.push_str(&translated);
    if !pattern.ends_with('$') {
        out.push_str(".*");
    }
    out
}

fn regexp_match(pattern: &str, value: &str) -> EvaluationResult {
    match Regex::new(&translate_pattern(pattern)) {
        Ok(re) => EvaluationResult::of_bool(re.is_match(value)),
        Err(_) => {
            EvaluationResult::processing_error(format!("invalid pattern '{}'", pattern))
        }
    }
}

/// A regexp matcher over one datatype's lexical form. The first argument is
/// always the string pattern.
#[derive(Debug)]
pub struct RegexpMatchFunction {
    identifier: String,
    value_type: AttrType,
}

impl RegexpMatchFunction {
    fn new(identifier: String, value_type: AttrType) -> Self {
        Self {
            identifier,
            value_type,
        }
    }
}

impl Function for RegexpMatchFunction {
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
        FunctionSignature::Positional(vec![
            Parameter::scalar(AttrType::String),
            Parameter::scalar(self.value_type),
        ])
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(2);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        let pattern = match values[0].as_str() {
            Some(p) => p,
            None => return EvaluationResult::processing_error("unexpected argument type"),
        };
        // Matching is over the value's lexical form.
        regexp_match(pattern, &values[1].to_string())
    }
}

/// `x500Name-match`: true when the first name is a terminal RDN sequence of
/// the second, compared canonically.
#[derive(Debug)]
pub struct X500MatchFunction {
    identifier: String,
}

impl Function for X500MatchFunction {
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
        FunctionSignature::Positional(vec![
            Parameter::scalar(AttrType::X500Name),
            Parameter::scalar(AttrType::X500Name),
        ])
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(2);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        match (&values[0], &values[1]) {
            (AttributeValue::X500Name(pattern), AttributeValue::X500Name(name)) => {
                EvaluationResult::of_bool(pattern.matches_suffix_of(name))
            }
            _ => EvaluationResult::processing_error("unexpected argument type"),
        }
    }
}

/// `rfc822Name-match`: a string pattern against a mailbox name.
///
/// Three pattern shapes: a full mailbox (`Alice@example.com`, local part
/// case-sensitive), a whole domain (`example.com`), or a domain suffix
/// (`.example.com`); the domain side is always case-insensitive.
#[derive(Debug)]
pub struct Rfc822MatchFunction {
    identifier: String,
}

impl Rfc822MatchFunction {
    fn matches(pattern: &str, name: &Rfc822Name) -> Option<bool> {
        if pattern.contains('@') {
            let wanted = Rfc822Name::parse(pattern).ok()?;
            Some(wanted == *name)
        } else if let Some(suffix) = pattern.strip_prefix('.') {
            let domain = name.domain().to_lowercase();
            Some(domain.ends_with(&format!(".{}", suffix.to_lowercase())))
        } else {
            Some(name.domain().eq_ignore_ascii_case(pattern))
        }
    }
}

impl Function for Rfc822MatchFunction {
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
        FunctionSignature::Positional(vec![
            Parameter::scalar(AttrType::String),
            Parameter::scalar(AttrType::Rfc822Name),
        ])
    }

    fn evaluate(&self, args: &[Expression], ctx: &dyn EvaluationCtx) -> EvaluationResult {
        let mut values = Vec::with_capacity(2);
        if let Some(indeterminate) = eval_args(args, ctx, &mut values) {
            return indeterminate;
        }
        let (pattern, name) = match (&values[0], &values[1]) {
            (AttributeValue::String(p), AttributeValue::Rfc822Name(n)) => (p, n),
            _ => return EvaluationResult::processing_error("unexpected argument type"),
        };
        match Rfc822MatchFunction::matches(pattern, name) {
            Some(b) => EvaluationResult::of_bool(b),
            None => EvaluationResult::processing_error(format!(
                "invalid rfc822Name pattern '{}'",
                pattern
            )),
        }
    }
}

/// All matching functions.
pub fn cluster() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(RegexpMatchFunction::new(
            format!("{}regexp-string-match", FUNCTION_NS_1),
            AttrType::String,
        )),
        // Historical alias kept under the 1.0 namespace.
        Arc::new(RegexpMatchFunction::new(
            format!("{}string-regexp-match", FUNCTION_NS_1),
            AttrType::String,
        )),
        Arc::new(RegexpMatchFunction::new(
            format!("{}anyURI-regexp-match", FUNCTION_NS_2),
            AttrType::AnyUri,
        )),
        Arc::new(RegexpMatchFunction::new(
            format!("{}rfc822Name-regexp-match", FUNCTION_NS_2),
            AttrType::Rfc822Name,
        )),
        Arc::new(RegexpMatchFunction::new(
            format!("{}x500Name-regexp-match", FUNCTION_NS_2),
            AttrType::X500Name,
        )),
        Arc::new(X500MatchFunction {
            identifier: format!("{}x500Name-match", FUNCTION_NS_1),
        }),
        Arc::new(Rfc822MatchFunction {
            identifier: format!("{}rfc822Name-match", FUNCTION_NS_1),
        }),
    ]
}
