//! The expression tree: polymorphic nodes over a closed set of variants.
//!
//! Every node knows its static datatype, whether it yields a bag, and its
//! child expressions. Evaluation walks the tree top-down against an opaque
//! [`EvaluationCtx`](crate::context::EvaluationCtx). A bare `Function` node
//! is an expression (it is the first argument of every higher-order
//! function) but cannot itself be evaluated to a value.

use std::sync::Arc;

use crate::apply::Apply;
use crate::attr::{AttrType, AttributeValue};
use crate::condition::Condition;
use crate::context::EvaluationCtx;
use crate::error::Result;
use crate::functions::Function;
use crate::result::{EvaluationResult, Status};
use crate::variable::VariableReference;

/// The attribute category a designator draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeCategory {
    Subject,
    Resource,
    Action,
    Environment,
}

impl AttributeCategory {
    /// The element name used in the XML form.
    pub fn element_name(&self) -> &'static str {
        match self {
            AttributeCategory::Subject => "SubjectAttributeDesignator",
            AttributeCategory::Resource => "ResourceAttributeDesignator",
            AttributeCategory::Action => "ActionAttributeDesignator",
            AttributeCategory::Environment => "EnvironmentAttributeDesignator",
        }
    }
}

/// A request-attribute lookup by category, identifier, and datatype.
///
/// The core never resolves these itself; it hands them to the evaluation
/// context and interprets the returned bag.
#[derive(Debug, Clone)]
pub struct AttributeDesignator {
    pub category: AttributeCategory,
    pub attr_type: AttrType,
    pub attribute_id: String,
    pub issuer: Option<String>,
    pub must_be_present: bool,
}

impl AttributeDesignator {
    pub fn new(
        category: AttributeCategory,
        attr_type: AttrType,
        attribute_id: impl Into<String>,
    ) -> Self {
        Self {
            category,
            attr_type,
            attribute_id: attribute_id.into(),
            issuer: None,
            must_be_present: false,
        }
    }

    pub fn must_be_present(mut self) -> Self {
        self.must_be_present = true;
        self
    }
}

/// A request-content lookup by XPath-like path.
#[derive(Debug, Clone)]
pub struct AttributeSelector {
    pub attr_type: AttrType,
    pub context_path: String,
    pub must_be_present: bool,
}

impl AttributeSelector {
    pub fn new(attr_type: AttrType, context_path: impl Into<String>) -> Self {
        Self {
            attr_type,
            context_path: context_path.into(),
            must_be_present: false,
        }
    }
}

/// A node in the expression tree.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A literal attribute value.
    Literal(AttributeValue),
    /// A function application with validated children.
    Apply(Apply),
    /// A boolean rule root (kept distinct from `Apply`; see [`Condition`]).
    Condition(Box<Condition>),
    /// A reference to a named variable definition.
    VariableReference(VariableReference),
    /// A bare function, legal only as a higher-order function's first child.
    Function(Arc<dyn Function>),
    /// A request-attribute designator, resolved through the context.
    Designator(AttributeDesignator),
    /// A request-content selector, resolved through the context.
    Selector(AttributeSelector),
}

impl Expression {
    /// The static datatype of the value this expression produces.
    ///
    /// Fallible because a variable reference may not be resolvable yet; this
    /// is a construction-time query and shares the construction error
    /// channel.
    pub fn attr_type(&self) -> Result<AttrType> {
        match self {
            Expression::Literal(v) => Ok(v.attr_type()),
            Expression::Apply(a) => Ok(a.function().return_type()),
            Expression::Condition(_) => Ok(AttrType::Boolean),
            Expression::VariableReference(r) => r.attr_type(),
            Expression::Function(f) => Ok(f.return_type()),
            Expression::Designator(d) => Ok(d.attr_type),
            Expression::Selector(s) => Ok(s.attr_type),
        }
    }

    /// Whether this expression produces a bag.
    pub fn returns_bag(&self) -> Result<bool> {
        match self {
            Expression::Literal(v) => Ok(v.is_bag()),
            Expression::Apply(a) => Ok(a.function().returns_bag()),
            Expression::Condition(_) => Ok(false),
            Expression::VariableReference(r) => r.returns_bag(),
            Expression::Function(f) => Ok(f.returns_bag()),
            // Designators and selectors always produce bags.
            Expression::Designator(_) | Expression::Selector(_) => Ok(true),
        }
    }

    /// Direct children. A variable reference reports none, even though its
    /// definition has children, so traversal stays finite over recursive
    /// variable graphs; tools that need the full graph follow references
    /// explicitly.
    pub fn children(&self) -> &[Expression] {
        match self {
            Expression::Apply(a) => a.children(),
            Expression::Condition(c) => std::slice::from_ref(c.root()),
            _ => &[],
        }
    }

    /// Evaluates this expression against a request context.
    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        match self {
            Expression::Literal(v) => EvaluationResult::Value(v.clone()),
            Expression::Apply(a) => a.evaluate(ctx),
            Expression::Condition(c) => c.evaluate(ctx),
            Expression::VariableReference(r) => r.evaluate(ctx),
            Expression::Function(f) => EvaluationResult::processing_error(format!(
                "function '{}' used where a value is required",
                f.identifier()
            )),
            Expression::Designator(d) => {
                let result = ctx.resolve_designator(d);
                enforce_presence(result, d.must_be_present, &d.attribute_id)
            }
            Expression::Selector(s) => {
                let result = ctx.resolve_selector(s);
                enforce_presence(result, s.must_be_present, &s.context_path)
            }
        }
    }
}

/// An empty resolved bag is fine unless the lookup is marked MustBePresent.
fn enforce_presence(
    result: EvaluationResult,
    must_be_present: bool,
    what: &str,
) -> EvaluationResult {
    match &result {
        EvaluationResult::Value(AttributeValue::Bag(bag))
            if bag.is_empty() && must_be_present =>
        {
            EvaluationResult::Indeterminate(Status::missing_attribute(format!(
                "required attribute '{}' is missing",
                what
            )))
        }
        _ => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Bag;
    use crate::context::BasicEvaluationCtx;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_literal_evaluation() {
        let expr = Expression::Literal(AttributeValue::Integer(42));
        let ctx = BasicEvaluationCtx::new();
        assert_eq!(
            expr.evaluate(&ctx),
            EvaluationResult::Value(AttributeValue::Integer(42))
        );
        assert_eq!(expr.attr_type().unwrap(), AttrType::Integer);
        assert!(!expr.returns_bag().unwrap());
        assert!(expr.children().is_empty());
    }

    #[test]
    fn test_designator_resolves_through_context() {
        let designator = AttributeDesignator::new(
            AttributeCategory::Subject,
            AttrType::String,
            "urn:example:group",
        );
        let ctx = BasicEvaluationCtx::new().with_attribute(
            AttributeCategory::Subject,
            "urn:example:group",
            Bag::new(
                AttrType::String,
                vec![AttributeValue::String("admins".to_string())],
            )
            .unwrap(),
        );
        let expr = Expression::Designator(designator);
        assert!(expr.returns_bag().unwrap());
        match expr.evaluate(&ctx) {
            EvaluationResult::Value(AttributeValue::Bag(bag)) => {
                assert_eq!(bag.size(), 1);
            }
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_attribute_is_indeterminate() {
        let designator = AttributeDesignator::new(
            AttributeCategory::Subject,
            AttrType::String,
            "urn:example:absent",
        )
        .must_be_present();
        let ctx = BasicEvaluationCtx::new();
        let result = Expression::Designator(designator).evaluate(&ctx);
        let status = result.status().expect("should be indeterminate");
        assert_eq!(status.code, crate::result::StatusCode::MissingAttribute);
    }
}
