//! Evaluation context: the request-side attribute source.
//!
//! The core never inspects a request directly. It threads an opaque
//! [`EvaluationCtx`] through every `evaluate` call and asks it to resolve
//! designators and selectors into bags. [`BasicEvaluationCtx`] is a simple
//! map-backed implementation, sufficient for embedding and for tests.

use std::collections::HashMap;

use crate::attr::Bag;
use crate::expression::{AttributeCategory, AttributeDesignator, AttributeSelector};
use crate::result::EvaluationResult;

/// The capability an evaluation needs from the hosting request context.
///
/// Resolution failure is reported in-band: implementations return an
/// `Indeterminate` result (usually with a missing-attribute status) rather
/// than an error. An attribute that is simply absent resolves to an empty
/// bag; the designator's MustBePresent flag decides whether that is fatal.
pub trait EvaluationCtx {
    /// Resolves an attribute designator into a bag of values.
    fn resolve_designator(&self, designator: &AttributeDesignator) -> EvaluationResult;

    /// Resolves a request-content selector into a bag of values.
    fn resolve_selector(&self, selector: &AttributeSelector) -> EvaluationResult;
}

/// A map-backed evaluation context.
#[derive(Debug, Default)]
pub struct BasicEvaluationCtx {
    attributes: HashMap<(AttributeCategory, String), Bag>,
    content: HashMap<String, Bag>,
}

impl BasicEvaluationCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bag of values for an attribute identifier.
    pub fn with_attribute(
        mut self,
        category: AttributeCategory,
        attribute_id: impl Into<String>,
        bag: Bag,
    ) -> Self {
        self.attributes
            .insert((category, attribute_id.into()), bag);
        self
    }

    /// Registers a bag of values for a content path.
    pub fn with_content(mut self, path: impl Into<String>, bag: Bag) -> Self {
        self.content.insert(path.into(), bag);
        self
    }
}

impl EvaluationCtx for BasicEvaluationCtx {
    fn resolve_designator(&self, designator: &AttributeDesignator) -> EvaluationResult {
        let key = (designator.category, designator.attribute_id.clone());
        match self.attributes.get(&key) {
            Some(bag) if bag.element_type() == designator.attr_type => {
                EvaluationResult::bag(bag.clone())
            }
            // Wrong-typed or absent attributes resolve to an empty bag.
            _ => EvaluationResult::bag(Bag::empty(designator.attr_type)),
        }
    }

    fn resolve_selector(&self, selector: &AttributeSelector) -> EvaluationResult {
        match self.content.get(&selector.context_path) {
            Some(bag) if bag.element_type() == selector.attr_type => {
                EvaluationResult::bag(bag.clone())
            }
            _ => EvaluationResult::bag(Bag::empty(selector.attr_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttrType, AttributeValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absent_attribute_resolves_to_empty_bag() {
        let ctx = BasicEvaluationCtx::new();
        let d = AttributeDesignator::new(
            AttributeCategory::Resource,
            AttrType::String,
            "urn:example:missing",
        );
        match ctx.resolve_designator(&d) {
            EvaluationResult::Value(AttributeValue::Bag(bag)) => {
                assert!(bag.is_empty());
                assert_eq!(bag.element_type(), AttrType::String);
            }
            other => panic!("expected empty bag, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_typed_attribute_resolves_to_empty_bag() {
        let ctx = BasicEvaluationCtx::new().with_attribute(
            AttributeCategory::Resource,
            "urn:example:id",
            Bag::new(AttrType::Integer, vec![AttributeValue::Integer(1)]).unwrap(),
        );
        let d = AttributeDesignator::new(
            AttributeCategory::Resource,
            AttrType::String,
            "urn:example:id",
        );
        match ctx.resolve_designator(&d) {
            EvaluationResult::Value(AttributeValue::Bag(bag)) => assert!(bag.is_empty()),
            other => panic!("expected empty bag, got {:?}", other),
        }
    }
}
