//! Function factories and the three-tier standard registry.
//!
//! A factory maps identifiers to functions, keeping concrete functions and
//! abstract ones (proxies that mint an instance per call site) in separate
//! namespaces with symmetric lookup errors. The three standard tiers nest:
//! everything usable in a Target is usable in a Condition, and everything
//! usable in a Condition is usable anywhere.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use tracing::debug;

use crate::error::{PolicyError, Result};
use crate::expression::Expression;
use crate::functions::{
    arithmetic, bag_fns, comparison, convert, date_math, equal, higher_order, logical,
    matching, normalize, set_fns, time_range, uri_cat, Function,
};

/// An abstract function: a factory-resident recipe that produces a concrete
/// [`Function`] once the call-site arguments are known.
pub trait FunctionProxy: Send + Sync + fmt::Debug {
    /// The full namespaced identifier.
    fn identifier(&self) -> &str;

    /// Mints the concrete instance for one call site.
    fn instance_for(&self, args: &[Expression]) -> Result<Arc<dyn Function>>;
}

/// A registry of concrete and abstract functions.
#[derive(Debug, Default, Clone)]
pub struct FunctionFactory {
    functions: HashMap<String, Arc<dyn Function>>,
    abstracts: HashMap<String, Arc<dyn FunctionProxy>>,
}

impl FunctionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn contains(&self, identifier: &str) -> bool {
        self.functions.contains_key(identifier) || self.abstracts.contains_key(identifier)
    }

    /// Registers a concrete function, rejecting identifier collisions in
    /// either namespace.
    pub fn register(&mut self, function: Arc<dyn Function>) -> Result<()> {
        let id = function.identifier().to_string();
        if self.contains(&id) {
            return Err(PolicyError::DuplicateFunction(id));
        }
        self.functions.insert(id, function);
        Ok(())
    }

    /// Registers an abstract function.
    pub fn register_abstract(&mut self, proxy: Arc<dyn FunctionProxy>) -> Result<()> {
        let id = proxy.identifier().to_string();
        if self.contains(&id) {
            return Err(PolicyError::DuplicateFunction(id));
        }
        self.abstracts.insert(id, proxy);
        Ok(())
    }

    /// Looks up a concrete function. Naming an abstract function here is a
    /// distinct error from naming nothing at all.
    pub fn create_function(&self, identifier: &str) -> Result<Arc<dyn Function>> {
        if let Some(f) = self.functions.get(identifier) {
            return Ok(f.clone());
        }
        if self.abstracts.contains_key(identifier) {
            return Err(PolicyError::AbstractFunction(identifier.to_string()));
        }
        Err(PolicyError::UnknownFunction(identifier.to_string()))
    }

    /// Looks up an abstract function, with the symmetric error split.
    pub fn create_abstract_function(
        &self,
        identifier: &str,
    ) -> Result<Arc<dyn FunctionProxy>> {
        if let Some(p) = self.abstracts.get(identifier) {
            return Ok(p.clone());
        }
        if self.functions.contains_key(identifier) {
            return Err(PolicyError::ConcreteFunction(identifier.to_string()));
        }
        Err(PolicyError::UnknownFunction(identifier.to_string()))
    }

    pub fn supports(&self, identifier: &str) -> bool {
        self.functions.contains_key(identifier)
    }

    pub fn supports_abstract(&self, identifier: &str) -> bool {
        self.abstracts.contains_key(identifier)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// All registered concrete identifiers, unordered.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    // Standard-set registration: identifiers are known disjoint, so this
    // skips the collision check that `register` performs for callers.
    fn insert(&mut self, function: Arc<dyn Function>) {
        let id = function.identifier().to_string();
        debug_assert!(!self.functions.contains_key(&id), "duplicate {}", id);
        self.functions.insert(id, function);
    }

    fn insert_abstract(&mut self, proxy: Arc<dyn FunctionProxy>) {
        self.abstracts
            .insert(proxy.identifier().to_string(), proxy);
    }
}

/// The narrowest tier a function belongs to. Tiers nest upward: a Target
/// function is also a Condition and General function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Target,
    Condition,
    General,
}

/// Three factories kept in strict inclusion Target ⊆ Condition ⊆ General.
/// Registering a function at a tier also registers it into every enclosing
/// tier, so the inclusion invariant survives user extension.
#[derive(Debug, Default, Clone)]
pub struct TieredFactorySet {
    target: FunctionFactory,
    condition: FunctionFactory,
    general: FunctionFactory,
}

impl TieredFactorySet {
    /// Three empty factories.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mutable copy of the standard tiers, for building extended sets.
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    pub fn target(&self) -> &FunctionFactory {
        &self.target
    }

    pub fn condition(&self) -> &FunctionFactory {
        &self.condition
    }

    pub fn general(&self) -> &FunctionFactory {
        &self.general
    }

    // Every registration lands in `general`, so it alone decides whether an
    // identifier is taken anywhere in the set.
    fn collides(&self, identifier: &str) -> bool {
        self.general.contains(identifier)
    }

    /// Registers a concrete function at `tier` and every tier above it.
    pub fn register(&mut self, tier: Tier, function: Arc<dyn Function>) -> Result<()> {
        if self.collides(function.identifier()) {
            return Err(PolicyError::DuplicateFunction(
                function.identifier().to_string(),
            ));
        }
        if tier == Tier::Target {
            self.target.insert(function.clone());
        }
        if tier != Tier::General {
            self.condition.insert(function.clone());
        }
        self.general.insert(function);
        Ok(())
    }

    /// Registers an abstract function at `tier` and every tier above it.
    pub fn register_abstract(&mut self, tier: Tier, proxy: Arc<dyn FunctionProxy>) -> Result<()> {
        if self.collides(proxy.identifier()) {
            return Err(PolicyError::DuplicateFunction(
                proxy.identifier().to_string(),
            ));
        }
        if tier == Tier::Target {
            self.target.insert_abstract(proxy.clone());
        }
        if tier != Tier::General {
            self.condition.insert_abstract(proxy.clone());
        }
        self.general.insert_abstract(proxy);
        Ok(())
    }

    // Standard-set registration; identifiers are known disjoint.
    fn insert_cluster(&mut self, tier: Tier, functions: Vec<Arc<dyn Function>>) {
        for f in functions {
            if tier == Tier::Target {
                self.target.insert(f.clone());
            }
            if tier != Tier::General {
                self.condition.insert(f.clone());
            }
            self.general.insert(f);
        }
    }
}

fn build_standard() -> TieredFactorySet {
    let mut set = TieredFactorySet::new();

    let mut add = |tier: Tier, functions: Vec<Arc<dyn Function>>| {
        set.insert_cluster(tier, functions);
    };

    // Target tier: scalar predicates and the plumbing around them.
    add(Tier::Target, equal::cluster());
    add(Tier::Target, logical::cluster());
    add(Tier::Target, comparison::cluster());
    add(Tier::Target, arithmetic::cluster());
    add(Tier::Target, convert::cluster());
    add(Tier::Target, normalize::cluster());
    add(Tier::Target, matching::cluster());

    // Condition tier adds the bag-consuming predicates.
    let (condition_bag, general_bag): (Vec<_>, Vec<_>) =
        bag_fns::cluster().into_iter().partition(|f| {
            f.identifier().ends_with("-one-and-only")
                || f.identifier().ends_with("-bag-size")
        });
    add(Tier::Condition, condition_bag);
    let (condition_set, general_set): (Vec<_>, Vec<_>) = set_fns::cluster()
        .into_iter()
        .partition(|f| f.identifier().ends_with("-at-least-one-member-of"));
    add(Tier::Condition, condition_set);
    add(Tier::Condition, higher_order::cluster());
    add(Tier::Condition, time_range::cluster());

    // General tier: bag producers and everything else.
    add(Tier::General, general_bag);
    add(Tier::General, general_set);
    add(Tier::General, date_math::cluster());
    add(Tier::General, uri_cat::cluster());

    for proxy in higher_order::proxy_cluster() {
        set.general.insert_abstract(proxy);
    }

    debug!(
        target = set.target.function_count(),
        condition = set.condition.function_count(),
        general = set.general.function_count(),
        "built standard function factories"
    );
    set
}

lazy_static! {
    static ref STANDARD: TieredFactorySet = build_standard();
}

/// Accessors for the three shared standard factories.
///
/// These are immutable; extension starts from
/// [`TieredFactorySet::standard`] or a fresh [`FunctionFactory`].
pub struct StandardFunctionFactory;

impl StandardFunctionFactory {
    /// Functions allowed in a Target.
    pub fn target() -> &'static FunctionFactory {
        &STANDARD.target
    }

    /// Functions allowed in a Condition: the Target set plus bag
    /// predicates, the quantifier family, and `time-in-range`.
    pub fn condition() -> &'static FunctionFactory {
        &STANDARD.condition
    }

    /// The full standard set.
    pub fn general() -> &'static FunctionFactory {
        &STANDARD.general
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttrType, AttributeValue};
    use crate::functions::{Arity, FunctionSignature, FUNCTION_NS_1};
    use crate::result::EvaluationResult;

    const STRING_EQUAL: &str = "urn:oasis:names:tc:xacml:1.0:function:string-equal";
    const MAP: &str = "urn:oasis:names:tc:xacml:1.0:function:map";

    #[test]
    fn test_tiers_nest() {
        let target = StandardFunctionFactory::target();
        let condition = StandardFunctionFactory::condition();
        let general = StandardFunctionFactory::general();
        for id in target.identifiers() {
            assert!(condition.supports(id), "condition is missing {}", id);
        }
        for id in condition.identifiers() {
            assert!(general.supports(id), "general is missing {}", id);
        }
        assert!(target.function_count() < condition.function_count());
        assert!(condition.function_count() < general.function_count());
    }

    #[test]
    fn test_tier_contents() {
        let target = StandardFunctionFactory::target();
        let condition = StandardFunctionFactory::condition();
        let general = StandardFunctionFactory::general();

        let one_and_only = format!("{}integer-one-and-only", FUNCTION_NS_1);
        assert!(!target.supports(&one_and_only));
        assert!(condition.supports(&one_and_only));

        let any_of = format!("{}any-of", FUNCTION_NS_1);
        assert!(!target.supports(&any_of));
        assert!(condition.supports(&any_of));

        let is_in = format!("{}integer-is-in", FUNCTION_NS_1);
        assert!(!condition.supports(&is_in));
        assert!(general.supports(&is_in));

        let at_least_one = format!("{}string-at-least-one-member-of", FUNCTION_NS_1);
        assert!(condition.supports(&at_least_one));
        let intersection = format!("{}string-intersection", FUNCTION_NS_1);
        assert!(!condition.supports(&intersection));
        assert!(general.supports(&intersection));
    }

    #[test]
    fn test_abstract_and_concrete_lookups_are_disjoint() {
        let general = StandardFunctionFactory::general();
        assert!(matches!(
            general.create_function(MAP),
            Err(PolicyError::AbstractFunction(_))
        ));
        assert!(general.create_abstract_function(MAP).is_ok());
        assert!(matches!(
            general.create_abstract_function(STRING_EQUAL),
            Err(PolicyError::ConcreteFunction(_))
        ));
        assert!(matches!(
            general.create_function("urn:example:function:nope"),
            Err(PolicyError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_map_is_general_only() {
        assert!(!StandardFunctionFactory::condition().supports_abstract(MAP));
        assert!(StandardFunctionFactory::general().supports_abstract(MAP));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        #[derive(Debug)]
        struct Custom;
        impl Function for Custom {
            fn identifier(&self) -> &str {
                "urn:example:function:custom"
            }
            fn return_type(&self) -> AttrType {
                AttrType::Boolean
            }
            fn returns_bag(&self) -> bool {
                false
            }
            fn signature(&self) -> FunctionSignature {
                FunctionSignature::Uniform {
                    arg_type: AttrType::Boolean,
                    is_bag: false,
                    arity: Arity::Exact(0),
                }
            }
            fn evaluate(
                &self,
                _args: &[Expression],
                _ctx: &dyn crate::context::EvaluationCtx,
            ) -> EvaluationResult {
                EvaluationResult::TRUE
            }
        }

        let mut factory = FunctionFactory::new();
        factory.register(Arc::new(Custom)).unwrap();
        assert!(matches!(
            factory.register(Arc::new(Custom)),
            Err(PolicyError::DuplicateFunction(_))
        ));
        assert!(factory.supports("urn:example:function:custom"));
    }

    #[test]
    fn test_tiered_registration_reaches_every_superset() {
        #[derive(Debug)]
        struct Custom;
        impl Function for Custom {
            fn identifier(&self) -> &str {
                "urn:example:function:tiered"
            }
            fn return_type(&self) -> AttrType {
                AttrType::Boolean
            }
            fn returns_bag(&self) -> bool {
                false
            }
            fn signature(&self) -> FunctionSignature {
                FunctionSignature::Uniform {
                    arg_type: AttrType::Boolean,
                    is_bag: false,
                    arity: Arity::Exact(0),
                }
            }
            fn evaluate(
                &self,
                _args: &[Expression],
                _ctx: &dyn crate::context::EvaluationCtx,
            ) -> EvaluationResult {
                EvaluationResult::TRUE
            }
        }

        let mut set = TieredFactorySet::standard();
        set.register(Tier::Condition, Arc::new(Custom)).unwrap();
        assert!(!set.target().supports("urn:example:function:tiered"));
        assert!(set.condition().supports("urn:example:function:tiered"));
        assert!(set.general().supports("urn:example:function:tiered"));

        // The identifier is now taken everywhere in the set, even at a
        // tier that does not hold it directly.
        assert!(matches!(
            set.register(Tier::Target, Arc::new(Custom)),
            Err(PolicyError::DuplicateFunction(_))
        ));
        // A standard identifier collides too.
        assert!(matches!(
            set.register(
                Tier::General,
                StandardFunctionFactory::general()
                    .create_function(STRING_EQUAL)
                    .unwrap()
            ),
            Err(PolicyError::DuplicateFunction(_))
        ));
        // The shared standard set is untouched.
        assert!(!StandardFunctionFactory::general().supports("urn:example:function:tiered"));
    }

    #[test]
    fn test_created_function_evaluates() {
        let ctx = crate::context::BasicEvaluationCtx::new();
        let f = StandardFunctionFactory::target()
            .create_function(STRING_EQUAL)
            .unwrap();
        let args = [
            Expression::Literal(AttributeValue::String("a".to_string())),
            Expression::Literal(AttributeValue::String("a".to_string())),
        ];
        assert_eq!(f.evaluate(&args, &ctx), EvaluationResult::TRUE);
    }
}
