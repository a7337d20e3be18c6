//! Variable definitions, references, and the resolution manager.
//!
//! A reference never owns its target. It either points at a finished
//! [`VariableDefinition`] or asks a [`VariableManager`] to resolve the name
//! on demand, which is what makes forward references work: definitions can
//! be registered unparsed, in any order, and each is parsed at most once,
//! the first time something needs it.
//!
//! The manager tracks a per-name state machine (unparsed, in progress,
//! resolved). Re-entering a name that is already in progress can only mean
//! the definition depends on itself, so that is the cycle detector.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::attr::AttrType;
use crate::context::EvaluationCtx;
use crate::error::{PolicyError, Result};
use crate::expression::Expression;
use crate::factory::StandardFunctionFactory;
use crate::result::EvaluationResult;

/// A named, reusable expression.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    variable_id: String,
    expression: Expression,
}

impl VariableDefinition {
    pub fn new(variable_id: impl Into<String>, expression: Expression) -> Self {
        Self {
            variable_id: variable_id.into(),
            expression,
        }
    }

    pub fn variable_id(&self) -> &str {
        &self.variable_id
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn attr_type(&self) -> Result<AttrType> {
        self.expression.attr_type()
    }

    pub fn returns_bag(&self) -> Result<bool> {
        self.expression.returns_bag()
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        self.expression.evaluate(ctx)
    }
}

/// Where a reference finds its definition.
#[derive(Debug, Clone)]
enum VariableSource {
    /// No resolution support; every query fails.
    Unresolved,
    /// Bound directly at construction.
    Definition(Arc<VariableDefinition>),
    /// Resolved on demand. Weak, because resolved definitions may in turn
    /// contain references back through the same manager.
    Manager(Weak<VariableManager>),
}

/// A by-name reference to a variable definition.
#[derive(Debug, Clone)]
pub struct VariableReference {
    variable_id: String,
    source: VariableSource,
}

impl VariableReference {
    /// A reference with no way to resolve itself. Construction-time queries
    /// fail with `UnsupportedVariable`.
    pub fn unresolved(variable_id: impl Into<String>) -> Self {
        Self {
            variable_id: variable_id.into(),
            source: VariableSource::Unresolved,
        }
    }

    /// A reference bound directly to its definition.
    pub fn with_definition(definition: Arc<VariableDefinition>) -> Self {
        Self {
            variable_id: definition.variable_id().to_string(),
            source: VariableSource::Definition(definition),
        }
    }

    /// A reference resolved on demand through a manager.
    pub fn with_manager(
        variable_id: impl Into<String>,
        manager: &Arc<VariableManager>,
    ) -> Self {
        Self {
            variable_id: variable_id.into(),
            source: VariableSource::Manager(Arc::downgrade(manager)),
        }
    }

    pub fn variable_id(&self) -> &str {
        &self.variable_id
    }

    fn manager(&self) -> Result<Arc<VariableManager>> {
        match &self.source {
            VariableSource::Manager(weak) => weak
                .upgrade()
                .ok_or_else(|| PolicyError::UnsupportedVariable(self.variable_id.clone())),
            _ => Err(PolicyError::UnsupportedVariable(self.variable_id.clone())),
        }
    }

    pub fn attr_type(&self) -> Result<AttrType> {
        match &self.source {
            VariableSource::Definition(d) => d.attr_type(),
            VariableSource::Manager(_) => {
                Ok(self.manager()?.variable_type(&self.variable_id)?.0)
            }
            VariableSource::Unresolved => {
                Err(PolicyError::UnsupportedVariable(self.variable_id.clone()))
            }
        }
    }

    pub fn returns_bag(&self) -> Result<bool> {
        match &self.source {
            VariableSource::Definition(d) => d.returns_bag(),
            VariableSource::Manager(_) => {
                Ok(self.manager()?.variable_type(&self.variable_id)?.1)
            }
            VariableSource::Unresolved => {
                Err(PolicyError::UnsupportedVariable(self.variable_id.clone()))
            }
        }
    }

    /// The definition behind this reference, resolving through the manager
    /// when the reference is not bound directly.
    pub fn definition(&self) -> Result<Arc<VariableDefinition>> {
        match &self.source {
            VariableSource::Definition(d) => Ok(d.clone()),
            VariableSource::Manager(_) => self.manager()?.definition(&self.variable_id),
            VariableSource::Unresolved => {
                Err(PolicyError::UnsupportedVariable(self.variable_id.clone()))
            }
        }
    }

    /// Resolves the definition and evaluates it. Resolution failure is an
    /// evaluation-time outcome here, not a construction error, because a
    /// reference may be evaluated before anything forced resolution.
    pub fn evaluate(&self, ctx: &dyn EvaluationCtx) -> EvaluationResult {
        match self.definition() {
            Ok(definition) => definition.evaluate(ctx),
            Err(e) => EvaluationResult::processing_error(e.to_string()),
        }
    }
}

/// A registered-but-unparsed variable definition.
///
/// `function_id` is an optional hint: when the definition body is a function
/// application, naming the function lets the manager answer type queries
/// without parsing the body at all.
pub struct UnparsedVariable {
    function_id: Option<String>,
    parse: ParseFn,
}

type ParseFn = Box<dyn Fn(&Arc<VariableManager>) -> Result<Expression> + Send + Sync>;

impl UnparsedVariable {
    pub fn new(
        function_id: Option<String>,
        parse: impl Fn(&Arc<VariableManager>) -> Result<Expression> + Send + Sync + 'static,
    ) -> Self {
        Self {
            function_id,
            parse: Box::new(parse),
        }
    }
}

impl fmt::Debug for UnparsedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnparsedVariable")
            .field("function_id", &self.function_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum VarState {
    Unparsed(UnparsedVariable),
    InProgress,
    Resolved(Arc<VariableDefinition>),
}

/// Lazily parses and caches variable definitions, detecting cycles.
///
/// Internally locked so expression trees holding references stay shareable
/// across threads; resolution itself is expected during parsing, before
/// concurrent evaluation begins. The lock is never held across a parse, so
/// recursive resolution of nested references cannot deadlock.
pub struct VariableManager {
    me: Weak<VariableManager>,
    states: Mutex<HashMap<String, VarState>>,
}

impl fmt::Debug for VariableManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableManager").finish_non_exhaustive()
    }
}

impl VariableManager {
    pub fn new(sources: HashMap<String, UnparsedVariable>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            states: Mutex::new(
                sources
                    .into_iter()
                    .map(|(id, src)| (id, VarState::Unparsed(src)))
                    .collect(),
            ),
        })
    }

    fn strong(&self) -> Result<Arc<Self>> {
        // Cannot fail while `&self` is alive; kept fallible to avoid a
        // panic path.
        self.me
            .upgrade()
            .ok_or_else(|| PolicyError::UnsupportedVariable("<dropped manager>".to_string()))
    }

    fn poisoned<T>(_: T) -> PolicyError {
        PolicyError::ValidationError("variable manager lock poisoned".to_string())
    }

    /// The resolved definition for a name, parsing it first if needed.
    pub fn definition(&self, variable_id: &str) -> Result<Arc<VariableDefinition>> {
        let unparsed = {
            let mut states = self.states.lock().map_err(Self::poisoned)?;
            match states.get_mut(variable_id) {
                None => {
                    return Err(PolicyError::UnsupportedVariable(variable_id.to_string()))
                }
                Some(VarState::Resolved(d)) => return Ok(d.clone()),
                Some(VarState::InProgress) => {
                    return Err(PolicyError::CircularVariable(variable_id.to_string()))
                }
                Some(state) => {
                    match std::mem::replace(state, VarState::InProgress) {
                        VarState::Unparsed(u) => u,
                        // Both other variants returned above.
                        _ => unreachable!(),
                    }
                }
            }
        };

        // Parse outside the lock; nested references re-enter `definition`.
        let manager = self.strong()?;
        let parsed = (unparsed.parse)(&manager);
        let mut states = self.states.lock().map_err(Self::poisoned)?;
        match parsed {
            Ok(expression) => {
                let definition =
                    Arc::new(VariableDefinition::new(variable_id, expression));
                debug!(variable_id, "resolved variable definition");
                states.insert(
                    variable_id.to_string(),
                    VarState::Resolved(definition.clone()),
                );
                Ok(definition)
            }
            Err(e) => {
                // Put the source back so a later caller sees the same
                // parse error instead of a bogus cycle.
                states.insert(variable_id.to_string(), VarState::Unparsed(unparsed));
                Err(e)
            }
        }
    }

    /// The datatype and bag-ness of a variable, resolving lazily.
    ///
    /// When the unparsed source names its outermost function, the answer
    /// comes from the function's declared return type and the body stays
    /// unparsed.
    pub fn variable_type(&self, variable_id: &str) -> Result<(AttrType, bool)> {
        {
            let states = self.states.lock().map_err(Self::poisoned)?;
            match states.get(variable_id) {
                None => {
                    return Err(PolicyError::UnsupportedVariable(variable_id.to_string()))
                }
                Some(VarState::Resolved(d)) => {
                    return Ok((d.attr_type()?, d.returns_bag()?))
                }
                Some(VarState::Unparsed(u)) => {
                    if let Some(function_id) = &u.function_id {
                        if let Ok(f) =
                            StandardFunctionFactory::general().create_function(function_id)
                        {
                            return Ok((f.return_type(), f.returns_bag()));
                        }
                    }
                }
                Some(VarState::InProgress) => {
                    return Err(PolicyError::CircularVariable(variable_id.to_string()))
                }
            }
        }
        let definition = self.definition(variable_id)?;
        Ok((definition.attr_type()?, definition.returns_bag()?))
    }
}
