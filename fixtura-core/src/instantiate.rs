//! Instantiation strategy chain for struct nodes.
//!
//! Strategies are tried in a fixed order until one yields a value. Soft
//! failures are logged and skipped; a hard failure aborts the creation call.

use std::{collections::BTreeMap, fmt, sync::Arc};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    error::FixturaError,
    schema::{StructDef, TypeExpr},
    value::{Record, Value},
};

/// Failure reported by an [`InstantiationStrategy`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum InstantiationError {
    /// The strategy could not produce a value; the next one is tried.
    #[error("{0}")]
    Soft(Arc<str>),
    /// The creation call must abort.
    #[error("{0}")]
    Hard(Arc<str>),
}

impl InstantiationError {
    /// Creates a recoverable failure.
    pub fn soft(reason: impl Into<Arc<str>>) -> Self {
        Self::Soft(reason.into())
    }

    /// Creates a failure that aborts the creation call.
    pub fn hard(reason: impl Into<Arc<str>>) -> Self {
        Self::Hard(reason.into())
    }
}

/// Produces the initial value of a struct node before its members are
/// populated.
///
/// Returning `Ok(None)` declines and passes the node to the next strategy. A
/// returned [`Value::Struct`] has its members populated afterwards, keeping
/// any member for which population yields `Null`; any other value is used
/// as-is.
pub trait InstantiationStrategy: fmt::Debug + Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Attempts to instantiate `ty`, whose definition is `def`.
    ///
    /// # Errors
    /// Returns [`InstantiationError`] when the strategy fails.
    fn instantiate(&self, ty: &TypeExpr, def: &StructDef)
    -> Result<Option<Value>, InstantiationError>;
}

/// Hook registered for one struct type.
pub type ProviderFn =
    Arc<dyn Fn(&TypeExpr) -> Result<Option<Value>, InstantiationError> + Send + Sync>;

/// Dispatches to user hooks registered per struct name.
#[derive(Clone, Default)]
pub struct ProviderStrategy {
    providers: BTreeMap<Arc<str>, ProviderFn>,
}

impl ProviderStrategy {
    /// Registers `provider` for the struct named `type_name`, replacing any
    /// earlier hook.
    pub fn register<F>(&mut self, type_name: impl Into<Arc<str>>, provider: F)
    where
        F: Fn(&TypeExpr) -> Result<Option<Value>, InstantiationError> + Send + Sync + 'static,
    {
        self.providers.insert(type_name.into(), Arc::new(provider));
    }

    /// Returns `true` when no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderStrategy")
            .field("types", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl InstantiationStrategy for ProviderStrategy {
    fn name(&self) -> &'static str {
        "provider"
    }

    fn instantiate(
        &self,
        ty: &TypeExpr,
        def: &StructDef,
    ) -> Result<Option<Value>, InstantiationError> {
        self.providers
            .get(def.name())
            .map_or(Ok(None), |provider| provider(ty))
    }
}

/// Starts from the struct's registered template record.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateStrategy;

impl InstantiationStrategy for TemplateStrategy {
    fn name(&self) -> &'static str {
        "template"
    }

    fn instantiate(
        &self,
        ty: &TypeExpr,
        def: &StructDef,
    ) -> Result<Option<Value>, InstantiationError> {
        match def.template() {
            None => Ok(None),
            Some(Value::Struct(template)) => {
                let mut record = Record::new(ty.to_string());
                for field in def.fields() {
                    let value = template.get(field.name()).cloned().unwrap_or(Value::Null);
                    record.set(field.name(), value);
                }
                Ok(Some(Value::Struct(record)))
            }
            Some(other) => Err(InstantiationError::soft(format!(
                "template of `{}` is a {}, not a struct",
                def.name(),
                other.kind_name()
            ))),
        }
    }
}

/// Produces a record with every member `Null`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellStrategy;

impl InstantiationStrategy for ShellStrategy {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn instantiate(
        &self,
        ty: &TypeExpr,
        def: &StructDef,
    ) -> Result<Option<Value>, InstantiationError> {
        let mut record = Record::new(ty.to_string());
        for field in def.fields() {
            record.set(field.name(), Value::Null);
        }
        Ok(Some(Value::Struct(record)))
    }
}

/// Ordered list of strategies.
#[derive(Clone, Debug)]
pub(crate) struct InstantiationChain {
    strategies: Vec<Arc<dyn InstantiationStrategy>>,
}

impl InstantiationChain {
    /// Builds the standard chain: provider hooks, custom strategies, the
    /// template strategy and finally the shell strategy.
    pub(crate) fn standard(
        providers: &ProviderStrategy,
        custom: &[Arc<dyn InstantiationStrategy>],
    ) -> Self {
        let mut strategies: Vec<Arc<dyn InstantiationStrategy>> = Vec::with_capacity(custom.len() + 3);
        if !providers.is_empty() {
            strategies.push(Arc::new(providers.clone()));
        }
        strategies.extend(custom.iter().cloned());
        strategies.push(Arc::new(TemplateStrategy));
        strategies.push(Arc::new(ShellStrategy));
        Self { strategies }
    }

    /// Runs the chain; `Ok(None)` means every strategy declined or failed
    /// softly.
    pub(crate) fn instantiate(
        &self,
        ty: &TypeExpr,
        def: &StructDef,
    ) -> Result<Option<Value>, FixturaError> {
        for strategy in &self.strategies {
            match strategy.instantiate(ty, def) {
                Ok(Some(value)) => {
                    trace!(ty = %ty, strategy = strategy.name(), "instantiated");
                    return Ok(Some(value));
                }
                Ok(None) => {}
                Err(InstantiationError::Soft(reason)) => {
                    debug!(ty = %ty, strategy = strategy.name(), %reason, "instantiation strategy failed");
                }
                Err(InstantiationError::Hard(reason)) => {
                    return Err(FixturaError::Instantiation {
                        type_name: Arc::from(ty.to_string()),
                        strategy: strategy.name(),
                        reason,
                    });
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarKind;

    #[derive(Debug)]
    struct Failing(InstantiationError);

    impl InstantiationStrategy for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn instantiate(
            &self,
            _: &TypeExpr,
            _: &StructDef,
        ) -> Result<Option<Value>, InstantiationError> {
            Err(self.0.clone())
        }
    }

    fn person() -> StructDef {
        StructDef::new("Person")
            .field("name", ScalarKind::String)
            .field("age", ScalarKind::U8)
    }

    #[test]
    fn soft_failures_fall_through_to_the_shell() {
        let custom: Vec<Arc<dyn InstantiationStrategy>> =
            vec![Arc::new(Failing(InstantiationError::soft("no constructor")))];
        let chain = InstantiationChain::standard(&ProviderStrategy::default(), &custom);
        let value = chain
            .instantiate(&TypeExpr::named("Person"), &person())
            .expect("soft failures are contained")
            .expect("shell always instantiates");
        let record = value.as_record().expect("a record");
        assert_eq!(record.type_name(), "Person");
        assert_eq!(record.get("age"), Some(&Value::Null));
    }

    #[test]
    fn hard_failures_abort() {
        let custom: Vec<Arc<dyn InstantiationStrategy>> =
            vec![Arc::new(Failing(InstantiationError::hard("boom")))];
        let chain = InstantiationChain::standard(&ProviderStrategy::default(), &custom);
        let err = chain
            .instantiate(&TypeExpr::named("Person"), &person())
            .expect_err("hard failures propagate");
        assert_eq!(
            err.to_string(),
            "instantiation of `Person` aborted by strategy `failing`: boom"
        );
    }

    #[test]
    fn providers_run_before_templates() {
        let mut template = Record::new("Person");
        template.set("name", Value::from("template"));
        let def = person().with_template(Value::Struct(template));

        let mut providers = ProviderStrategy::default();
        providers.register("Person", |_: &TypeExpr| Ok(Some(Value::from("provided"))));
        let chain = InstantiationChain::standard(&providers, &[]);
        let value = chain
            .instantiate(&TypeExpr::named("Person"), &def)
            .expect("provider succeeds");
        assert_eq!(value, Some(Value::from("provided")));

        let chain = InstantiationChain::standard(&ProviderStrategy::default(), &[]);
        let value = chain
            .instantiate(&TypeExpr::named("Person"), &def)
            .expect("template succeeds")
            .expect("template yields a record");
        assert_eq!(value.pointer("name"), Some(&Value::from("template")));
        assert_eq!(value.pointer("age"), Some(&Value::Null));
    }
}
