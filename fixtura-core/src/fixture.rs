//! Fixture builders and reusable models.
//!
//! A [`FixtureBuilder`] collects selector-bound customisations, settings
//! overrides and instantiation hooks. Every creation call resolves a fresh
//! settings snapshot, random source and match record, so one builder can be
//! used any number of times and from several threads through a [`Model`].

use std::{fmt, marker::PhantomData, sync::Arc};

use tracing::{Span, field, instrument};

use crate::{
    Result,
    audit::audit,
    depth::TruncationPolicy,
    describe::{Describe, FromValue},
    error::{FixturaError, SourceLocation},
    generators::Gen,
    instantiate::{InstantiationChain, InstantiationError, InstantiationStrategy, ProviderStrategy},
    populate::Populator,
    random::Random,
    schema::{Schema, TypeExpr, resolve::TypeGraph},
    select::{
        Selection,
        declaration::{Action, Declaration},
    },
    settings::{Mode, Settings, SettingsSnapshot},
    value::Value,
};

/// Starts a fixture for the Rust type `T`.
///
/// # Examples
/// ```
/// let value: Vec<u32> = fixtura_core::of::<Vec<u32>>()
///     .with_seed(7)
///     .create()
///     .expect("a Vec<u32> is always populated");
/// assert!((2..=6).contains(&value.len()));
/// ```
#[must_use]
pub fn of<T: Describe>() -> FixtureBuilder<T> {
    let mut schema = Schema::new();
    let root = T::describe(&mut schema);
    FixtureBuilder::with_root(Arc::new(schema), root)
}

/// Declares customisations and creates populated values of one root type.
///
/// Builders start from [`of`] for Rust types implementing [`Describe`] or
/// from [`FixtureBuilder::from_schema`] for dynamically described types.
///
/// # Examples
/// ```
/// use fixtura_core::{FixtureBuilder, ScalarKind, Schema, StructDef, TypeExpr, Value};
/// use fixtura_core::select::{field, types};
///
/// let schema = Schema::new().with(
///     StructDef::new("Person")
///         .field("name", ScalarKind::String)
///         .field("age", ScalarKind::U8),
/// );
/// let person = FixtureBuilder::from_schema(schema, TypeExpr::named("Person"))
///     .set(field("Person", "name"), "Ada")
///     .supply(types("u8"), |random| random.uint_in(18..=65))
///     .with_seed(1)
///     .create_value()
///     .expect("both selectors match");
/// assert_eq!(person.pointer("name"), Some(&Value::from("Ada")));
/// ```
pub struct FixtureBuilder<T = Value> {
    schema: Arc<Schema>,
    root: TypeExpr,
    declarations: Vec<Declaration>,
    explicit: Settings,
    call: Settings,
    providers: ProviderStrategy,
    strategies: Vec<Arc<dyn InstantiationStrategy>>,
    problem: Option<FixturaError>,
    target: PhantomData<fn() -> T>,
}

impl FixtureBuilder<Value> {
    /// Starts a fixture for `root` described by `schema`.
    #[must_use]
    pub fn from_schema(schema: impl Into<Arc<Schema>>, root: TypeExpr) -> Self {
        Self::with_root(schema.into(), root)
    }
}

impl<T> FixtureBuilder<T> {
    fn with_root(schema: Arc<Schema>, root: TypeExpr) -> Self {
        Self {
            schema,
            root,
            declarations: Vec::new(),
            explicit: Settings::new(),
            call: Settings::new(),
            providers: ProviderStrategy::default(),
            strategies: Vec::new(),
            problem: None,
            target: PhantomData,
        }
    }

    /// Root type of the fixture.
    #[must_use]
    pub const fn root(&self) -> &TypeExpr {
        &self.root
    }

    /// Schema the fixture is populated from.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Leaves matching nodes `Null` without visiting their children.
    #[must_use]
    #[track_caller]
    pub fn ignore(self, selection: impl Into<Selection>) -> Self {
        self.declare(selection.into(), Action::Ignore, SourceLocation::caller())
    }

    /// Assigns a fixed value to matching nodes.
    #[must_use]
    #[track_caller]
    pub fn set(self, selection: impl Into<Selection>, value: impl Into<Value>) -> Self {
        self.declare(
            selection.into(),
            Action::Set(value.into()),
            SourceLocation::caller(),
        )
    }

    /// Assigns the result of `supply` to matching nodes; the closure
    /// receives the call's random source.
    #[must_use]
    #[track_caller]
    pub fn supply<F, V>(self, selection: impl Into<Selection>, supply: F) -> Self
    where
        F: Fn(&mut Random) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        let action = Action::Supply(Arc::new(move |random: &mut Random| supply(random).into()));
        self.declare(selection.into(), action, SourceLocation::caller())
    }

    /// Generates matching nodes from `spec`.
    ///
    /// Scalar specs produce the node's value outright. A collection spec only
    /// sizes the container; its elements are populated as usual.
    #[must_use]
    #[track_caller]
    pub fn generate(self, selection: impl Into<Selection>, spec: impl Into<Gen>) -> Self {
        let location = SourceLocation::caller();
        let spec = spec.into();
        let checked = match spec.validate() {
            Ok(()) => self,
            Err(reason) => self.report(FixturaError::usage(reason, location)),
        };
        checked.declare(selection.into(), Action::Generate(spec), location)
    }

    /// Runs `hook` on every populated matching node once its subtree is
    /// complete. Every matching hook runs, in declaration order.
    #[must_use]
    #[track_caller]
    pub fn on_complete<F>(self, selection: impl Into<Selection>, hook: F) -> Self
    where
        F: Fn(&mut Value) + Send + Sync + 'static,
    {
        self.declare(
            selection.into(),
            Action::OnComplete(Arc::new(hook)),
            SourceLocation::caller(),
        )
    }

    /// Makes matching nodes `Null` with the configured nullable probability.
    #[must_use]
    #[track_caller]
    pub fn with_nullable(self, selection: impl Into<Selection>) -> Self {
        self.declare(selection.into(), Action::WithNullable, SourceLocation::caller())
    }

    /// Populates matching nodes as `subtype` instead of their declared type.
    #[must_use]
    #[track_caller]
    pub fn subtype(self, selection: impl Into<Selection>, subtype: TypeExpr) -> Self {
        self.declare(
            selection.into(),
            Action::Subtype(subtype),
            SourceLocation::caller(),
        )
    }

    /// Populates matching nodes as the Rust type `S`, registering its
    /// description in the fixture's schema.
    #[must_use]
    #[track_caller]
    pub fn subtype_of<S: Describe>(mut self, selection: impl Into<Selection>) -> Self {
        let location = SourceLocation::caller();
        let subtype = S::describe(Arc::make_mut(&mut self.schema));
        self.declare(selection.into(), Action::Subtype(subtype), location)
    }

    /// Overrides the maximum depth for this fixture.
    #[must_use]
    pub fn with_max_depth(self, max_depth: usize) -> Self {
        self.override_settings(|settings| settings.max_depth(max_depth))
    }

    /// Fixes the seed for this fixture.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        self.override_settings(|settings| settings.seed(seed))
    }

    /// Fails creation when any node exceeds the maximum depth.
    #[must_use]
    pub fn fail_on_max_depth(self) -> Self {
        self.override_settings(|settings| settings.max_depth_policy(TruncationPolicy::Fail))
    }

    /// Lets `Option` members be generated as `None`.
    #[must_use]
    pub fn with_nullable_options(self) -> Self {
        self.override_settings(|settings| settings.nullable_options(true))
    }

    /// Disables the unused-selector audit.
    #[must_use]
    pub fn lenient(self) -> Self {
        self.override_settings(|settings| settings.mode(Mode::Lenient))
    }

    /// Sets the call-scoped settings layer. Explicit overrides such as
    /// [`Self::with_seed`] still take precedence over it.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.call = settings;
        self
    }

    /// Registers an instantiation hook for the struct named `type_name`.
    #[must_use]
    pub fn with_provider<F>(mut self, type_name: &str, provider: F) -> Self
    where
        F: Fn(&TypeExpr) -> std::result::Result<Option<Value>, InstantiationError>
            + Send
            + Sync
            + 'static,
    {
        self.providers.register(type_name, provider);
        self
    }

    /// Adds a custom instantiation strategy, tried after provider hooks and
    /// before templates.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl InstantiationStrategy + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    /// Creates one populated value.
    ///
    /// # Errors
    /// Returns a [`FixturaError`] for malformed declarations, invalid
    /// settings or schemas, a depth violation under the `fail` policy, a hard
    /// instantiation failure, or unused selectors in strict mode.
    pub fn create_value(&self) -> Result<Value> {
        let (mut values, _) = self.populate(1)?;
        Ok(values.pop().unwrap_or(Value::Null))
    }

    /// Creates `count` populated values sharing one random source and one
    /// match record.
    ///
    /// # Errors
    /// See [`Self::create_value`].
    pub fn create_values(&self, count: usize) -> Result<Vec<Value>> {
        self.populate(count).map(|(values, _)| values)
    }

    /// Freezes the builder into a reusable, shareable model.
    #[must_use]
    pub fn to_model(&self) -> Model<T> {
        Model {
            builder: Arc::new(self.clone()),
        }
    }

    #[instrument(
        name = "fixture.create",
        skip_all,
        fields(root = %self.root, count, seed = field::Empty, max_depth = field::Empty),
    )]
    fn populate(&self, count: usize) -> Result<(Vec<Value>, u64)> {
        if let Some(problem) = &self.problem {
            return Err(problem.clone());
        }
        self.check()?;
        let settings = SettingsSnapshot::cascade(&self.explicit, &self.call)?;
        let random = settings.random();
        let seed = random.seed();
        let span = Span::current();
        span.record("seed", seed);
        span.record("max_depth", settings.max_depth());

        let chain = InstantiationChain::standard(&self.providers, &self.strategies);
        let mut populator = Populator::new(
            TypeGraph::new(&self.schema),
            &self.declarations,
            &chain,
            &settings,
            random,
        );
        let values = (0..count)
            .map(|_| populator.populate(&self.root))
            .collect::<Result<Vec<_>>>()?;
        let record = populator.finish();
        if settings.mode() == Mode::Strict {
            audit(&self.root, &self.declarations, &record)?;
        }
        Ok((values, seed))
    }

    fn check(&self) -> Result<()> {
        self.schema.validate()?;
        if let Some(name) = unknown_name(&self.root, &self.schema) {
            return Err(FixturaError::UnknownType {
                name: Arc::from(name),
            });
        }
        for declaration in &self.declarations {
            let location = declaration.location();
            for selector in declaration.selection().selectors() {
                selector
                    .check(&self.schema)
                    .map_err(|reason| FixturaError::usage(reason, location))?;
            }
            if let Action::Subtype(subtype) = declaration.action()
                && let Some(name) = unknown_name(subtype, &self.schema)
            {
                return Err(FixturaError::usage(
                    format!("subtype `{subtype}` names unregistered type `{name}`"),
                    location,
                ));
            }
        }
        Ok(())
    }

    fn declare(mut self, selection: Selection, action: Action, location: SourceLocation) -> Self {
        if let Some(reason) = selection.problem() {
            let error = FixturaError::usage(reason, location);
            self = self.report(error);
        }
        let order = self.declarations.len();
        self.declarations
            .push(Declaration::new(order, selection, action, location));
        self
    }

    fn report(mut self, error: FixturaError) -> Self {
        self.problem.get_or_insert(error);
        self
    }

    fn override_settings(mut self, apply: impl FnOnce(Settings) -> Settings) -> Self {
        self.explicit = apply(std::mem::take(&mut self.explicit));
        self
    }
}

impl<T: FromValue> FixtureBuilder<T> {
    /// Creates one value and converts it into `T`.
    ///
    /// # Errors
    /// See [`Self::create_value`]; additionally [`FixturaError::Conversion`]
    /// when the populated value does not fit `T`.
    pub fn create(&self) -> Result<T> {
        Ok(T::from_value(self.create_value()?)?)
    }

    /// Creates one value together with the seed that produced it.
    ///
    /// Without a configured seed the engine draws one from entropy; passing
    /// the returned seed to [`Self::with_seed`] reproduces the value.
    ///
    /// # Errors
    /// See [`Self::create`].
    pub fn create_result(&self) -> Result<Created<T>> {
        let (mut values, seed) = self.populate(1)?;
        let value = T::from_value(values.pop().unwrap_or(Value::Null))?;
        Ok(Created { value, seed })
    }

    /// Creates `count` values and converts each into `T`.
    ///
    /// # Errors
    /// See [`Self::create`].
    pub fn create_list(&self, count: usize) -> Result<Vec<T>> {
        self.create_values(count)?
            .into_iter()
            .map(|value| T::from_value(value).map_err(FixturaError::from))
            .collect()
    }
}

impl<T> Clone for FixtureBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            root: self.root.clone(),
            declarations: self.declarations.clone(),
            explicit: self.explicit.clone(),
            call: self.call.clone(),
            providers: self.providers.clone(),
            strategies: self.strategies.clone(),
            problem: self.problem.clone(),
            target: PhantomData,
        }
    }
}

impl<T> fmt::Debug for FixtureBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureBuilder")
            .field("root", &format_args!("{}", self.root))
            .field("declarations", &self.declarations)
            .field("explicit", &self.explicit)
            .field("call", &self.call)
            .finish_non_exhaustive()
    }
}

/// An immutable, cloneable fixture definition.
///
/// Creation calls on a model are independent: each gets its own settings
/// snapshot, random source and match record.
pub struct Model<T = Value> {
    builder: Arc<FixtureBuilder<T>>,
}

impl<T> Model<T> {
    /// Returns a builder that starts from this model's declarations; new
    /// declarations take precedence over the model's.
    #[must_use]
    pub fn extend(&self) -> FixtureBuilder<T> {
        (*self.builder).clone()
    }

    /// Creates one populated value.
    ///
    /// # Errors
    /// See [`FixtureBuilder::create_value`].
    pub fn create_value(&self) -> Result<Value> {
        self.builder.create_value()
    }
}

impl<T: FromValue> Model<T> {
    /// Creates one value and converts it into `T`.
    ///
    /// # Errors
    /// See [`FixtureBuilder::create`].
    pub fn create(&self) -> Result<T> {
        self.builder.create()
    }

    /// Creates `count` values and converts each into `T`.
    ///
    /// # Errors
    /// See [`FixtureBuilder::create`].
    pub fn create_list(&self, count: usize) -> Result<Vec<T>> {
        self.builder.create_list(count)
    }

    /// Creates one value together with its seed.
    ///
    /// # Errors
    /// See [`FixtureBuilder::create`].
    pub fn create_result(&self) -> Result<Created<T>> {
        self.builder.create_result()
    }
}

impl<T> Clone for Model<T> {
    fn clone(&self) -> Self {
        Self {
            builder: Arc::clone(&self.builder),
        }
    }
}

impl<T> fmt::Debug for Model<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Model").field(&self.builder).finish()
    }
}

/// A created value and the seed it was populated from.
#[derive(Clone, Debug, PartialEq)]
pub struct Created<T> {
    value: T,
    seed: u64,
}

impl<T> Created<T> {
    /// Returns the created value.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Returns the seed of the run that created the value.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Consumes the result, returning the value.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

fn unknown_name<'t>(ty: &'t TypeExpr, schema: &Schema) -> Option<&'t str> {
    match ty {
        TypeExpr::Scalar(_) | TypeExpr::Param(_) => None,
        TypeExpr::Named { name, args } => {
            if schema.contains(name) {
                args.iter().find_map(|arg| unknown_name(arg, schema))
            } else {
                Some(name)
            }
        }
        TypeExpr::Seq(inner) | TypeExpr::Set(inner) | TypeExpr::Optional(inner) => {
            unknown_name(inner, schema)
        }
        TypeExpr::Map(key, value) => {
            unknown_name(key, schema).or_else(|| unknown_name(value, schema))
        }
    }
}
