//! Fixtura core library: populates object graphs of described types for use
//! as test fixtures, with selector-based customisation.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod audit;
mod depth;
mod describe;
mod error;
mod fixture;
mod generators;
mod instantiate;
mod path;
mod populate;
mod random;
pub mod schema;
pub mod select;
mod settings;
mod value;

pub use crate::{
    audit::{UnusedSelector, UnusedSelectorReport},
    depth::TruncationPolicy,
    describe::{Describe, FromValue, ValueError},
    error::{FixturaError, FixturaErrorCode, Result, SourceLocation},
    fixture::{Created, FixtureBuilder, Model, of},
    generators::{CollectionSpec, Gen, StringSpec},
    instantiate::{
        InstantiationError, InstantiationStrategy, ProviderFn, ProviderStrategy, ShellStrategy,
        TemplateStrategy,
    },
    path::{AncestorPath, PathSegment},
    random::Random,
    schema::{
        EnumDef, FieldDef, InterfaceDef, ScalarKind, Schema, StructBuilder, StructDef, TypeDef,
        TypeExpr, TypeParseError,
    },
    select::ApiCategory,
    settings::{Mode, Settings, SettingsSnapshot},
    value::{Record, Value},
};
