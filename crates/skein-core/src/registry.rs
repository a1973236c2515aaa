//! Type tag -> factory registry used by the decoder

use crate::error::{Error, Result};
use crate::limits::validate_type_tag;
use crate::params::{ParamProjection, Params};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

type ShellFn = dyn Fn() -> Box<dyn ParamProjection> + Send + Sync;
type ConstructorFn = dyn Fn(Params) -> Result<Box<dyn ParamProjection>> + Send + Sync;

/// How a registered type is materialised during decode
#[derive(Clone)]
pub enum Factory {
    /// Allocates an empty instance that is populated afterwards with
    /// `apply_params`. Shell types may take part in reference cycles.
    Shell(Arc<ShellFn>),
    /// Builds the instance from complete, already decoded parameters.
    /// A constructor type reached again while its parameters are still
    /// being decoded fails with `CycleResolutionFailure`.
    Constructor(Arc<ConstructorFn>),
}

impl Factory {
    pub fn is_shell(&self) -> bool {
        matches!(self, Self::Shell(_))
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shell(_) => write!(f, "Factory::Shell"),
            Self::Constructor(_) => write!(f, "Factory::Constructor"),
        }
    }
}

/// Explicit mapping from type tags to factories.
///
/// Built once up front, then shared read-only (it is `Send + Sync`).
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    factories: HashMap<String, Factory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shell-mode type under the tag its default instance reports
    pub fn register<T>(&mut self) -> Result<()>
    where
        T: ParamProjection + Default + Clone,
    {
        let tag = T::default().type_tag().to_string();
        self.register_shell(&tag, || Box::new(T::default()) as Box<dyn ParamProjection>)
    }

    /// Register a shell factory under an explicit tag
    pub fn register_shell<F>(&mut self, tag: &str, shell: F) -> Result<()>
    where
        F: Fn() -> Box<dyn ParamProjection> + Send + Sync + 'static,
    {
        self.insert(tag, Factory::Shell(Arc::new(shell)))
    }

    /// Register a constructor that needs all parameters up front
    pub fn register_constructor<F>(&mut self, tag: &str, constructor: F) -> Result<()>
    where
        F: Fn(Params) -> Result<Box<dyn ParamProjection>> + Send + Sync + 'static,
    {
        self.insert(tag, Factory::Constructor(Arc::new(constructor)))
    }

    fn insert(&mut self, tag: &str, factory: Factory) -> Result<()> {
        validate_type_tag(tag)?;
        match self.factories.entry(tag.to_string()) {
            Entry::Occupied(_) => Err(Error::DuplicateType(tag.to_string())),
            Entry::Vacant(slot) => {
                tracing::debug!(tag, shell = factory.is_shell(), "Registered type");
                slot.insert(factory);
                Ok(())
            }
        }
    }

    pub fn get(&self, tag: &str) -> Option<&Factory> {
        self.factories.get(tag)
    }

    /// Factory for a tag, or `UnregisteredType`
    pub fn resolve(&self, tag: &str) -> Result<&Factory> {
        self.get(tag)
            .ok_or_else(|| Error::UnregisteredType(tag.to_string()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered tags, sorted
    pub fn type_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Parameters of a freshly allocated shell instance.
    ///
    /// Constructor types have no parameter-free instance, so they report
    /// `None` like unknown tags.
    pub fn default_params(&self, tag: &str) -> Option<Params> {
        match self.get(tag)? {
            Factory::Shell(shell) => Some(shell().params()),
            Factory::Constructor(_) => None,
        }
    }
}
