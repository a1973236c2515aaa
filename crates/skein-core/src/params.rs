//! Parameter projection contract for typed objects

use crate::error::{Error, Result};
use crate::value::Value;
use std::any::Any;

/// Contract a typed object implements to be walked, encoded and rebuilt.
///
/// The projection is an ordered name -> value list that is sufficient to
/// reconstruct equivalent state. Decoding reverses it through the factory
/// registered for [`type_tag`](ParamProjection::type_tag).
pub trait ParamProjection: ProjectionBase + 'static {
    /// Stable type identifier, written as `$type`
    fn type_tag(&self) -> &str;

    /// Current parameters, in a stable order
    fn params(&self) -> Params;

    /// Populate this instance from parameters.
    ///
    /// Called on a freshly allocated shell during decode and on a duplicate
    /// during transform. Must accept every projection `params` produces.
    fn apply_params(&mut self, params: Params) -> Result<()>;

    /// Names of parameters that define the object's identity and behavior
    fn essential_param_names(&self) -> Vec<String> {
        self.params().names().map(str::to_owned).collect()
    }
}

/// Object-safe plumbing implemented for every `Clone` projection
pub trait ProjectionBase {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_projection(&self) -> Box<dyn ParamProjection>;
}

impl<T: ParamProjection + Clone> ProjectionBase for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_projection(&self) -> Box<dyn ParamProjection> {
        Box::new(self.clone())
    }
}

/// Ordered name -> value mapping with unique names
#[derive(Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a parameter; a replaced name keeps its position
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove and return a parameter
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Remove a parameter that must be present
    pub fn take_required(&mut self, name: &str) -> Result<Value> {
        self.take(name)
            .ok_or_else(|| Error::MissingParam(name.to_string()))
    }

    /// Remove a required parameter and convert it.
    ///
    /// `expected` names the accepted shape in the error when `convert`
    /// returns `None`.
    pub fn take_as<T>(
        &mut self,
        name: &str,
        expected: &str,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T> {
        let value = self.take_required(name)?;
        convert(&value).ok_or_else(|| Error::invalid_param(name, expected))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy with parameters sorted by name
    pub fn sorted(&self) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Self { entries }
    }

    /// Copy restricted to the given names, in this list's order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Self {
        self.entries
            .iter()
            .filter(|(n, _)| names.iter().any(|wanted| wanted.as_ref() == n))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl FromIterator<(String, Value)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
