//! Identity-preserving graph rewriting

use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::limits::MAX_GRAPH_DEPTH;
use crate::params::Params;
use crate::value::{MapRef, ObjectRef, SeqRef, SetRef, Value};
use std::collections::HashMap;

/// What happens to the mapper's output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransformMode {
    /// The replacement's children are rebuilt like the rest of the graph,
    /// so matches inside it are replaced too
    #[default]
    Deep,
    /// The replacement is inserted untouched
    Shallow,
}

/// Rebuild `root`, replacing every value matching `predicate` with
/// `mapper(value)`.
///
/// See [`transform_with`].
pub fn transform<P, M>(root: &Value, predicate: P, mapper: M) -> Result<Value>
where
    P: FnMut(&Value) -> bool,
    M: FnMut(&Value) -> Value,
{
    transform_with(root, predicate, mapper, TransformMode::Deep)
}

/// Rebuild `root` with replacements.
///
/// Every unmatched container and object is rebuilt; objects through a
/// duplicate whose parameters are re-applied. Values shared in the input
/// are shared in the output and cycles are reproduced. A match is replaced
/// as a whole and its own subtree is not searched. In deep mode, references
/// from inside the replacement back to the matched value resolve to the
/// replacement, and a mapper output returned for several matches is rebuilt
/// once and shared. Opaque values are carried over as-is. Fails with
/// `NestingTooDeep` past `MAX_GRAPH_DEPTH` nested definitions.
pub fn transform_with<P, M>(root: &Value, predicate: P, mapper: M, mode: TransformMode) -> Result<Value>
where
    P: FnMut(&Value) -> bool,
    M: FnMut(&Value) -> Value,
{
    let mut rebuilder = Rebuilder {
        predicate,
        mapper,
        mode,
        memo: HashMap::new(),
        depth: 0,
        replaced: 0,
        rebuilt: 0,
    };
    let result = rebuilder.rebuild(root)?;
    tracing::debug!(
        replaced = rebuilder.replaced,
        rebuilt = rebuilder.rebuilt,
        memoised = rebuilder.memo.len(),
        ?mode,
        "Transformed graph"
    );
    Ok(result)
}

struct Rebuilder<P, M> {
    predicate: P,
    mapper: M,
    mode: TransformMode,
    // Keyed by the original's identity; the original is held so its
    // address cannot be reused by a later temporary
    memo: HashMap<Identity, (Value, Value)>,
    depth: usize,
    replaced: usize,
    rebuilt: usize,
}

impl<P, M> Rebuilder<P, M>
where
    P: FnMut(&Value) -> bool,
    M: FnMut(&Value) -> Value,
{
    fn rebuild(&mut self, value: &Value) -> Result<Value> {
        if let Some(done) = self.recall(value) {
            return Ok(done);
        }

        if (self.predicate)(value) {
            self.replaced += 1;
            let replacement = (self.mapper)(value);
            return match self.mode {
                TransformMode::Shallow => {
                    self.remember(value, &replacement);
                    Ok(replacement)
                }
                TransformMode::Deep => match self.recall(&replacement) {
                    Some(done) => {
                        self.remember(value, &done);
                        Ok(done)
                    }
                    None => self.copy(&replacement, Some(value)),
                },
            };
        }

        self.copy(value, None)
    }

    /// Fresh copy of `source` with rebuilt children. The new value is
    /// memoised under `source` (and `replaces`) before any child is visited
    /// so cycles close on it.
    fn copy(&mut self, source: &Value, replaces: Option<&Value>) -> Result<Value> {
        let shell = match source {
            Value::Seq(_) => Value::Seq(SeqRef::new()),
            Value::Set(_) => Value::Set(SetRef::new()),
            Value::Map(_) => Value::Map(MapRef::new()),
            Value::Object(object) => Value::Object(ObjectRef::from_box(object.duplicate())),
            other => {
                if let Some(original) = replaces {
                    self.remember(original, other);
                }
                return Ok(other.clone());
            }
        };

        if self.depth >= MAX_GRAPH_DEPTH {
            return Err(Error::NestingTooDeep {
                depth: self.depth + 1,
                max: MAX_GRAPH_DEPTH,
            });
        }
        self.remember(source, &shell);
        if let Some(original) = replaces {
            self.remember(original, &shell);
        }
        self.rebuilt += 1;
        self.depth += 1;

        match (source, &shell) {
            (Value::Seq(from), Value::Seq(to)) => {
                for item in from.to_vec() {
                    let item = self.rebuild(&item)?;
                    to.push(item);
                }
            }
            (Value::Set(from), Value::Set(to)) => {
                for item in from.to_vec() {
                    let item = self.rebuild(&item)?;
                    to.insert(item);
                }
            }
            (Value::Map(from), Value::Map(to)) => {
                for (key, value) in from.entries() {
                    let key = self.rebuild(&key)?;
                    let value = self.rebuild(&value)?;
                    to.insert(key, value);
                }
            }
            (Value::Object(from), Value::Object(to)) => {
                let mut params = Params::new();
                for (name, value) in from.params() {
                    let value = self.rebuild(&value)?;
                    params.insert(name, value);
                }
                to.apply_params(params)?;
            }
            _ => {}
        }
        self.depth -= 1;
        Ok(shell)
    }

    fn recall(&self, original: &Value) -> Option<Value> {
        let identity = original.identity()?;
        self.memo.get(&identity).map(|(_, result)| result.clone())
    }

    fn remember(&mut self, original: &Value, result: &Value) {
        if let Some(identity) = original.identity() {
            self.memo.insert(identity, (original.clone(), result.clone()));
        }
    }
}
