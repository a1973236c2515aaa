//! Identity tracking for a single encode or decode session

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Address of a shared allocation, used as reference-based identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(usize);

impl Identity {
    pub(crate) fn of<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr as *const () as usize)
    }
}

/// Sequential id assigned to a container or object within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress of a node within the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    /// Entered but not yet finished; meeting it again closes a cycle
    InProgress,
    /// Fully visited or populated
    Done,
}

#[derive(Debug)]
struct Binding {
    value: Option<Value>,
    state: VisitState,
}

/// Bidirectional identity <-> id table scoped to one encode or decode call
///
/// Every bound value is kept alive by the registry, so an address can never
/// be reused by another allocation while the session runs.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    ids: HashMap<Identity, NodeId>,
    bindings: HashMap<NodeId, Binding>,
    next_id: u64,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id previously assigned to this value, if any
    pub fn id_of(&self, value: &Value) -> Option<NodeId> {
        value.identity().and_then(|identity| self.ids.get(&identity).copied())
    }

    /// Assign the next sequential id to a value seen for the first time.
    ///
    /// Returns `None` for values without identity. A value that already has
    /// an id keeps it.
    pub fn assign(&mut self, value: &Value) -> Option<NodeId> {
        let identity = value.identity()?;
        if let Some(id) = self.ids.get(&identity) {
            return Some(*id);
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.ids.insert(identity, id);
        self.bindings.insert(
            id,
            Binding {
                value: Some(value.clone()),
                state: VisitState::InProgress,
            },
        );
        Some(id)
    }

    /// Mark an id as being built before any object exists for it
    pub fn reserve(&mut self, id: NodeId) {
        self.bindings.entry(id).or_insert(Binding {
            value: None,
            state: VisitState::InProgress,
        });
    }

    /// Attach an allocated value to an id (decode direction)
    pub fn bind(&mut self, id: NodeId, value: &Value) {
        if let Some(identity) = value.identity() {
            self.ids.insert(identity, id);
        }
        let binding = self.bindings.entry(id).or_insert(Binding {
            value: None,
            state: VisitState::InProgress,
        });
        binding.value = Some(value.clone());
    }

    /// Mark an id as fully visited or populated
    pub fn finish(&mut self, id: NodeId) {
        if let Some(binding) = self.bindings.get_mut(&id) {
            binding.state = VisitState::Done;
        }
    }

    /// Value bound to an id
    pub fn get(&self, id: NodeId) -> Option<&Value> {
        self.bindings.get(&id).and_then(|b| b.value.as_ref())
    }

    pub fn state(&self, id: NodeId) -> Option<VisitState> {
        self.bindings.get(&id).map(|b| b.state)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
