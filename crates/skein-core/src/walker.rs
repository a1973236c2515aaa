//! Cycle-safe depth-first graph traversal
//!
//! [`Walker`] is an explicit-stack iterator of enter/exit events. Every
//! container and typed object is entered once; meeting it again yields a
//! [`WalkEvent::Revisit`] instead of a re-expansion, flagged as a cycle when
//! the target is still being walked. The encoder and the find/flatten
//! utilities are built on these events.

use crate::identity::{IdentityRegistry, NodeId, VisitState};
use crate::path::{Path, PathSegment};
use crate::value::Value;

/// Traversal event.
///
/// `segment` is the step from the parent to the value; `None` for the root.
#[derive(Debug, Clone)]
pub enum WalkEvent {
    /// Atomic or opaque value
    Leaf {
        segment: Option<PathSegment>,
        value: Value,
    },
    /// First visit of a container or object; its children follow
    Enter {
        segment: Option<PathSegment>,
        value: Value,
        id: NodeId,
    },
    /// Container or object seen before
    Revisit {
        segment: Option<PathSegment>,
        value: Value,
        id: NodeId,
        cycle: bool,
    },
    /// All children of `id` have been visited
    Exit { id: NodeId },
}

struct Frame {
    id: NodeId,
    value: Value,
    children: Option<std::vec::IntoIter<(PathSegment, Value)>>,
    has_segment: bool,
}

/// Iterative depth-first walker with identity tracking
pub struct Walker {
    root: Option<Value>,
    stack: Vec<Frame>,
    path: Path,
    // The last leaf/revisit/exit left a segment on `path` to pop next time
    dangling: bool,
    identities: IdentityRegistry,
}

impl Walker {
    pub fn new(root: &Value) -> Self {
        Self {
            root: Some(root.clone()),
            stack: Vec::new(),
            path: Path::root(),
            dangling: false,
            identities: IdentityRegistry::new(),
        }
    }

    /// Path of the value carried by the most recent event
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Do not descend into the value just entered
    pub fn skip_children(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children = Some(Vec::new().into_iter());
        }
    }

    /// Ids assigned so far
    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn visit(&mut self, segment: Option<PathSegment>, value: Value) -> WalkEvent {
        let has_segment = segment.is_some();
        if let Some(step) = segment.clone() {
            self.path.push(step);
        }

        // Opaque values are passed through untracked
        if !value.is_composite() {
            self.dangling = has_segment;
            return WalkEvent::Leaf { segment, value };
        }

        if let Some(id) = self.identities.id_of(&value) {
            self.dangling = has_segment;
            let cycle = self.identities.state(id) == Some(VisitState::InProgress);
            return WalkEvent::Revisit {
                segment,
                value,
                id,
                cycle,
            };
        }

        match self.identities.assign(&value) {
            Some(id) => {
                self.stack.push(Frame {
                    id,
                    value: value.clone(),
                    children: None,
                    has_segment,
                });
                WalkEvent::Enter { segment, value, id }
            }
            None => {
                self.dangling = has_segment;
                WalkEvent::Leaf { segment, value }
            }
        }
    }
}

impl Iterator for Walker {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        if self.dangling {
            self.path.pop();
            self.dangling = false;
        }

        if let Some(root) = self.root.take() {
            return Some(self.visit(None, root));
        }

        let frame = self.stack.last_mut()?;
        let children = frame
            .children
            .get_or_insert_with(|| frame.value.children().into_iter());

        match children.next() {
            Some((segment, child)) => Some(self.visit(Some(segment), child)),
            None => {
                let frame = self.stack.pop()?;
                self.identities.finish(frame.id);
                self.dangling = frame.has_segment;
                Some(WalkEvent::Exit { id: frame.id })
            }
        }
    }
}

/// How a walked value was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Leaf,
    First(NodeId),
    Repeat { id: NodeId, cycle: bool },
}

/// One visited value with its full path
#[derive(Debug, Clone)]
pub struct WalkItem {
    pub path: Path,
    pub value: Value,
    pub visit: Visit,
}

/// Iterator returned by [`walk`]
pub struct Walk {
    walker: Walker,
}

impl Iterator for Walk {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        loop {
            let (value, visit) = match self.walker.next()? {
                WalkEvent::Leaf { value, .. } => (value, Visit::Leaf),
                WalkEvent::Enter { value, id, .. } => (value, Visit::First(id)),
                WalkEvent::Revisit { value, id, cycle, .. } => (value, Visit::Repeat { id, cycle }),
                WalkEvent::Exit { .. } => continue,
            };
            return Some(WalkItem {
                path: self.walker.path().clone(),
                value,
                visit,
            });
        }
    }
}

/// Lazy pre-order sequence of every value reachable from `root`.
///
/// Shared values are expanded once; later encounters and cycle edges appear
/// as [`Visit::Repeat`]. Each call starts a fresh traversal.
pub fn walk(root: &Value) -> Walk {
    Walk {
        walker: Walker::new(root),
    }
}
