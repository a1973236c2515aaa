//! Object graph -> encoded tree

use crate::error::{Error, Result};
use crate::identity::NodeId;
use crate::limits::MAX_GRAPH_DEPTH;
use crate::node::{Atomic, ContainerKind, EncodedNode};
use crate::path::PathSegment;
use crate::value::Value;
use crate::walker::{WalkEvent, Walker};

/// Encode a graph, emitting each shared value once and `$ref` nodes for
/// every later encounter, cycles included.
///
/// Ids are assigned from 0 in first-visit order. Fails with
/// `ValueNotEncodable` on opaque values and non-finite floats, and with
/// `NestingTooDeep` past `MAX_GRAPH_DEPTH` nested definitions.
pub fn encode(root: &Value) -> Result<EncodedNode> {
    let mut walker = Walker::new(root);
    let mut open: Vec<Open> = Vec::new();
    // Placeholder until the root's event is seen; the walker always emits one
    let mut result = EncodedNode::Atomic(Atomic::Null);
    let mut references = 0usize;

    while let Some(event) = walker.next() {
        let (segment, node) = match event {
            WalkEvent::Leaf { segment, value } => {
                let atomic = atomic(&value).ok_or_else(|| {
                    Error::ValueNotEncodable(format!("{} at {}", describe(&value), walker.path()))
                })?;
                (segment, EncodedNode::Atomic(atomic))
            }
            WalkEvent::Revisit { segment, id, .. } => {
                references += 1;
                (segment, EncodedNode::Ref(id))
            }
            WalkEvent::Enter { segment, value, id } => {
                if walker.depth() > MAX_GRAPH_DEPTH {
                    return Err(Error::NestingTooDeep {
                        depth: walker.depth(),
                        max: MAX_GRAPH_DEPTH,
                    });
                }
                open.push(Open::start(segment, &value, id, &walker)?);
                continue;
            }
            WalkEvent::Exit { .. } => match open.pop() {
                Some(done) => done.finish(),
                None => continue,
            },
        };

        match open.last_mut() {
            Some(parent) => parent.attach(segment, node),
            None => result = node,
        }
    }

    tracing::debug!(
        definitions = walker.identities().len(),
        references,
        "Encoded graph"
    );
    Ok(result)
}

/// Definition whose children are still being encoded
struct Open {
    segment: Option<PathSegment>,
    id: NodeId,
    body: Body,
}

enum Body {
    Container {
        kind: ContainerKind,
        items: Vec<EncodedNode>,
    },
    Object {
        type_tag: String,
        params: Vec<(String, EncodedNode)>,
    },
}

impl Open {
    fn start(segment: Option<PathSegment>, value: &Value, id: NodeId, walker: &Walker) -> Result<Self> {
        let body = match value {
            Value::Seq(_) => Body::container(ContainerKind::Seq),
            Value::Set(_) => Body::container(ContainerKind::Set),
            Value::Map(_) => Body::container(ContainerKind::Map),
            Value::Object(object) => {
                let type_tag = object.type_tag();
                if type_tag.is_empty() {
                    return Err(Error::ValueNotEncodable(format!(
                        "object with empty type tag at {}",
                        walker.path()
                    )));
                }
                Body::Object {
                    type_tag,
                    params: Vec::new(),
                }
            }
            other => {
                return Err(Error::ValueNotEncodable(format!(
                    "{} at {}",
                    describe(other),
                    walker.path()
                )))
            }
        };
        Ok(Self { segment, id, body })
    }

    fn attach(&mut self, segment: Option<PathSegment>, node: EncodedNode) {
        match &mut self.body {
            Body::Container { items, .. } => items.push(node),
            Body::Object { params, .. } => {
                if let Some(PathSegment::Param(name)) = segment {
                    params.push((name, node));
                }
            }
        }
    }

    fn finish(self) -> (Option<PathSegment>, EncodedNode) {
        let node = match self.body {
            Body::Container { kind, items } => EncodedNode::Container {
                id: self.id,
                kind,
                items,
            },
            Body::Object { type_tag, params } => EncodedNode::Object {
                id: self.id,
                type_tag,
                params,
            },
        };
        (self.segment, node)
    }
}

impl Body {
    fn container(kind: ContainerKind) -> Self {
        Self::Container {
            kind,
            items: Vec::new(),
        }
    }
}

fn atomic(value: &Value) -> Option<Atomic> {
    match value {
        Value::Null => Some(Atomic::Null),
        Value::Bool(b) => Some(Atomic::Bool(*b)),
        Value::Int(i) => Some(Atomic::Int(*i)),
        Value::Float(f) if f.is_finite() => Some(Atomic::Float(*f)),
        Value::Str(s) => Some(Atomic::Str(s.clone())),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Opaque(o) => format!("opaque value of type {}", o.type_name()),
        Value::Float(f) => format!("non-finite float {}", f),
        other => format!("{} value", other.kind_name()),
    }
}
