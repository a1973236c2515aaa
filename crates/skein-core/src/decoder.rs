//! Encoded tree -> object graph

use crate::error::{Error, Result};
use crate::identity::{IdentityRegistry, NodeId, VisitState};
use crate::limits::MAX_GRAPH_DEPTH;
use crate::node::{ContainerKind, EncodedNode};
use crate::params::Params;
use crate::registry::{Factory, TypeRegistry};
use crate::value::{MapRef, ObjectRef, SeqRef, SetRef, Value};
use std::collections::HashMap;

/// Rebuild a graph from an encoded tree.
///
/// Typed objects are created only through factories in `registry`. Sharing
/// and cycles are reproduced from `$ref` nodes; references may point forward
/// in document order. Definitions nested deeper than `MAX_GRAPH_DEPTH` fail
/// with `NestingTooDeep`.
pub fn decode(tree: &EncodedNode, registry: &TypeRegistry) -> Result<Value> {
    let mut decoder = Decoder::new(tree, registry)?;
    let value = decoder.decode_node(tree)?;
    tracing::debug!(definitions = decoder.objects.len(), "Decoded tree");
    Ok(value)
}

/// Single decode session over one tree
pub(crate) struct Decoder<'a> {
    registry: &'a TypeRegistry,
    definitions: HashMap<NodeId, &'a EncodedNode>,
    objects: IdentityRegistry,
    // Definitions currently being built
    depth: usize,
}

impl<'a> Decoder<'a> {
    /// Index the tree's definitions, rejecting duplicates and dangling refs
    pub(crate) fn new(tree: &'a EncodedNode, registry: &'a TypeRegistry) -> Result<Self> {
        Ok(Self {
            registry,
            definitions: tree.definitions()?,
            objects: IdentityRegistry::new(),
            depth: 0,
        })
    }

    pub(crate) fn decode_node(&mut self, node: &EncodedNode) -> Result<Value> {
        match node {
            EncodedNode::Atomic(atomic) => Ok(atomic.to_value()),
            EncodedNode::Ref(id) => self.resolve(*id),
            EncodedNode::Container { id, .. } | EncodedNode::Object { id, .. } => self.resolve(*id),
        }
    }

    /// Value for an id, building its definition on first requirement
    fn resolve(&mut self, id: NodeId) -> Result<Value> {
        if let Some(value) = self.objects.get(id) {
            return Ok(value.clone());
        }
        let definition = *self
            .definitions
            .get(&id)
            .ok_or(Error::DanglingReference(id.0))?;

        if self.objects.state(id) == Some(VisitState::InProgress) {
            // Reserved by a constructor type still decoding its params
            let type_tag = match definition {
                EncodedNode::Object { type_tag, .. } => type_tag.clone(),
                _ => String::new(),
            };
            return Err(Error::CycleResolutionFailure { id: id.0, type_tag });
        }

        tracing::trace!(%id, "Building definition");
        self.build(id, definition)
    }

    fn build(&mut self, id: NodeId, definition: &EncodedNode) -> Result<Value> {
        if self.depth >= MAX_GRAPH_DEPTH {
            return Err(Error::NestingTooDeep {
                depth: self.depth + 1,
                max: MAX_GRAPH_DEPTH,
            });
        }
        self.depth += 1;
        let value = match definition {
            EncodedNode::Container { kind, items, .. } => self.build_container(id, *kind, items),
            EncodedNode::Object { type_tag, params, .. } => self.build_object(id, type_tag, params),
            // Only definitions are indexed
            other => self.decode_node(other),
        }?;
        self.depth -= 1;
        Ok(value)
    }

    fn build_container(&mut self, id: NodeId, kind: ContainerKind, items: &[EncodedNode]) -> Result<Value> {
        // Bind the empty container before its items so cycles close on it
        let value = match kind {
            ContainerKind::Seq => {
                let seq = SeqRef::new();
                self.objects.bind(id, &Value::Seq(seq.clone()));
                for item in items {
                    let item = self.decode_node(item)?;
                    seq.push(item);
                }
                Value::Seq(seq)
            }
            ContainerKind::Set => {
                let set = SetRef::new();
                self.objects.bind(id, &Value::Set(set.clone()));
                for item in items {
                    let item = self.decode_node(item)?;
                    set.insert(item);
                }
                Value::Set(set)
            }
            ContainerKind::Map => {
                let map = MapRef::new();
                self.objects.bind(id, &Value::Map(map.clone()));
                for pair in items.chunks_exact(2) {
                    let key = self.decode_node(&pair[0])?;
                    let value = self.decode_node(&pair[1])?;
                    map.insert(key, value);
                }
                Value::Map(map)
            }
        };
        self.objects.finish(id);
        Ok(value)
    }

    fn build_object(&mut self, id: NodeId, type_tag: &str, params: &[(String, EncodedNode)]) -> Result<Value> {
        let factory = self.registry.resolve(type_tag)?.clone();

        let value = match factory {
            Factory::Shell(shell) => {
                let object = ObjectRef::from_box(shell());
                self.objects.bind(id, &Value::Object(object.clone()));
                let params = self.decode_params(params)?;
                object.apply_params(params)?;
                Value::Object(object)
            }
            Factory::Constructor(construct) => {
                self.objects.reserve(id);
                let params = self.decode_params(params)?;
                let value = Value::Object(ObjectRef::from_box(construct(params)?));
                self.objects.bind(id, &value);
                value
            }
        };
        self.objects.finish(id);
        Ok(value)
    }

    pub(crate) fn decode_params(&mut self, params: &[(String, EncodedNode)]) -> Result<Params> {
        params
            .iter()
            .map(|(name, node)| Ok::<_, Error>((name.clone(), self.decode_node(node)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;
    use crate::node::Atomic;
    use crate::testing::{chain, link, node, poly, registry, Circle, Node, Pair, Poly};
    use serde_json::json;

    fn tree(json: serde_json::Value) -> EncodedNode {
        EncodedNode::from_json(&json).unwrap()
    }

    #[test]
    fn test_roundtrip_is_independent_copy() {
        let original = Value::seq([
            Value::object(Circle { radius: 2.0 }),
            Value::map([(Value::from("k"), Value::set([Value::from(1), Value::from("x")]))]),
        ]);
        let copy = decode(&encode(&original).unwrap(), &registry()).unwrap();

        assert_eq!(copy, original);
        assert!(!copy.same(&original));
        let first = copy.as_seq().unwrap().get(0).unwrap();
        assert!(!first.same(&original.as_seq().unwrap().get(0).unwrap()));
        assert_eq!(first.as_object().unwrap().downcast_ref::<Circle>().unwrap().radius, 2.0);
    }

    #[test]
    fn test_self_reference_restored() {
        let o = Value::Object(node("o", Value::Null));
        link(&o, o.clone());
        let copy = decode(&encode(&o).unwrap(), &registry()).unwrap();

        let next = copy.as_object().unwrap().downcast_ref::<Node>().unwrap().next.clone();
        assert!(next.same(&copy));
    }

    #[test]
    fn test_shared_reference_restored() {
        let x = Value::seq([]);
        let copy = decode(&encode(&Value::seq([x.clone(), x])).unwrap(), &registry()).unwrap();
        let items = copy.as_seq().unwrap().to_vec();
        assert!(items[0].same(&items[1]));
    }

    #[test]
    fn test_forward_reference() {
        let encoded = tree(json!({"$id": 0, "$kind": "seq", "items": [
            {"$ref": 1},
            {"$id": 1, "$kind": "seq", "items": [7]}
        ]}));
        let value = decode(&encoded, &registry()).unwrap();
        let items = value.as_seq().unwrap().to_vec();

        assert!(items[0].same(&items[1]));
        assert_eq!(items[0], Value::seq([Value::from(7)]));
    }

    #[test]
    fn test_container_cycle() {
        let encoded = tree(json!({"$id": 0, "$kind": "map", "items": ["me", {"$ref": 0}]}));
        let value = decode(&encoded, &registry()).unwrap();
        let me = value.as_map().unwrap().get(&Value::from("me")).unwrap();
        assert!(me.same(&value));
    }

    #[test]
    fn test_unregistered_type() {
        let encoded = tree(json!({"$id": 0, "$type": "shapes.Hexagon", "params": {}}));
        assert!(matches!(
            decode(&encoded, &registry()),
            Err(Error::UnregisteredType(tag)) if tag == "shapes.Hexagon"
        ));
    }

    #[test]
    fn test_constructor_type() {
        let pair = Value::object(Pair {
            left: Value::from(1),
            right: Value::seq([]),
        });
        let copy = decode(&encode(&pair).unwrap(), &registry()).unwrap();
        assert_eq!(copy, pair);
    }

    #[test]
    fn test_cycle_through_constructor_type_fails() {
        let encoded = tree(json!({"$id": 0, "$type": "test.Pair", "params": {
            "left": {"$id": 1, "$kind": "seq", "items": [{"$ref": 0}]},
            "right": null
        }}));
        assert!(matches!(
            decode(&encoded, &registry()),
            Err(Error::CycleResolutionFailure { id: 0, type_tag }) if type_tag == "test.Pair"
        ));
    }

    #[test]
    fn test_apply_params_error_propagates() {
        let encoded = tree(json!({"$id": 0, "$type": "test.Circle", "params": {"radius": "wide"}}));
        assert!(matches!(
            decode(&encoded, &registry()),
            Err(Error::InvalidParam { name, .. }) if name == "radius"
        ));
    }

    #[test]
    fn test_dangling_reference() {
        let encoded = tree(json!({"$id": 0, "$kind": "seq", "items": [{"$ref": 3}]}));
        assert!(matches!(
            decode(&encoded, &registry()),
            Err(Error::DanglingReference(3))
        ));
    }

    #[test]
    fn test_deep_chain_at_limit() {
        let original = chain(MAX_GRAPH_DEPTH);
        let copy = decode(&encode(&original).unwrap(), &registry()).unwrap();
        assert_eq!(copy, original);
    }

    #[test]
    fn test_tree_past_limit_fails() {
        let mut deep = EncodedNode::Atomic(Atomic::Null);
        for i in (0..MAX_GRAPH_DEPTH as u64 + 1).rev() {
            deep = EncodedNode::Container {
                id: NodeId(i),
                kind: ContainerKind::Seq,
                items: vec![deep],
            };
        }
        assert!(matches!(
            decode(&deep, &registry()),
            Err(Error::NestingTooDeep { max: MAX_GRAPH_DEPTH, .. })
        ));
    }

    #[test]
    fn test_projected_containers_roundtrip() {
        let original = Value::seq([poly(&[1, 2]), poly(&[3, 4])]);
        let copy = decode(&encode(&original).unwrap(), &registry()).unwrap();

        let items = copy.as_seq().unwrap().to_vec();
        assert_eq!(items[0].as_object().unwrap().downcast_ref::<Poly>().unwrap().xs, vec![1, 2]);
        assert_eq!(items[1].as_object().unwrap().downcast_ref::<Poly>().unwrap().xs, vec![3, 4]);
    }

    #[test]
    fn test_duplicate_map_keys_rejected() {
        let encoded = tree(json!({"$id": 0, "$kind": "map", "items": ["a", 1, "a", 2]}));
        assert!(matches!(
            decode(&encoded, &registry()),
            Err(Error::MalformedNode { .. })
        ));
    }
}
