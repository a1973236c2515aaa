//! Encoded interchange tree
//!
//! ```text
//! Node      := Atomic | Ref | Container | Object
//! Ref       := { "$ref": <id> }
//! Container := { "$id": <id>, "$kind": "seq" | "set" | "map", "items": [Node...] }
//! Object    := { "$id": <id>, "$type": <string>, "params": { <name>: Node, ... } }
//! ```
//!
//! Map containers store their entries in `items` as alternating key, value.

use crate::error::{Error, Result};
use crate::identity::NodeId;
use crate::limits::MAX_GRAPH_DEPTH;
use crate::value::{Value, ValueSet};
use serde::ser::{Error as _, SerializeMap, Serializer};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

const REF: &str = "$ref";
const ID: &str = "$id";
const KIND: &str = "$kind";
const TYPE: &str = "$type";
const ITEMS: &str = "items";
const PARAMS: &str = "params";

/// Scalar rendered inline as a native JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Atomic {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Atomic {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Float(f) => Value::Float(*f),
            Self::Str(s) => Value::Str(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Seq,
    Set,
    Map,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seq => "seq",
            Self::Set => "set",
            Self::Map => "map",
        }
    }
}

impl std::str::FromStr for ContainerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "seq" => Ok(Self::Seq),
            "set" => Ok(Self::Set),
            "map" => Ok(Self::Map),
            other => Err(format!("unknown container kind {:?}", other)),
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the interchange tree
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedNode {
    Atomic(Atomic),
    Ref(NodeId),
    Container {
        id: NodeId,
        kind: ContainerKind,
        items: Vec<EncodedNode>,
    },
    Object {
        id: NodeId,
        type_tag: String,
        params: Vec<(String, EncodedNode)>,
    },
}

impl EncodedNode {
    /// Id defined by this node, if it is a container or object
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Self::Container { id, .. } | Self::Object { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref(_))
    }

    /// Encoded parameter by name, for object nodes
    pub fn param(&self, name: &str) -> Option<&EncodedNode> {
        match self {
            Self::Object { params, .. } => params.iter().find(|(n, _)| n == name).map(|(_, p)| p),
            _ => None,
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = (String, &EncodedNode)> + '_> {
        match self {
            Self::Container { items, .. } => Box::new(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (format!("{}/{}", ITEMS, i), item)),
            ),
            Self::Object { params, .. } => Box::new(
                params
                    .iter()
                    .map(|(name, p)| (format!("{}/{}", PARAMS, escape_pointer(name)), p)),
            ),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Index of every definition by id, with its location.
    ///
    /// Fails with `MalformedNode` on a duplicated id, an odd-length map or a
    /// repeated map key, and with `DanglingReference` on a reference to an
    /// undefined id.
    pub fn definitions(&self) -> Result<HashMap<NodeId, &EncodedNode>> {
        let mut defined: HashMap<NodeId, &EncodedNode> = HashMap::new();
        let mut refs: Vec<NodeId> = Vec::new();
        let mut stack: Vec<(String, &EncodedNode)> = vec![("#".to_string(), self)];

        while let Some((location, node)) = stack.pop() {
            match node {
                Self::Ref(id) => refs.push(*id),
                Self::Container {
                    kind: ContainerKind::Map,
                    items,
                    ..
                } => check_map_items(items, &location)?,
                _ => {}
            }
            if let Some(id) = node.id() {
                if defined.insert(id, node).is_some() {
                    return Err(Error::malformed(
                        location,
                        format!("duplicate definition of id {}", id),
                    ));
                }
            }
            // Reverse so the first child is examined first
            let children: Vec<_> = node
                .children()
                .map(|(step, child)| (format!("{}/{}", location, step), child))
                .collect();
            stack.extend(children.into_iter().rev());
        }

        if let Some(missing) = refs.into_iter().find(|id| !defined.contains_key(id)) {
            return Err(Error::DanglingReference(missing.0));
        }
        Ok(defined)
    }

    /// Structural validation without decoding
    pub fn validate(&self) -> Result<()> {
        self.definitions().map(|_| ())
    }

    /// Summary counts over the tree
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut stack: Vec<(&EncodedNode, usize)> = vec![(self, 1)];

        while let Some((node, depth)) = stack.pop() {
            stats.max_depth = stats.max_depth.max(depth);
            match node {
                Self::Atomic(_) => stats.atomics += 1,
                Self::Ref(_) => stats.references += 1,
                Self::Container { kind, .. } => {
                    stats.definitions += 1;
                    match kind {
                        ContainerKind::Seq => stats.sequences += 1,
                        ContainerKind::Set => stats.sets += 1,
                        ContainerKind::Map => stats.maps += 1,
                    }
                }
                Self::Object { type_tag, .. } => {
                    stats.definitions += 1;
                    stats.objects += 1;
                    *stats.types.entry(type_tag.clone()).or_default() += 1;
                }
            }
            stack.extend(node.children().map(|(_, child)| (child, depth + 1)));
        }
        stats
    }

    /// Parse a JSON document into a tree, rejecting anything that does not
    /// match the interchange grammar exactly
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        parse_node(json, "#", 0)
    }
}

/// Counts gathered by [`EncodedNode::stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub definitions: usize,
    pub references: usize,
    pub atomics: usize,
    pub sequences: usize,
    pub sets: usize,
    pub maps: usize,
    pub objects: usize,
    pub max_depth: usize,
    pub types: BTreeMap<String, usize>,
}

fn escape_pointer(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

/// Map items alternate key and value, and no key repeats: atomics by value,
/// definitions and references by id
fn check_map_items(items: &[EncodedNode], location: &str) -> Result<()> {
    if items.len() % 2 != 0 {
        return Err(Error::malformed(location, "map items must alternate key and value"));
    }
    let mut atomics = ValueSet::new();
    let mut ids = HashSet::new();
    for (index, key) in items.iter().enumerate().step_by(2) {
        let fresh = match key {
            EncodedNode::Atomic(atomic) => atomics.insert(atomic.to_value()),
            EncodedNode::Ref(id) => ids.insert(*id),
            EncodedNode::Container { id, .. } | EncodedNode::Object { id, .. } => ids.insert(*id),
        };
        if !fresh {
            return Err(Error::malformed(
                format!("{}/{}/{}", location, ITEMS, index),
                "duplicate map key",
            ));
        }
    }
    Ok(())
}

/// `depth` counts the definitions enclosing `json`
fn parse_node(json: &serde_json::Value, location: &str, depth: usize) -> Result<EncodedNode> {
    use serde_json::Value as Json;

    match json {
        Json::Null => Ok(EncodedNode::Atomic(Atomic::Null)),
        Json::Bool(b) => Ok(EncodedNode::Atomic(Atomic::Bool(*b))),
        Json::String(s) => Ok(EncodedNode::Atomic(Atomic::Str(s.clone()))),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(EncodedNode::Atomic(Atomic::Int(i)))
            } else if n.is_u64() {
                Err(Error::malformed(location, format!("integer {} out of range", n)))
            } else {
                n.as_f64()
                    .map(|f| EncodedNode::Atomic(Atomic::Float(f)))
                    .ok_or_else(|| Error::malformed(location, format!("unsupported number {}", n)))
            }
        }
        Json::Array(_) => Err(Error::malformed(
            location,
            "bare array; containers must carry $id and $kind",
        )),
        Json::Object(fields) => {
            if let Some(target) = fields.get(REF) {
                expect_keys(fields, &[REF], location)?;
                return Ok(EncodedNode::Ref(parse_id(target, location)?));
            }
            let id = fields
                .get(ID)
                .ok_or_else(|| Error::malformed(location, "object without $ref or $id"))
                .and_then(|id| parse_id(id, location))?;
            let depth = depth + 1;
            if depth > MAX_GRAPH_DEPTH {
                return Err(Error::NestingTooDeep {
                    depth,
                    max: MAX_GRAPH_DEPTH,
                });
            }

            if let Some(kind) = fields.get(KIND) {
                expect_keys(fields, &[ID, KIND, ITEMS], location)?;
                let kind: ContainerKind = kind
                    .as_str()
                    .ok_or_else(|| Error::malformed(location, "$kind must be a string"))?
                    .parse()
                    .map_err(|reason: String| Error::malformed(location, reason))?;
                let items = fields
                    .get(ITEMS)
                    .and_then(Json::as_array)
                    .ok_or_else(|| Error::malformed(location, "items must be an array"))?;
                let items = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| parse_node(item, &format!("{}/{}/{}", location, ITEMS, i), depth))
                    .collect::<Result<Vec<_>>>()?;
                if kind == ContainerKind::Map {
                    check_map_items(&items, location)?;
                }
                Ok(EncodedNode::Container { id, kind, items })
            } else if let Some(type_tag) = fields.get(TYPE) {
                expect_keys(fields, &[ID, TYPE, PARAMS], location)?;
                let type_tag = type_tag
                    .as_str()
                    .ok_or_else(|| Error::malformed(location, "$type must be a string"))?
                    .to_string();
                let params = fields
                    .get(PARAMS)
                    .and_then(Json::as_object)
                    .ok_or_else(|| Error::malformed(location, "params must be an object"))?
                    .iter()
                    .map(|(name, p)| {
                        let at = format!("{}/{}/{}", location, PARAMS, escape_pointer(name));
                        Ok((name.clone(), parse_node(p, &at, depth)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(EncodedNode::Object { id, type_tag, params })
            } else {
                Err(Error::malformed(location, "definition without $kind or $type"))
            }
        }
    }
}

fn parse_id(json: &serde_json::Value, location: &str) -> Result<NodeId> {
    json.as_u64()
        .map(NodeId)
        .ok_or_else(|| Error::malformed(location, format!("id must be a non-negative integer, got {}", json)))
}

fn expect_keys(
    fields: &serde_json::Map<String, serde_json::Value>,
    allowed: &[&str],
    location: &str,
) -> Result<()> {
    if let Some(extra) = fields.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(Error::malformed(location, format!("unexpected key {:?}", extra)));
    }
    if let Some(missing) = allowed.iter().find(|k| !fields.contains_key(**k)) {
        return Err(Error::malformed(location, format!("missing key {:?}", missing)));
    }
    Ok(())
}

impl Serialize for Atomic {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Str(s) => serializer.serialize_str(s),
        }
    }
}

/// Node plus the number of definitions enclosing it, so serialization stops
/// at `MAX_GRAPH_DEPTH` instead of recursing without bound
struct Nested<'a> {
    node: &'a EncodedNode,
    depth: usize,
}

struct Items<'a> {
    items: &'a [EncodedNode],
    depth: usize,
}

struct ParamsMap<'a> {
    params: &'a [(String, EncodedNode)],
    depth: usize,
}

impl Serialize for Items<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter().map(|node| Nested {
            node,
            depth: self.depth,
        }))
    }
}

impl Serialize for ParamsMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.params.iter().map(|(name, node)| {
            (
                name,
                Nested {
                    node,
                    depth: self.depth,
                },
            )
        }))
    }
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let depth = self.depth + 1;
        if self.node.id().is_some() && depth > MAX_GRAPH_DEPTH {
            return Err(S::Error::custom(Error::NestingTooDeep {
                depth,
                max: MAX_GRAPH_DEPTH,
            }));
        }

        match self.node {
            EncodedNode::Atomic(atomic) => atomic.serialize(serializer),
            EncodedNode::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(REF, id)?;
                map.end()
            }
            EncodedNode::Container { id, kind, items } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry(ID, id)?;
                map.serialize_entry(KIND, kind)?;
                map.serialize_entry(ITEMS, &Items { items, depth })?;
                map.end()
            }
            EncodedNode::Object { id, type_tag, params } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry(ID, id)?;
                map.serialize_entry(TYPE, type_tag)?;
                map.serialize_entry(PARAMS, &ParamsMap { params, depth })?;
                map.end()
            }
        }
    }
}

impl Serialize for EncodedNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Nested { node: self, depth: 0 }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EncodedNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        EncodedNode::from_json(&json).map_err(serde::de::Error::custom)
    }
}
