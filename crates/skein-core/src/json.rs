//! JSON text helpers over the encoder and decoder

use crate::decoder::{decode, Decoder};
use crate::encoder::encode;
use crate::error::{Error, Result};
use crate::limits::{nesting_depth, DEFAULT_MAX_NESTING_DEPTH};
use crate::node::EncodedNode;
use crate::params::Params;
use crate::registry::TypeRegistry;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Limits applied when parsing encoded text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Deepest bracket nesting accepted before parsing starts. Values above
    /// `DEFAULT_MAX_NESTING_DEPTH` are capped to it.
    pub max_nesting_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl DecodeOptions {
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}

/// Encode a graph to compact JSON text
pub fn to_json_string(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(&encode(value)?)?)
}

/// Encode a graph to indented JSON text
pub fn to_json_string_pretty(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(&encode(value)?)?)
}

/// Parse encoded text into a tree without decoding it
pub fn parse_tree(text: &str, options: &DecodeOptions) -> Result<EncodedNode> {
    let max = options.max_nesting_depth.min(DEFAULT_MAX_NESTING_DEPTH);
    let depth = nesting_depth(text, max);
    if depth > max {
        return Err(Error::NestingTooDeep { depth, max });
    }

    // Depth is bounded above, so serde_json's own limit is not needed
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let json = serde_json::Value::deserialize(&mut de)?;
    de.end()?;

    EncodedNode::from_json(&json)
}

/// Decode JSON text with default options
pub fn from_json_str(text: &str, registry: &TypeRegistry) -> Result<Value> {
    from_json_str_with(text, registry, &DecodeOptions::default())
}

pub fn from_json_str_with(text: &str, registry: &TypeRegistry, options: &DecodeOptions) -> Result<Value> {
    decode(&parse_tree(text, options)?, registry)
}

/// Decode only the named parameters of the root object.
///
/// References from those parameters into the rest of the tree are resolved.
pub fn access_params<S: AsRef<str>>(
    tree: &EncodedNode,
    registry: &TypeRegistry,
    names: &[S],
) -> Result<Params> {
    let EncodedNode::Object { params, .. } = tree else {
        return Err(Error::malformed("#", "root is not an object"));
    };

    let mut decoder = Decoder::new(tree, registry)?;
    let mut selected = Params::new();
    for name in names {
        let name = name.as_ref();
        let node = params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
            .ok_or_else(|| Error::MissingParam(name.to_string()))?;
        selected.insert(name, decoder.decode_node(node)?);
    }
    Ok(selected)
}

/// Override parameters of the root object and re-encode.
///
/// The tree is decoded, the merged parameters are applied to the root
/// object, and a fresh tree is encoded from the result.
pub fn update_params(tree: &EncodedNode, registry: &TypeRegistry, updates: Params) -> Result<EncodedNode> {
    if !matches!(tree, EncodedNode::Object { .. }) {
        return Err(Error::malformed("#", "root is not an object"));
    }

    let root = decode(tree, registry)?;
    if let Some(object) = root.as_object() {
        let mut params = object.params();
        for (name, value) in updates {
            params.insert(name, value);
        }
        object.apply_params(params)?;
    }
    encode(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{link, node, registry, Circle, Node};

    #[test]
    fn test_text_roundtrip() {
        let value = Value::map([
            (Value::from("a"), Value::from(1)),
            (Value::from("b"), Value::seq([Value::from(1), Value::from(2), Value::from(3)])),
        ]);
        let text = to_json_string(&value).unwrap();

        assert_eq!(
            text,
            r#"{"$id":0,"$kind":"map","items":["a",1,"b",{"$id":1,"$kind":"seq","items":[1,2,3]}]}"#
        );
        assert_eq!(from_json_str(&text, &registry()).unwrap(), value);
        assert!(to_json_string_pretty(&value).unwrap().contains('\n'));
    }

    #[test]
    fn test_nesting_limit() {
        let text = format!("{}1{}", "[".repeat(20), "]".repeat(20));
        let options = DecodeOptions::default().with_max_nesting_depth(10);
        assert!(matches!(
            parse_tree(&text, &options),
            Err(Error::NestingTooDeep { max: 10, .. })
        ));
    }

    #[test]
    fn test_long_chain_beyond_serde_default_limit() {
        let mut head = Value::Null;
        for i in 0..200 {
            head = Value::object(Node {
                label: i.to_string(),
                next: head,
            });
        }
        let text = to_json_string(&head).unwrap();
        let copy = from_json_str(&text, &registry()).unwrap();
        assert_eq!(copy, head);
    }

    #[test]
    fn test_nesting_limit_is_capped() {
        let text = format!("{}1{}", "[".repeat(600), "]".repeat(600));
        let options = DecodeOptions::default().with_max_nesting_depth(100_000);
        assert!(matches!(
            parse_tree(&text, &options),
            Err(Error::NestingTooDeep { max: DEFAULT_MAX_NESTING_DEPTH, .. })
        ));
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(matches!(
            parse_tree("1 2", &DecodeOptions::default()),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_access_params() {
        let shared = Value::seq([Value::from(1)]);
        let root = Value::Object(node("root", Value::seq([shared.clone(), shared])));
        let tree = encode(&root).unwrap();

        let picked = access_params(&tree, &registry(), &["next"]).unwrap();
        let next = picked.get("next").unwrap().as_seq().unwrap().to_vec();
        assert!(next[0].same(&next[1]));
        assert_eq!(picked.len(), 1);

        assert!(matches!(
            access_params(&tree, &registry(), &["missing"]),
            Err(Error::MissingParam(name)) if name == "missing"
        ));
        let not_object = encode(&Value::seq([])).unwrap();
        assert!(matches!(
            access_params(&not_object, &registry(), &["x"]),
            Err(Error::MalformedNode { .. })
        ));
    }

    #[test]
    fn test_update_params() {
        let tree = encode(&Value::object(Circle { radius: 1.0 })).unwrap();
        let updated = update_params(&tree, &registry(), Params::new().with("radius", 4.0)).unwrap();

        let radius = access_params(&updated, &registry(), &["radius"]).unwrap();
        assert_eq!(radius.get("radius"), Some(&Value::from(4.0)));
    }

    #[test]
    fn test_update_params_keeps_cycles() {
        let o = Value::Object(node("o", Value::Null));
        link(&o, o.clone());
        let tree = encode(&o).unwrap();
        let updated = update_params(&tree, &registry(), Params::new().with("label", "renamed")).unwrap();

        assert_eq!(updated.param("next"), Some(&EncodedNode::Ref(crate::identity::NodeId(0))));
        assert_eq!(
            access_params(&updated, &registry(), &["label"]).unwrap().get("label"),
            Some(&Value::from("renamed"))
        );
    }
}
