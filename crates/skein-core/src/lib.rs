//! Skein Core - Identity-preserving object graph codec
//!
//! This crate converts in-memory graphs of typed objects, containers and
//! atomic values into a JSON interchange tree and back, keeping shared
//! references and cycles intact, and provides cycle-safe walk, find,
//! flatten and transform utilities over the same graphs.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod identity;
pub mod json;
pub mod limits;
pub mod node;
pub mod params;
pub mod path;
pub mod registry;
pub mod search;
pub mod transform;
pub mod value;
pub mod walker;

#[cfg(test)]
mod testing;

pub use decoder::decode;
pub use encoder::encode;
pub use error::{Error, Result};
pub use identity::{IdentityRegistry, NodeId, VisitState};
pub use json::{
    access_params, from_json_str, from_json_str_with, parse_tree, to_json_string, to_json_string_pretty,
    update_params, DecodeOptions,
};
pub use node::{Atomic, ContainerKind, EncodedNode, TreeStats};
pub use params::{ParamProjection, Params, ProjectionBase};
pub use path::{Path, PathSegment};
pub use registry::{Factory, TypeRegistry};
pub use search::{find, flatten, instance_of, is_type, Find, Flatten};
pub use transform::{transform, transform_with, TransformMode};
pub use value::{MapRef, ObjectRef, OpaqueRef, SeqRef, SetRef, Value, ValueMap, ValueSet};
pub use walker::{walk, Visit, Walk, WalkEvent, WalkItem, Walker};
