//! Typed objects shared by unit tests

use crate::error::Result;
use crate::params::{ParamProjection, Params};
use crate::registry::TypeRegistry;
use crate::value::{ObjectRef, Value};

/// Linked node: a label plus an arbitrary successor
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub label: String,
    pub next: Value,
}

impl ParamProjection for Node {
    fn type_tag(&self) -> &str {
        "test.Node"
    }

    fn params(&self) -> Params {
        Params::new()
            .with("label", self.label.clone())
            .with("next", self.next.clone())
    }

    fn apply_params(&mut self, mut params: Params) -> Result<()> {
        self.label = params.take_as("label", "str", |v| v.as_str().map(str::to_owned))?;
        self.next = params.take("next").unwrap_or_default();
        Ok(())
    }

    fn essential_param_names(&self) -> Vec<String> {
        vec!["label".to_string()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct Circle {
    pub radius: f64,
}

impl ParamProjection for Circle {
    fn type_tag(&self) -> &str {
        "test.Circle"
    }

    fn params(&self) -> Params {
        Params::new().with("radius", self.radius)
    }

    fn apply_params(&mut self, mut params: Params) -> Result<()> {
        self.radius = params.take_as("radius", "float", Value::as_float)?;
        Ok(())
    }
}

/// Projects its plain vector as a fresh sequence on every `params()` call
#[derive(Debug, Clone, Default)]
pub struct Poly {
    pub xs: Vec<i64>,
}

impl ParamProjection for Poly {
    fn type_tag(&self) -> &str {
        "test.Poly"
    }

    fn params(&self) -> Params {
        Params::new().with("xs", Value::seq(self.xs.iter().map(|x| Value::from(*x))))
    }

    fn apply_params(&mut self, mut params: Params) -> Result<()> {
        self.xs = params.take_as("xs", "seq of ints", |v| {
            v.as_seq()
                .map(|seq| seq.to_vec().iter().filter_map(Value::as_int).collect())
        })?;
        Ok(())
    }
}

pub fn poly(xs: &[i64]) -> Value {
    Value::object(Poly { xs: xs.to_vec() })
}

/// Built only from complete parameters, so it cannot sit on a cycle
#[derive(Debug, Clone)]
pub struct Pair {
    pub left: Value,
    pub right: Value,
}

impl Pair {
    pub fn from_params(mut params: Params) -> Result<Self> {
        Ok(Self {
            left: params.take_required("left")?,
            right: params.take_required("right")?,
        })
    }
}

impl ParamProjection for Pair {
    fn type_tag(&self) -> &str {
        "test.Pair"
    }

    fn params(&self) -> Params {
        Params::new()
            .with("left", self.left.clone())
            .with("right", self.right.clone())
    }

    fn apply_params(&mut self, params: Params) -> Result<()> {
        *self = Self::from_params(params)?;
        Ok(())
    }
}

pub fn node(label: &str, next: Value) -> ObjectRef {
    ObjectRef::new(Node {
        label: label.to_string(),
        next,
    })
}

/// Point a node's successor at `next`
pub fn link(node: &Value, next: Value) {
    if let Some(mut n) = node.as_object().and_then(|o| o.downcast_mut::<Node>()) {
        n.next = next;
    }
}

/// `depth` nested sequences, each holding its index and the next one
pub fn chain(depth: usize) -> Value {
    let mut head = Value::Null;
    for i in (0..depth).rev() {
        head = Value::seq([Value::from(i as i64), head]);
    }
    head
}

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<Node>().unwrap();
    registry.register::<Circle>().unwrap();
    registry.register::<Poly>().unwrap();
    registry
        .register_constructor("test.Pair", |params| {
            Ok(Box::new(Pair::from_params(params)?) as Box<dyn ParamProjection>)
        })
        .unwrap();
    registry
}
