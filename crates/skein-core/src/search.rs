//! Lazy queries over object graphs

use crate::error::{Error, Result};
use crate::params::ParamProjection;
use crate::value::{ObjectRef, Value};
use crate::walker::{WalkEvent, Walker};

/// Iterator returned by [`find`]
pub struct Find<P> {
    walker: Walker,
    predicate: P,
    deep: bool,
}

impl<P> Iterator for Find<P>
where
    P: FnMut(&Value) -> bool,
{
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            match self.walker.next()? {
                WalkEvent::Leaf { value, .. } => {
                    if (self.predicate)(&value) {
                        return Some(value);
                    }
                }
                WalkEvent::Enter { value, .. } => {
                    if (self.predicate)(&value) {
                        if !self.deep {
                            self.walker.skip_children();
                        }
                        return Some(value);
                    }
                }
                WalkEvent::Revisit { .. } | WalkEvent::Exit { .. } => {}
            }
        }
    }
}

/// Values reachable from `root` (root included) that satisfy `predicate`.
///
/// Each container or object is tested once however often it is shared.
/// With `deep = false` the subtree of a match is not searched, so matches
/// nested inside another match are not reported.
pub fn find<P>(root: &Value, predicate: P, deep: bool) -> Find<P>
where
    P: FnMut(&Value) -> bool,
{
    Find {
        walker: Walker::new(root),
        predicate,
        deep,
    }
}

/// Iterator returned by [`flatten`]
pub struct Flatten {
    walker: Walker,
}

impl Iterator for Flatten {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            match self.walker.next()? {
                WalkEvent::Leaf { value, .. } => return Some(value),
                WalkEvent::Enter { value, .. } if value.is_object() => {
                    self.walker.skip_children();
                    return Some(value);
                }
                _ => {}
            }
        }
    }
}

/// Non-container values inside nested containers, in traversal order.
///
/// Typed objects are yielded but not entered; mapping keys and values are
/// both traversed. Fails with `NotAContainer` unless `root` is a sequence,
/// set or mapping.
pub fn flatten(root: &Value) -> Result<Flatten> {
    if !root.is_container() {
        return Err(Error::NotAContainer(root.kind_name()));
    }
    Ok(Flatten {
        walker: Walker::new(root),
    })
}

/// Predicate matching typed objects with the given tag
pub fn is_type(tag: impl Into<String>) -> impl Fn(&Value) -> bool {
    let tag = tag.into();
    move |value: &Value| value.as_object().is_some_and(|o| o.has_type_tag(&tag))
}

/// Predicate matching typed objects of concrete type `T`
pub fn instance_of<T: ParamProjection>() -> impl Fn(&Value) -> bool {
    |value: &Value| value.as_object().is_some_and(ObjectRef::is::<T>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{link, node, Circle, Node};

    #[test]
    fn test_find_shallow_stops_at_first_match() {
        let inner = Value::Object(node("inner", Value::Null));
        let outer = Value::Object(node("outer", inner));
        let root = Value::seq([outer.clone()]);

        let found: Vec<Value> = find(&root, instance_of::<Node>(), false).collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].same(&outer));

        let all: Vec<Value> = find(&root, is_type("test.Node"), true).collect();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_find_reports_shared_once_and_survives_cycles() {
        let c = Value::object(Circle { radius: 1.0 });
        let a = Value::Object(node("a", Value::Null));
        link(&a, Value::seq([c.clone(), c.clone(), a.clone()]));

        let circles: Vec<Value> = find(&a, instance_of::<Circle>(), true).collect();
        assert_eq!(circles.len(), 1);
        assert!(circles[0].same(&c));

        let nodes: Vec<Value> = find(&a, instance_of::<Node>(), true).collect();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_find_atomics() {
        let root = Value::seq([Value::from(1), Value::from("x"), Value::from(2)]);
        let ints: Vec<Value> = find(&root, |v: &Value| v.as_int().is_some(), true).collect();
        assert_eq!(ints, vec![Value::from(1), Value::from(2)]);
    }

    #[test]
    fn test_find_is_lazy() {
        let root = Value::seq((0..1000).map(Value::from));
        let mut seen = 0;
        let first = find(
            &root,
            |v: &Value| {
                seen += 1;
                v.as_int() == Some(3)
            },
            true,
        )
        .next();

        assert_eq!(first, Some(Value::from(3)));
        assert_eq!(seen, 5);
    }

    #[test]
    fn test_flatten() {
        let circle = Value::object(Circle { radius: 1.0 });
        let shared = Value::seq([Value::from(2)]);
        let root = Value::seq([
            Value::from(1),
            shared.clone(),
            Value::map([(Value::from("k"), circle.clone())]),
            shared,
        ]);

        let flat: Vec<Value> = flatten(&root).unwrap().collect();
        assert_eq!(flat.len(), 4);
        assert_eq!(flat[0], Value::from(1));
        assert_eq!(flat[1], Value::from(2));
        assert_eq!(flat[2], Value::from("k"));
        assert!(flat[3].same(&circle));
    }

    #[test]
    fn test_flatten_rejects_non_container() {
        assert!(matches!(flatten(&Value::from(3)), Err(Error::NotAContainer("int"))));
        assert!(matches!(
            flatten(&Value::object(Circle::default())),
            Err(Error::NotAContainer("object"))
        ));
    }
}
