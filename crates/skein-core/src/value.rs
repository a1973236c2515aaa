//! In-memory object graph values
//!
//! Atomic values are held inline. Sequences, sets, mappings and typed
//! objects are shared handles (`Rc<RefCell<..>>`), so the same instance can
//! appear at several places in a graph and graphs may contain cycles.
//! Identity is the address of the shared allocation.

use crate::error::Result;
use crate::identity::Identity;
use crate::params::{ParamProjection, Params};
use crate::path::PathSegment;
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A node of an object graph
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(SeqRef),
    Set(SetRef),
    Map(MapRef),
    Object(ObjectRef),
    /// Foreign value with no projection; walked as a leaf, never encoded
    Opaque(OpaqueRef),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn seq(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Seq(SeqRef::from_vec(items.into_iter().collect()))
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(SetRef::from_set(items.into_iter().collect()))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::Map(MapRef::from_map(entries.into_iter().collect()))
    }

    pub fn object<T: ParamProjection>(object: T) -> Self {
        Self::Object(ObjectRef::new(object))
    }

    pub fn opaque<T: Any>(value: T) -> Self {
        Self::Opaque(OpaqueRef::new(value))
    }

    /// Short name of the variant, used in messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Seq(_) => "seq",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
            Self::Opaque(_) => "opaque",
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_)
        )
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Seq(_) | Self::Set(_) | Self::Map(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Containers and typed objects: the values that receive ids
    pub fn is_composite(&self) -> bool {
        self.is_container() || self.is_object()
    }

    /// Reference identity of shared values; `None` for atomics
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Self::Seq(s) => Some(s.identity()),
            Self::Set(s) => Some(s.identity()),
            Self::Map(m) => Some(m.identity()),
            Self::Object(o) => Some(o.identity()),
            Self::Opaque(o) => Some(o.identity()),
            _ => None,
        }
    }

    /// True when both values are the same shared instance
    pub fn same(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Type tag of a typed object
    pub fn type_tag(&self) -> Option<String> {
        self.as_object().map(ObjectRef::type_tag)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float value; integers widen
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&SeqRef> {
        match self {
            Self::Seq(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetRef> {
        match self {
            Self::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&OpaqueRef> {
        match self {
            Self::Opaque(o) => Some(o),
            _ => None,
        }
    }

    /// Direct children with their path segments, in traversal order.
    ///
    /// Mapping entries yield key then value; objects yield their projection.
    pub(crate) fn children(&self) -> Vec<(PathSegment, Value)> {
        match self {
            Self::Seq(s) => s
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, v)| (PathSegment::Index(i), v.clone()))
                .collect(),
            Self::Set(s) => s
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, v)| (PathSegment::Index(i), v.clone()))
                .collect(),
            Self::Map(m) => m
                .borrow()
                .iter()
                .enumerate()
                .flat_map(|(i, (k, v))| {
                    [
                        (PathSegment::MapKey(i), k.clone()),
                        (PathSegment::MapValue(i), v.clone()),
                    ]
                })
                .collect(),
            Self::Object(o) => o
                .params()
                .into_iter()
                .map(|(name, v)| (PathSegment::Param(name), v))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<SeqRef> for Value {
    fn from(s: SeqRef) -> Self {
        Self::Seq(s)
    }
}

impl From<SetRef> for Value {
    fn from(s: SetRef) -> Self {
        Self::Set(s)
    }
}

impl From<MapRef> for Value {
    fn from(m: MapRef) -> Self {
        Self::Map(m)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Self::Object(o)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared handles
// ─────────────────────────────────────────────────────────────────────────────

/// Shared ordered sequence
#[derive(Clone, Default)]
pub struct SeqRef(Rc<RefCell<Vec<Value>>>);

impl SeqRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Replace the element at `index`; returns false when out of bounds
    pub fn set(&self, index: usize, value: impl Into<Value>) -> bool {
        match self.0.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Snapshot of the current elements
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.borrow_mut()
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Rc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &SeqRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Shared set of unique members
#[derive(Clone, Default)]
pub struct SetRef(Rc<RefCell<ValueSet>>);

impl SetRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_set(set: ValueSet) -> Self {
        Self(Rc::new(RefCell::new(set)))
    }

    /// Insert a member; returns false if it was already present
    pub fn insert(&self, value: impl Into<Value>) -> bool {
        self.0.borrow_mut().insert(value.into())
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.borrow().contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().iter().cloned().collect()
    }

    pub fn borrow(&self) -> Ref<'_, ValueSet> {
        self.0.borrow()
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Rc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &SetRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Shared insertion-ordered mapping
#[derive(Clone, Default)]
pub struct MapRef(Rc<RefCell<ValueMap>>);

impl MapRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: ValueMap) -> Self {
        Self(Rc::new(RefCell::new(map)))
    }

    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value.into())
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Snapshot of the current entries
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0.borrow().iter().cloned().collect()
    }

    pub fn borrow(&self) -> Ref<'_, ValueMap> {
        self.0.borrow()
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Rc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Shared typed object exposing a parameter projection
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Box<dyn ParamProjection>>>);

impl ObjectRef {
    pub fn new<T: ParamProjection>(object: T) -> Self {
        Self::from_box(Box::new(object))
    }

    pub fn from_box(object: Box<dyn ParamProjection>) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    pub fn type_tag(&self) -> String {
        self.0.borrow().type_tag().to_string()
    }

    pub fn has_type_tag(&self, tag: &str) -> bool {
        self.0.borrow().type_tag() == tag
    }

    pub fn params(&self) -> Params {
        self.0.borrow().params()
    }

    pub fn apply_params(&self, params: Params) -> Result<()> {
        self.0.borrow_mut().apply_params(params)
    }

    pub fn essential_params(&self) -> Params {
        let object = self.0.borrow();
        object.params().select(object.essential_param_names().as_slice())
    }

    /// Parameters not named essential by the object
    pub fn auxiliary_params(&self) -> Params {
        let object = self.0.borrow();
        let essential = object.essential_param_names();
        object
            .params()
            .into_iter()
            .filter(|(name, _)| !essential.contains(name))
            .collect()
    }

    /// Independent copy of the underlying object (children still shared)
    pub fn duplicate(&self) -> Box<dyn ParamProjection> {
        let object = self.0.borrow();
        let projection: &dyn ParamProjection = &**object;
        projection.clone_projection()
    }

    pub fn is<T: ParamProjection>(&self) -> bool {
        let object = self.0.borrow();
        let projection: &dyn ParamProjection = &**object;
        projection.as_any().is::<T>()
    }

    pub fn downcast_ref<T: ParamProjection>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.0.borrow(), |object| {
            let projection: &dyn ParamProjection = &**object;
            projection.as_any().downcast_ref::<T>()
        })
        .ok()
    }

    pub fn downcast_mut<T: ParamProjection>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.0.borrow_mut(), |object| {
            let projection: &mut dyn ParamProjection = &mut **object;
            projection.as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Rc::as_ptr(&self.0))
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Shared foreign value
#[derive(Clone)]
pub struct OpaqueRef {
    inner: Rc<dyn Any>,
    type_name: &'static str,
}

impl OpaqueRef {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            inner: Rc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn identity(&self) -> Identity {
        Identity::of(Rc::as_ptr(&self.inner))
    }

    pub fn ptr_eq(&self, other: &OpaqueRef) -> bool {
        self.identity() == other.identity()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyed collections
// ─────────────────────────────────────────────────────────────────────────────

/// Hash key for mapping keys and set members.
///
/// Atomics compare by value (floats by normalised bit pattern), shared
/// values by identity.
#[derive(Clone)]
struct Key(Value);

fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_bits(*a) == float_bits(*b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (a, b) => a.same(b),
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&self.0).hash(state);
        match &self.0 {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => float_bits(*f).hash(state),
            Value::Str(s) => s.hash(state),
            other => other.identity().hash(state),
        }
    }
}

/// Insertion-ordered mapping with unique keys
#[derive(Clone, Default)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
    index: HashMap<Key, usize>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced key keeps its position
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.index.get(&Key(key.clone())) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.index.insert(Key(key.clone()), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.index
            .get(&Key(key.clone()))
            .map(|&pos| &self.entries[pos].1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.index.contains_key(&Key(key.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Value, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Set of unique members; insertion order is kept for deterministic output
#[derive(Clone, Default)]
pub struct ValueSet {
    items: Vec<Value>,
    index: HashSet<Key>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: Value) -> bool {
        if !self.index.insert(Key(value.clone())) {
            return false;
        }
        self.items.push(value);
        true
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.index.contains(&Key(value.clone()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = ValueSet::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Structural equality
// ─────────────────────────────────────────────────────────────────────────────

/// Cycle-safe deep comparison.
///
/// A pair of handles already under comparison is assumed equal, so two
/// cyclic graphs with the same shape compare equal. Every compared handle is
/// held until the comparison ends, since projections may hand out fresh
/// containers whose addresses would otherwise be reused.
#[derive(Default)]
struct DeepEq {
    assumed: HashSet<(Identity, Identity)>,
    // Insertion order of `assumed`, for rolling back failed trials
    journal: Vec<(Identity, Identity)>,
    held: Vec<Value>,
}

impl DeepEq {
    fn eq(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::Opaque(x), Value::Opaque(y)) => x.ptr_eq(y),
            _ => self.eq_shared(a, b),
        }
    }

    fn eq_shared(&mut self, a: &Value, b: &Value) -> bool {
        let (ia, ib) = match (a.identity(), b.identity()) {
            (Some(ia), Some(ib)) => (ia, ib),
            _ => return false,
        };
        if ia == ib || !self.assumed.insert((ia, ib)) {
            return true;
        }
        self.journal.push((ia, ib));
        self.held.push(a.clone());
        self.held.push(b.clone());

        match (a, b) {
            (Value::Seq(x), Value::Seq(y)) => {
                let (xs, ys) = (x.to_vec(), y.to_vec());
                xs.len() == ys.len() && xs.iter().zip(&ys).all(|(p, q)| self.eq(p, q))
            }
            (Value::Map(x), Value::Map(y)) => {
                let (xs, ys) = (x.entries(), y.entries());
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(&ys)
                        .all(|((k1, v1), (k2, v2))| self.eq(k1, k2) && self.eq(v1, v2))
            }
            (Value::Set(x), Value::Set(y)) => {
                let (xs, ys) = (x.to_vec(), y.to_vec());
                xs.len() == ys.len() && self.perfect_matching(&xs, &ys)
            }
            (Value::Object(x), Value::Object(y)) => {
                if x.type_tag() != y.type_tag() {
                    return false;
                }
                let (px, py) = (x.params(), y.params());
                px.len() == py.len()
                    && px
                        .iter()
                        .zip(py.iter())
                        .all(|((n1, v1), (n2, v2))| n1 == n2 && self.eq(v1, v2))
            }
            _ => false,
        }
    }

    /// Compare without keeping the assumptions the comparison made
    fn trial(&mut self, a: &Value, b: &Value) -> bool {
        let mark = self.journal.len();
        let equal = self.eq(a, b);
        for pair in self.journal.drain(mark..) {
            self.assumed.remove(&pair);
        }
        equal
    }

    /// Whether every member of `xs` pairs with a distinct equal member of `ys`
    fn perfect_matching(&mut self, xs: &[Value], ys: &[Value]) -> bool {
        let mut fits: Vec<Vec<usize>> = Vec::with_capacity(xs.len());
        for x in xs {
            let mut row = Vec::new();
            for (j, y) in ys.iter().enumerate() {
                if self.trial(x, y) {
                    row.push(j);
                }
            }
            fits.push(row);
        }

        // Augmenting paths over the candidate lists
        let mut owner: Vec<Option<usize>> = vec![None; ys.len()];
        (0..xs.len()).all(|i| {
            let mut seen = vec![false; ys.len()];
            augment(i, &fits, &mut owner, &mut seen)
        })
    }
}

fn augment(i: usize, fits: &[Vec<usize>], owner: &mut [Option<usize>], seen: &mut [bool]) -> bool {
    for &j in &fits[i] {
        if seen[j] {
            continue;
        }
        seen[j] = true;
        let free = match owner[j] {
            None => true,
            Some(other) => augment(other, fits, owner, seen),
        };
        if free {
            owner[j] = Some(i);
            return true;
        }
    }
    false
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        DeepEq::default().eq(self, other)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Debug
// ─────────────────────────────────────────────────────────────────────────────

thread_local! {
    static PRINTING: RefCell<HashSet<Identity>> = RefCell::new(HashSet::new());
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "{:?}", b),
            Self::Int(i) => write!(f, "{:?}", i),
            Self::Float(x) => write!(f, "{:?}", x),
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Opaque(o) => write!(f, "Opaque({})", o.type_name()),
            shared => {
                let Some(identity) = shared.identity() else {
                    return Ok(());
                };
                if !PRINTING.with(|p| p.borrow_mut().insert(identity)) {
                    return write!(f, "<cycle>");
                }
                let result = match shared {
                    Self::Seq(s) => f.debug_list().entries(s.to_vec()).finish(),
                    Self::Set(s) => f.debug_set().entries(s.to_vec()).finish(),
                    Self::Map(m) => f.debug_map().entries(m.entries()).finish(),
                    Self::Object(o) => {
                        let tag = o.type_tag();
                        let params = o.params();
                        let mut out = f.debug_struct(&tag);
                        for (name, value) in params.iter() {
                            out.field(name, value);
                        }
                        out.finish()
                    }
                    _ => Ok(()),
                };
                PRINTING.with(|p| p.borrow_mut().remove(&identity));
                result
            }
        }
    }
}

macro_rules! debug_via_value {
    ($($handle:ty => $variant:ident),* $(,)?) => {
        $(
            impl fmt::Debug for $handle {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Debug::fmt(&Value::$variant(self.clone()), f)
                }
            }
        )*
    };
}

debug_via_value!(SeqRef => Seq, SetRef => Set, MapRef => Map, ObjectRef => Object, OpaqueRef => Opaque);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{node, poly, Node};

    #[test]
    fn test_map_preserves_insertion_order_and_unique_keys() {
        let map = MapRef::new();
        map.insert("b", 1);
        map.insert("a", 2);
        map.insert("b", 3);

        assert_eq!(map.keys(), vec![Value::from("b"), Value::from("a")]);
        assert_eq!(map.get(&Value::from("b")), Some(Value::from(3)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_keys_hash_shared_values_by_identity() {
        let first = Value::seq([Value::from(1)]);
        let twin = Value::seq([Value::from(1)]);
        let set = SetRef::new();

        assert!(set.insert(first.clone()));
        assert!(!set.insert(first.clone()));
        assert!(set.insert(twin));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_float_keys_normalise_zero() {
        let set = SetRef::new();
        set.insert(0.0);
        assert!(!set.insert(-0.0));
        assert!(set.insert(Value::Int(0)));
    }

    #[test]
    fn test_deep_eq() {
        let a = Value::map([(Value::from("xs"), Value::seq([Value::from(1), Value::from(2.5)]))]);
        let b = Value::map([(Value::from("xs"), Value::seq([Value::from(1), Value::from(2.5)]))]);
        let c = Value::map([(Value::from("xs"), Value::seq([Value::from(1)]))]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let a = Value::set([Value::from(1), Value::from("x"), Value::seq([])]);
        let b = Value::set([Value::seq([]), Value::from("x"), Value::from(1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_set_equality_pairs_members_one_to_one() {
        let a = Value::set([Value::seq([]), Value::seq([])]);
        let b = Value::set([Value::seq([]), Value::seq([Value::from(1)])]);
        assert_ne!(a, b);
        assert_ne!(b, a);
        assert_eq!(a, Value::set([Value::seq([]), Value::seq([])]));
    }

    #[test]
    fn test_deep_eq_with_projected_containers() {
        let a = Value::seq([poly(&[1]), poly(&[1])]);
        let b = Value::seq([poly(&[1]), poly(&[2])]);
        assert_ne!(a, b);
        assert_eq!(a, Value::seq([poly(&[1]), poly(&[1])]));
    }

    #[test]
    fn test_deep_eq_on_cycles_terminates() {
        let a = Value::Object(node("loop", Value::Null));
        crate::testing::link(&a, a.clone());
        let b = Value::Object(node("loop", Value::Null));
        crate::testing::link(&b, b.clone());

        assert_eq!(a, b);
        assert!(format!("{:?}", a).contains("<cycle>"));
    }

    #[test]
    fn test_object_downcast() {
        let object = node("n", Value::from(3));
        assert!(object.is::<Node>());
        assert_eq!(object.downcast_ref::<Node>().unwrap().label, "n");

        object.downcast_mut::<Node>().unwrap().label = "renamed".into();
        assert_eq!(object.params().get("label"), Some(&Value::from("renamed")));
    }

    #[test]
    fn test_opaque_is_shared_by_identity() {
        let handle = Value::opaque(std::time::Duration::from_secs(1));
        assert_eq!(handle, handle.clone());
        assert_ne!(handle, Value::opaque(std::time::Duration::from_secs(1)));
        assert!(handle.as_opaque().unwrap().downcast_ref::<std::time::Duration>().is_some());
    }
}
