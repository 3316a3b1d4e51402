//! Decoded values.
//!
//! A [`Value`] pairs a payload with the type it was decoded as. Containers
//! hold child values; `Unknown` and `Null` are payload markers valid for any
//! type.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use crate::model::{Number, Type};

/// The payload of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Value not yet determined. Distinct from null and from absence.
    Unknown,
    Null,
    String(String),
    Number(Number),
    Bool(bool),
    /// Elements of a List, Set or Tuple.
    Seq(Vec<Value>),
    /// Entries of a Map or attributes of an Object.
    Map(BTreeMap<String, Value>),
}

/// A typed value.
///
/// Concrete values are tagged with their resolved type, never with
/// [`Type::Dynamic`]. The only values that may carry `Dynamic` are nulls and
/// unknowns decoded where no concrete type was available.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    ty: Type,
    kind: ValueKind,
}

impl Value {
    pub fn unknown(ty: Type) -> Value {
        Value { ty, kind: ValueKind::Unknown }
    }

    pub fn null(ty: Type) -> Value {
        Value { ty, kind: ValueKind::Null }
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value { ty: Type::String, kind: ValueKind::String(s.into()) }
    }

    pub fn number(n: impl Into<Number>) -> Value {
        Value { ty: Type::Number, kind: ValueKind::Number(n.into()) }
    }

    pub fn bool(b: bool) -> Value {
        Value { ty: Type::Bool, kind: ValueKind::Bool(b) }
    }

    /// Builds a list. Element values are expected to conform to `elem`.
    pub fn list(elem: Type, elems: Vec<Value>) -> Value {
        Value { ty: Type::list(elem), kind: ValueKind::Seq(elems) }
    }

    /// Builds a set, dropping repeated wholly-known elements.
    ///
    /// The first occurrence of each element is kept. Elements containing an
    /// unknown are never merged since their eventual values may differ.
    pub fn set(elem: Type, elems: Vec<Value>) -> Value {
        let mut seen = FxHashSet::with_capacity_and_hasher(elems.len(), Default::default());
        let mut distinct = Vec::with_capacity(elems.len());
        for value in elems {
            if !value.is_wholly_known() || seen.insert(value.clone()) {
                distinct.push(value);
            }
        }
        Value { ty: Type::set(elem), kind: ValueKind::Seq(distinct) }
    }

    /// Builds a tuple; its type is derived from the element types.
    pub fn tuple(elems: Vec<Value>) -> Value {
        let ty = Type::Tuple(elems.iter().map(|v| v.ty.clone()).collect());
        Value { ty, kind: ValueKind::Seq(elems) }
    }

    pub fn map(elem: Type, entries: BTreeMap<String, Value>) -> Value {
        Value { ty: Type::map(elem), kind: ValueKind::Map(entries) }
    }

    /// Builds an object; its type is derived from the attribute types.
    pub fn object(attrs: BTreeMap<String, Value>) -> Value {
        let ty = Type::Object(attrs.iter().map(|(k, v)| (k.clone(), v.ty.clone())).collect());
        Value { ty, kind: ValueKind::Map(attrs) }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self.kind, ValueKind::Unknown)
    }

    /// Returns true if neither this value nor any nested value is unknown.
    pub fn is_wholly_known(&self) -> bool {
        match &self.kind {
            ValueKind::Unknown => false,
            ValueKind::Seq(elems) => elems.iter().all(Value::is_wholly_known),
            ValueKind::Map(entries) => entries.values().all(Value::is_wholly_known),
            _ => true,
        }
    }

    /// Number of elements or entries of a known, non-null container.
    pub fn len(&self) -> Option<usize> {
        match &self.kind {
            ValueKind::Seq(elems) => Some(elems.len()),
            ValueKind::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match &self.kind {
            ValueKind::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.kind {
            ValueKind::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn elements(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::Seq(elems) => Some(elems),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&BTreeMap<String, Value>> {
        match &self.kind {
            ValueKind::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up an object attribute or map entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries().and_then(|e| e.get(key))
    }

    /// Retags this value with a more specific type.
    ///
    /// Used after reconciliation: `Dynamic` tags left on nulls, unknowns and
    /// empty containers are replaced by the positions of `ty`. Concrete parts
    /// of the value keep their own tags.
    pub(crate) fn conform(self, ty: &Type) -> Value {
        let Value { ty: own, kind } = self;
        match kind {
            ValueKind::Unknown | ValueKind::Null => Value { ty: ty.clone(), kind },
            ValueKind::Seq(elems) => {
                let elems = match ty {
                    Type::List(e) | Type::Set(e) => {
                        elems.into_iter().map(|v| v.conform(e)).collect()
                    }
                    Type::Tuple(etys) => elems
                        .into_iter()
                        .zip(etys)
                        .map(|(v, e)| v.conform(e))
                        .collect(),
                    _ => return Value { ty: own, kind: ValueKind::Seq(elems) },
                };
                Value { ty: ty.clone(), kind: ValueKind::Seq(elems) }
            }
            ValueKind::Map(entries) => {
                let entries = match ty {
                    Type::Map(e) => entries.into_iter().map(|(k, v)| (k, v.conform(e))).collect(),
                    Type::Object(atys) => entries
                        .into_iter()
                        .map(|(k, v)| match atys.get(&k) {
                            Some(aty) => (k, v.conform(aty)),
                            None => (k, v),
                        })
                        .collect(),
                    _ => return Value { ty: own, kind: ValueKind::Map(entries) },
                };
                Value { ty: ty.clone(), kind: ValueKind::Map(entries) }
            }
            primitive => Value { ty: own, kind: primitive },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_drops_known_duplicates() {
        let set = Value::set(
            Type::String,
            vec![
                Value::string("a"),
                Value::string("b"),
                Value::string("a"),
                Value::unknown(Type::String),
                Value::unknown(Type::String),
            ],
        );
        assert_eq!(set.len(), Some(4));
        assert_eq!(set.elements().unwrap()[0], Value::string("a"));
    }

    #[test]
    fn test_tuple_and_object_types() {
        let tuple = Value::tuple(vec![Value::number(1), Value::bool(true)]);
        assert_eq!(tuple.ty(), &Type::tuple([Type::Number, Type::Bool]));

        let mut attrs = BTreeMap::new();
        attrs.insert("a".to_string(), Value::string("x"));
        attrs.insert("b".to_string(), Value::null(Type::Number));
        let obj = Value::object(attrs);
        assert_eq!(obj.ty(), &Type::object([("a", Type::String), ("b", Type::Number)]));
        assert!(obj.get("b").unwrap().is_null());
    }

    #[test]
    fn test_empty_is_not_null() {
        let empty = Value::list(Type::String, Vec::new());
        assert!(!empty.is_null());
        assert_eq!(empty.len(), Some(0));
        assert_eq!(Value::null(Type::list(Type::String)).len(), None);
    }

    #[test]
    fn test_wholly_known() {
        let v = Value::list(Type::Number, vec![Value::number(1), Value::unknown(Type::Number)]);
        assert!(v.is_known());
        assert!(!v.is_wholly_known());
        assert!(!Value::unknown(Type::Bool).is_known());
    }

    #[test]
    fn test_conform_retags_placeholders() {
        let inner = Value::list(Type::Dynamic, Vec::new());
        let v = Value::tuple(vec![inner, Value::null(Type::Dynamic)]);
        let target = Type::tuple([Type::list(Type::String), Type::Number]);
        let conformed = v.conform(&target);
        assert_eq!(conformed.ty(), &target);
        assert_eq!(conformed.elements().unwrap()[1].ty(), &Type::Number);
    }
}
