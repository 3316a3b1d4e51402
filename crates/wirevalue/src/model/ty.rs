//! Type descriptors.
//!
//! A [`Type`] describes the shape of a value: a primitive, a parametrized
//! collection, a structural product, or [`Type::Dynamic`], which means the
//! concrete type travels alongside the value in the payload.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as Json;

use crate::error::TypeError;

/// A structural type descriptor.
///
/// Equality is structural: two descriptors are equal when they have the same
/// kind and equal parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    String,
    Number,
    Bool,
    /// Ordered sequence of a single element type.
    List(Box<Type>),
    /// Unordered collection of distinct elements of a single type.
    Set(Box<Type>),
    /// String-keyed mapping to a single value type.
    Map(Box<Type>),
    /// Fixed-arity sequence; arity is part of the type.
    Tuple(Vec<Type>),
    /// Fixed set of named attributes.
    Object(BTreeMap<String, Type>),
    /// Resolved at decode time from the payload itself.
    Dynamic,
}

impl Type {
    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    pub fn set(elem: Type) -> Type {
        Type::Set(Box::new(elem))
    }

    pub fn map(elem: Type) -> Type {
        Type::Map(Box::new(elem))
    }

    pub fn tuple(elems: impl IntoIterator<Item = Type>) -> Type {
        Type::Tuple(elems.into_iter().collect())
    }

    /// Builds an object type from `(name, type)` pairs. A repeated name keeps
    /// the last type given for it.
    pub fn object<K: Into<String>>(attrs: impl IntoIterator<Item = (K, Type)>) -> Type {
        Type::Object(attrs.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic)
    }

    /// Returns true if [`Type::Dynamic`] appears anywhere in this type.
    pub fn has_dynamic(&self) -> bool {
        match self {
            Type::Dynamic => true,
            Type::String | Type::Number | Type::Bool => false,
            Type::List(e) | Type::Set(e) | Type::Map(e) => e.has_dynamic(),
            Type::Tuple(elems) => elems.iter().any(Type::has_dynamic),
            Type::Object(attrs) => attrs.values().any(Type::has_dynamic),
        }
    }

    /// Returns true if a value of this type is an instance of `expected`.
    ///
    /// `Dynamic` in `expected` matches anything at that position; containers
    /// recurse into their parameters.
    pub fn conforms_to(&self, expected: &Type) -> bool {
        match (self, expected) {
            (_, Type::Dynamic) => true,
            (Type::String, Type::String)
            | (Type::Number, Type::Number)
            | (Type::Bool, Type::Bool) => true,
            (Type::List(a), Type::List(b))
            | (Type::Set(a), Type::Set(b))
            | (Type::Map(a), Type::Map(b)) => a.conforms_to(b),
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.conforms_to(y))
            }
            (Type::Object(a), Type::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, ta), (kb, tb))| ka == kb && ta.conforms_to(tb))
            }
            _ => false,
        }
    }

    /// Human-readable name used in error messages.
    pub fn friendly_name(&self) -> String {
        match self {
            Type::String => "string".to_string(),
            Type::Number => "number".to_string(),
            Type::Bool => "bool".to_string(),
            Type::List(e) => format!("list of {}", e.friendly_name()),
            Type::Set(e) => format!("set of {}", e.friendly_name()),
            Type::Map(e) => format!("map of {}", e.friendly_name()),
            Type::Tuple(_) => "tuple".to_string(),
            Type::Object(_) => "object".to_string(),
            Type::Dynamic => "dynamic".to_string(),
        }
    }

    // =========================================================================
    // JSON FORM
    // =========================================================================

    /// Returns the JSON form of this type, as carried in dynamic envelopes.
    pub fn to_json(&self) -> Json {
        match self {
            Type::String => Json::from("string"),
            Type::Number => Json::from("number"),
            Type::Bool => Json::from("bool"),
            Type::Dynamic => Json::from("dynamic"),
            Type::List(e) => Json::Array(vec![Json::from("list"), e.to_json()]),
            Type::Set(e) => Json::Array(vec![Json::from("set"), e.to_json()]),
            Type::Map(e) => Json::Array(vec![Json::from("map"), e.to_json()]),
            Type::Tuple(elems) => Json::Array(vec![
                Json::from("tuple"),
                Json::Array(elems.iter().map(Type::to_json).collect()),
            ]),
            Type::Object(attrs) => Json::Array(vec![
                Json::from("object"),
                Json::Object(attrs.iter().map(|(k, t)| (k.clone(), t.to_json())).collect()),
            ]),
        }
    }

    /// Serializes the JSON form to bytes.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Parses a type from its JSON form.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Type, TypeError> {
        let json: Json =
            serde_json::from_slice(bytes).map_err(|e| TypeError::InvalidJson(e.to_string()))?;
        Type::from_json(&json)
    }

    /// Converts an already-parsed JSON form into a type.
    pub fn from_json(json: &Json) -> Result<Type, TypeError> {
        match json {
            Json::String(name) => match name.as_str() {
                "string" => Ok(Type::String),
                "number" => Ok(Type::Number),
                "bool" => Ok(Type::Bool),
                "dynamic" => Ok(Type::Dynamic),
                other => Err(TypeError::UnknownPrimitive(other.to_string())),
            },
            Json::Array(parts) => {
                let Some(Json::String(kind)) = parts.first() else {
                    return Err(TypeError::Malformed {
                        reason: "type array must start with a kind name",
                    });
                };
                if parts.len() != 2 {
                    return Err(TypeError::WrongParameterCount {
                        kind: kind.clone(),
                        found: parts.len() - 1,
                    });
                }
                let param = &parts[1];
                match kind.as_str() {
                    "list" => Ok(Type::list(Type::from_json(param)?)),
                    "set" => Ok(Type::set(Type::from_json(param)?)),
                    "map" => Ok(Type::map(Type::from_json(param)?)),
                    "tuple" => {
                        let Json::Array(elems) = param else {
                            return Err(TypeError::Malformed {
                                reason: "tuple element types must be an array",
                            });
                        };
                        elems
                            .iter()
                            .map(Type::from_json)
                            .collect::<Result<Vec<_>, _>>()
                            .map(Type::Tuple)
                    }
                    "object" => {
                        let Json::Object(attrs) = param else {
                            return Err(TypeError::Malformed {
                                reason: "object attribute types must be an object",
                            });
                        };
                        let mut out = BTreeMap::new();
                        for (name, aty) in attrs {
                            out.insert(name.clone(), Type::from_json(aty)?);
                        }
                        Ok(Type::Object(out))
                    }
                    other => Err(TypeError::UnknownKind(other.to_string())),
                }
            }
            _ => Err(TypeError::Malformed {
                reason: "type must be a string or an array",
            }),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.friendly_name())
    }
}

/// Unifies two concrete types into the narrowest type both conform to.
///
/// `Dynamic` acts as a wildcard (it is what an untyped null or unknown element
/// carries). Returns `None` when the types are structurally incompatible.
pub fn unify(a: &Type, b: &Type) -> Option<Type> {
    match (a, b) {
        (Type::Dynamic, other) | (other, Type::Dynamic) => Some(other.clone()),
        (Type::String, Type::String) => Some(Type::String),
        (Type::Number, Type::Number) => Some(Type::Number),
        (Type::Bool, Type::Bool) => Some(Type::Bool),
        (Type::List(x), Type::List(y)) => unify(x, y).map(Type::list),
        (Type::Set(x), Type::Set(y)) => unify(x, y).map(Type::set),
        (Type::Map(x), Type::Map(y)) => unify(x, y).map(Type::map),
        (Type::Tuple(xs), Type::Tuple(ys)) => {
            if xs.len() != ys.len() {
                return None;
            }
            xs.iter()
                .zip(ys)
                .map(|(x, y)| unify(x, y))
                .collect::<Option<Vec<_>>>()
                .map(Type::Tuple)
        }
        (Type::Object(xs), Type::Object(ys)) => {
            if xs.len() != ys.len() || !xs.keys().eq(ys.keys()) {
                return None;
            }
            let mut attrs = BTreeMap::new();
            for ((name, x), y) in xs.iter().zip(ys.values()) {
                attrs.insert(name.clone(), unify(x, y)?);
            }
            Some(Type::Object(attrs))
        }
        _ => None,
    }
}
