//! Value/type conformance checking.
//!
//! Decoders only ever produce conforming values. Values built by hand may
//! not conform, so both encoders run [`validate_value`] before writing
//! anything.

use crate::codec::reconcile::{Collection, unify_elements, unify_entries};
use crate::error::{ErrorKind, PathError};
use crate::model::path::{Descend, Tracked};
use crate::model::{Path, PathStep, Type, Value, ValueKind};

/// Checks that `value` is a valid instance of `ty`.
///
/// Validates:
/// - the value's own type conforms to `ty` (`Dynamic` accepts any type)
/// - the payload matches the value's type tag, recursively
/// - tuple lengths and object attribute sets match exactly
/// - no known, non-null value is tagged `Dynamic`
///
/// Unknown and null are valid for every type.
pub fn validate_value(value: &Value, ty: &Type) -> Result<(), PathError> {
    let mut validator = Validator { path: Path::new() };
    validator.check(value, ty)
}

struct Validator {
    path: Path,
}

impl Tracked for Validator {
    fn path_mut(&mut self) -> &mut Path {
        &mut self.path
    }
}

impl Validator {
    fn mismatch(&self, message: impl Into<String>) -> PathError {
        self.path.error(ErrorKind::ValueMismatch, message)
    }

    fn check(&mut self, value: &Value, expected: &Type) -> Result<(), PathError> {
        self.check_arity(value, expected)?;
        let own = value.ty();
        if !own.conforms_to(expected) {
            return Err(self.mismatch(format!(
                "{} value where {} is required",
                own.friendly_name(),
                expected.friendly_name()
            )));
        }

        match (value.kind(), own) {
            (ValueKind::Unknown | ValueKind::Null, _) => Ok(()),
            (_, Type::Dynamic) => Err(self.mismatch("value has no concrete type")),
            (ValueKind::String(_), Type::String)
            | (ValueKind::Number(_), Type::Number)
            | (ValueKind::Bool(_), Type::Bool) => Ok(()),
            (ValueKind::Seq(elems), Type::List(ety) | Type::Set(ety)) => {
                let collection = if matches!(own, Type::Set(_)) {
                    Collection::Set
                } else {
                    Collection::List
                };
                for (i, elem) in elems.iter().enumerate() {
                    let step = match collection {
                        Collection::Set => PathStep::Key(elem.clone()),
                        Collection::List => PathStep::Index(i),
                    };
                    Descend::new(self, step).check(elem, ety)?;
                }
                if ety.has_dynamic() {
                    unify_elements(&self.path, collection, ety, elems)?;
                }
                Ok(())
            }
            (ValueKind::Seq(elems), Type::Tuple(etys)) => {
                for (i, (elem, ety)) in elems.iter().zip(etys).enumerate() {
                    Descend::new(self, PathStep::Index(i)).check(elem, ety)?;
                }
                Ok(())
            }
            (ValueKind::Map(entries), Type::Map(ety)) => {
                for (key, entry) in entries {
                    Descend::new(self, PathStep::Key(Value::string(key.as_str())))
                        .check(entry, ety)?;
                }
                if ety.has_dynamic() {
                    unify_entries(&self.path, ety, entries)?;
                }
                Ok(())
            }
            (ValueKind::Map(attrs), Type::Object(atys)) => {
                for (name, attr) in attrs {
                    if let Some(aty) = atys.get(name) {
                        Descend::new(self, PathStep::Attr(name.clone())).check(attr, aty)?;
                    }
                }
                Ok(())
            }
            (kind, ty) => Err(self.mismatch(format!(
                "{} payload tagged as {}",
                payload_name(kind),
                ty.friendly_name()
            ))),
        }
    }

    /// Compares tuple lengths and object attribute sets against the
    /// expected type.
    fn check_arity(&self, value: &Value, expected: &Type) -> Result<(), PathError> {
        match (value.kind(), value.ty(), expected) {
            (ValueKind::Seq(elems), Type::Tuple(_), Type::Tuple(etys)) => {
                if elems.len() != etys.len() {
                    return Err(self.path.error(
                        ErrorKind::ArityMismatch,
                        format!(
                            "tuple has {} elements where {} are required",
                            elems.len(),
                            etys.len()
                        ),
                    ));
                }
            }
            (ValueKind::Map(attrs), Type::Object(_), Type::Object(atys)) => {
                if let Some(missing) = atys.keys().find(|name| !attrs.contains_key(*name)) {
                    return Err(self.path.error(
                        ErrorKind::ArityMismatch,
                        format!("missing attribute {missing:?}"),
                    ));
                }
                if let Some(extra) = attrs.keys().find(|name| !atys.contains_key(*name)) {
                    return Err(self.path.error(
                        ErrorKind::ArityMismatch,
                        format!("unsupported attribute {extra:?}"),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn payload_name(kind: &ValueKind) -> &'static str {
    match kind {
        ValueKind::Unknown => "unknown",
        ValueKind::Null => "null",
        ValueKind::String(_) => "string",
        ValueKind::Number(_) => "number",
        ValueKind::Bool(_) => "bool",
        ValueKind::Seq(_) => "sequence",
        ValueKind::Map(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_accepts_conforming_values() {
        let ty = Type::object([("a", Type::list(Type::Number)), ("b", Type::Dynamic)]);
        let mut attrs = BTreeMap::new();
        attrs.insert(
            "a".to_string(),
            Value::list(Type::Number, vec![Value::number(1), Value::unknown(Type::Number)]),
        );
        attrs.insert("b".to_string(), Value::string("anything"));
        validate_value(&Value::object(attrs), &ty).unwrap();
        validate_value(&Value::null(Type::Dynamic), &Type::Dynamic).unwrap();
        validate_value(&Value::unknown(Type::Bool), &Type::Bool).unwrap();
    }

    #[test]
    fn test_rejects_type_mismatch() {
        let err = validate_value(&Value::string("x"), &Type::Number).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueMismatch);
        assert_eq!(err.message, "string value where number is required");
    }

    #[test]
    fn test_rejects_nested_mismatch_with_path() {
        let value = Value::list(Type::Number, vec![Value::number(1), Value::string("x")]);
        let err = validate_value(&value, &Type::list(Type::Number)).unwrap_err();
        assert_eq!(err.path, vec![PathStep::Index(1)]);
    }

    #[test]
    fn test_rejects_incomplete_object() {
        let ty = Type::object([("a", Type::Number), ("b", Type::String)]);
        let mut attrs = BTreeMap::new();
        attrs.insert("a".to_string(), Value::number(1));
        let err = validate_value(&Value::object(attrs), &ty).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert_eq!(err.message, r#"missing attribute "b""#);
        assert!(err.path.is_empty());
    }

    #[test]
    fn test_rejects_extra_attribute_and_tuple_length() {
        let ty = Type::object([("a", Type::Number)]);
        let mut attrs = BTreeMap::new();
        attrs.insert("a".to_string(), Value::number(1));
        attrs.insert("z".to_string(), Value::bool(true));
        let err = validate_value(&Value::object(attrs), &ty).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert_eq!(err.message, r#"unsupported attribute "z""#);

        let ty = Type::list(Type::tuple([Type::Number, Type::Number]));
        let value = Value::list(
            Type::tuple([Type::Number, Type::Number]),
            vec![Value::tuple(vec![Value::number(1)])],
        );
        let err = validate_value(&value, &ty).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert_eq!(err.path, vec![PathStep::Index(0)]);
        assert_eq!(err.message, "tuple has 1 elements where 2 are required");
    }

    #[test]
    fn test_concrete_elements_under_dynamic() {
        let value = Value::list(Type::Dynamic, vec![Value::number(1), Value::number(2)]);
        validate_value(&value, &Type::list(Type::Dynamic)).unwrap();

        let set = Value::set(Type::Number, vec![Value::number(1)]);
        let err = validate_value(&set, &Type::set(Type::String)).unwrap_err();
        assert_eq!(err.message, "set of number value where set of string is required");
    }

    #[test]
    fn test_rejects_mixed_elements_under_dynamic() {
        let value = Value::list(Type::Dynamic, vec![Value::number(1), Value::bool(true)]);
        let err = validate_value(&value, &Type::list(Type::Dynamic)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnreconcilableElements);
        assert_eq!(err.path, vec![PathStep::Index(1)]);
        assert_eq!(err.message, "inconsistent list element types (number vs. bool)");

        let set = Value::set(Type::Dynamic, vec![Value::string("a"), Value::number(2)]);
        let err = validate_value(&set, &Type::Dynamic).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnreconcilableElements);
        assert_eq!(err.path, vec![PathStep::Key(Value::number(2))]);

        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), Value::list(Type::Number, vec![]));
        entries.insert("b".to_string(), Value::string("x"));
        let map = Value::map(Type::Dynamic, entries);
        let err = validate_value(&map, &Type::map(Type::Dynamic)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnreconcilableElements);
        assert_eq!(err.path, vec![PathStep::Key(Value::string("b"))]);
    }

    #[test]
    fn test_nulls_unify_with_concrete_elements() {
        let value = Value::list(
            Type::Dynamic,
            vec![Value::null(Type::Dynamic), Value::string("a"), Value::null(Type::String)],
        );
        validate_value(&value, &Type::list(Type::Dynamic)).unwrap();
    }
}
