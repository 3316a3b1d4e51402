//! JSON text format.
//!
//! The decoder is recursive descent over [`Tokenizer`], dispatching on the
//! expected [`Type`] at every level. Dynamic positions carry an envelope
//! object `{"value": ..., "type": ...}` whose keys may come in either order.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::codec::json_token::{JsonKind, Tokenizer};
use crate::codec::reconcile::{Collection, reconcile_elements, reconcile_entries};
use crate::codec::DecodeOptions;
use crate::error::{ErrorKind, NumberError, PathError, ReadError};
use crate::model::path::{Descend, Tracked};
use crate::model::{Number, Path, PathStep, Type, Value, ValueKind};
use crate::validate::validate_value;

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a JSON document against `ty` with default options.
pub fn decode_text(bytes: &[u8], ty: &Type) -> Result<Value, PathError> {
    decode_text_with_options(bytes, ty, &DecodeOptions::default())
}

/// Decodes a JSON document against `ty`.
///
/// The whole input must be consumed; anything but whitespace after the
/// root value is an error.
pub fn decode_text_with_options(
    bytes: &[u8],
    ty: &Type,
    options: &DecodeOptions,
) -> Result<Value, PathError> {
    let path = Path::new();
    if bytes.len() > options.max_input_len {
        return Err(path.error(
            ErrorKind::LimitExceeded,
            format!(
                "input of {} bytes exceeds the maximum of {}",
                bytes.len(),
                options.max_input_len
            ),
        ));
    }

    let mut decoder = TextDecoder {
        tokens: Tokenizer::new(bytes),
        path,
        depth: 0,
        max_depth: options.max_depth,
    };
    let value = decoder.decode(ty)?;
    decoder.tokens.finish().map_err(|_| {
        decoder
            .path
            .error(ErrorKind::Syntax, "extraneous data after JSON value")
    })?;
    Ok(value)
}

struct TextDecoder<'a> {
    tokens: Tokenizer<'a>,
    path: Path,
    depth: usize,
    max_depth: usize,
}

impl Tracked for TextDecoder<'_> {
    fn path_mut(&mut self) -> &mut Path {
        &mut self.path
    }
}

impl<'a> TextDecoder<'a> {
    fn syntax(&self, err: ReadError) -> PathError {
        self.path.error(ErrorKind::Syntax, err.to_string())
    }

    fn fail(&self, kind: ErrorKind, message: impl Into<String>) -> PathError {
        self.path.error(kind, message)
    }

    fn decode(&mut self, ty: &Type) -> Result<Value, PathError> {
        if self.depth >= self.max_depth {
            debug!(path = %self.path, max_depth = self.max_depth, "nesting depth limit reached");
            return Err(self.fail(
                ErrorKind::LimitExceeded,
                format!("nesting depth exceeds the maximum of {}", self.max_depth),
            ));
        }
        self.depth += 1;
        let result = self.decode_inner(ty);
        self.depth -= 1;
        result
    }

    fn decode_inner(&mut self, ty: &Type) -> Result<Value, PathError> {
        let kind = self.tokens.peek_kind().map_err(|e| self.syntax(e))?;
        if kind == JsonKind::Null {
            self.tokens.read_null().map_err(|e| self.syntax(e))?;
            return Ok(Value::null(ty.clone()));
        }

        match ty {
            Type::Dynamic => self.decode_dynamic(kind),
            Type::String => self.decode_string(kind),
            Type::Number => self.decode_number(kind),
            Type::Bool => self.decode_bool(kind),
            Type::List(ety) => self.decode_list(kind, ety),
            Type::Set(ety) => self.decode_set(kind, ety),
            Type::Tuple(etys) => self.decode_tuple(kind, etys),
            Type::Map(ety) => self.decode_map(kind, ety),
            Type::Object(atys) => self.decode_object(kind, atys),
        }
    }

    fn decode_string(&mut self, kind: JsonKind) -> Result<Value, PathError> {
        match kind {
            JsonKind::String => {
                let s = self.tokens.read_string().map_err(|e| self.syntax(e))?;
                Ok(Value::string(s.into_owned()))
            }
            JsonKind::Number => {
                let literal = self.tokens.read_number_literal().map_err(|e| self.syntax(e))?;
                Ok(Value::string(literal))
            }
            JsonKind::Bool => {
                let b = self.tokens.read_bool().map_err(|e| self.syntax(e))?;
                Ok(Value::string(if b { "true" } else { "false" }))
            }
            _ => Err(self.fail(ErrorKind::StructuralMismatch, "a string is required")),
        }
    }

    fn decode_number(&mut self, kind: JsonKind) -> Result<Value, PathError> {
        let parsed = match kind {
            JsonKind::Number => {
                let literal = self.tokens.read_number_literal().map_err(|e| self.syntax(e))?;
                Number::parse(literal)
            }
            JsonKind::String => {
                let s = self.tokens.read_string().map_err(|e| self.syntax(e))?;
                Number::parse(&s)
            }
            _ => return Err(self.fail(ErrorKind::StructuralMismatch, "a number is required")),
        };
        match parsed {
            Ok(n) => Ok(Value::number(n)),
            Err(NumberError::ExponentOutOfRange(_)) => Err(self.fail(
                ErrorKind::LimitExceeded,
                "number exponent is out of range",
            )),
            Err(NumberError::Invalid(_)) => {
                Err(self.fail(ErrorKind::ValueMismatch, "a number is required"))
            }
        }
    }

    fn decode_bool(&mut self, kind: JsonKind) -> Result<Value, PathError> {
        match kind {
            JsonKind::Bool => {
                let b = self.tokens.read_bool().map_err(|e| self.syntax(e))?;
                Ok(Value::bool(b))
            }
            JsonKind::String => {
                let s = self.tokens.read_string().map_err(|e| self.syntax(e))?;
                match &*s {
                    "true" | "1" => Ok(Value::bool(true)),
                    "false" | "0" => Ok(Value::bool(false)),
                    other if other.eq_ignore_ascii_case("true")
                        || other.eq_ignore_ascii_case("false") =>
                    {
                        Err(self.fail(
                            ErrorKind::ValueMismatch,
                            "a bool is required; to convert from string, use lowercase \"true\" or \"false\"",
                        ))
                    }
                    _ => Err(self.fail(ErrorKind::ValueMismatch, "a bool is required")),
                }
            }
            _ => Err(self.fail(ErrorKind::StructuralMismatch, "a bool is required")),
        }
    }

    fn begin_array(&mut self, kind: JsonKind) -> Result<(), PathError> {
        if kind != JsonKind::Array {
            return Err(self.fail(ErrorKind::StructuralMismatch, "a JSON array is required"));
        }
        self.tokens.begin_array().map_err(|e| self.syntax(e))
    }

    fn begin_object(&mut self, kind: JsonKind) -> Result<(), PathError> {
        if kind != JsonKind::Object {
            return Err(self.fail(ErrorKind::StructuralMismatch, "a JSON object is required"));
        }
        self.tokens.begin_object().map_err(|e| self.syntax(e))
    }

    fn decode_list(&mut self, kind: JsonKind, ety: &Type) -> Result<Value, PathError> {
        self.begin_array(kind)?;
        let mut elems = Vec::new();
        let mut first = true;
        while self.tokens.array_next(&mut first).map_err(|e| self.syntax(e))? {
            let mut child = Descend::new(self, PathStep::Index(elems.len()));
            elems.push(child.decode(ety)?);
        }
        if ety.has_dynamic() && !elems.is_empty() {
            let (ety, elems) = reconcile_elements(&self.path, Collection::List, ety, elems)?;
            return Ok(Value::list(ety, elems));
        }
        Ok(Value::list(ety.clone(), elems))
    }

    fn decode_set(&mut self, kind: JsonKind, ety: &Type) -> Result<Value, PathError> {
        self.begin_array(kind)?;
        let mut elems = Vec::new();
        let mut first = true;
        while self.tokens.array_next(&mut first).map_err(|e| self.syntax(e))? {
            let mut child = Descend::new(self, PathStep::set_element(ety));
            elems.push(child.decode(ety)?);
        }
        if ety.has_dynamic() && !elems.is_empty() {
            let (ety, elems) = reconcile_elements(&self.path, Collection::Set, ety, elems)?;
            return Ok(Value::set(ety, elems));
        }
        Ok(Value::set(ety.clone(), elems))
    }

    fn decode_tuple(&mut self, kind: JsonKind, etys: &[Type]) -> Result<Value, PathError> {
        self.begin_array(kind)?;
        let mut elems = Vec::with_capacity(etys.len());
        let mut first = true;
        while self.tokens.array_next(&mut first).map_err(|e| self.syntax(e))? {
            let Some(ety) = etys.get(elems.len()) else {
                return Err(self.fail(
                    ErrorKind::ArityMismatch,
                    format!("too many tuple elements (need {})", etys.len()),
                ));
            };
            let mut child = Descend::new(self, PathStep::Index(elems.len()));
            elems.push(child.decode(ety)?);
        }
        if elems.len() < etys.len() {
            return Err(self.fail(
                ErrorKind::ArityMismatch,
                format!("not enough tuple elements (need {})", etys.len()),
            ));
        }
        Ok(Value::tuple(elems))
    }

    fn decode_map(&mut self, kind: JsonKind, ety: &Type) -> Result<Value, PathError> {
        self.begin_object(kind)?;
        let mut entries = BTreeMap::new();
        let mut first = true;
        while let Some(key) = self
            .tokens
            .object_next_key(&mut first)
            .map_err(|e| self.syntax(e))?
        {
            let key = key.into_owned();
            let mut child = Descend::new(self, PathStep::Key(Value::string(key.as_str())));
            if entries.contains_key(&key) {
                return Err(child.fail(ErrorKind::ValueMismatch, "duplicate map key"));
            }
            let value = child.decode(ety)?;
            entries.insert(key, value);
        }
        if ety.has_dynamic() && !entries.is_empty() {
            let (ety, entries) = reconcile_entries(&self.path, ety, entries)?;
            return Ok(Value::map(ety, entries));
        }
        Ok(Value::map(ety.clone(), entries))
    }

    fn decode_object(
        &mut self,
        kind: JsonKind,
        atys: &BTreeMap<String, Type>,
    ) -> Result<Value, PathError> {
        self.begin_object(kind)?;
        let mut attrs = BTreeMap::new();
        let mut first = true;
        while let Some(name) = self
            .tokens
            .object_next_key(&mut first)
            .map_err(|e| self.syntax(e))?
        {
            let Some(aty) = atys.get(&*name) else {
                return Err(self.fail(
                    ErrorKind::ArityMismatch,
                    format!("unsupported attribute {:?}", &*name),
                ));
            };
            let name = name.into_owned();
            let mut child = Descend::new(self, PathStep::Attr(name.clone()));
            if attrs.contains_key(&name) {
                return Err(child.fail(ErrorKind::ValueMismatch, "duplicate attribute"));
            }
            let value = child.decode(aty)?;
            attrs.insert(name, value);
        }
        for (name, aty) in atys {
            if !attrs.contains_key(name) {
                attrs.insert(name.clone(), Value::null(aty.clone()));
            }
        }
        Ok(Value::object(attrs))
    }

    fn decode_dynamic(&mut self, kind: JsonKind) -> Result<Value, PathError> {
        if kind != JsonKind::Object {
            return Err(self.fail(
                ErrorKind::UnresolvableDynamicType,
                "a JSON object is required for a dynamically-typed value",
            ));
        }
        self.tokens.begin_object().map_err(|e| self.syntax(e))?;

        let mut ty: Option<Type> = None;
        let mut value: Option<Value> = None;
        let mut buffered: Option<&'a [u8]> = None;
        let mut first = true;
        while let Some(key) = self
            .tokens
            .object_next_key(&mut first)
            .map_err(|e| self.syntax(e))?
        {
            match &*key {
                "type" => {
                    if ty.is_some() {
                        return Err(self.fail(
                            ErrorKind::UnresolvableDynamicType,
                            "duplicate type in dynamically-typed value",
                        ));
                    }
                    let raw = self.tokens.skip_value().map_err(|e| self.syntax(e))?;
                    let resolved = Type::from_json_slice(raw).map_err(|e| {
                        self.fail(
                            ErrorKind::UnresolvableDynamicType,
                            format!("failed to parse dynamic type: {e}"),
                        )
                    })?;
                    trace!(path = %self.path, ty = %resolved, "resolved dynamic type");
                    ty = Some(resolved);
                }
                "value" => {
                    if value.is_some() || buffered.is_some() {
                        return Err(self.fail(
                            ErrorKind::UnresolvableDynamicType,
                            "duplicate value in dynamically-typed value",
                        ));
                    }
                    match &ty {
                        Some(resolved) => {
                            let resolved = resolved.clone();
                            value = Some(self.decode(&resolved)?);
                        }
                        None => {
                            buffered = Some(self.tokens.skip_value().map_err(|e| self.syntax(e))?);
                        }
                    }
                }
                other => {
                    return Err(self.fail(
                        ErrorKind::UnresolvableDynamicType,
                        format!("invalid key {other:?} in dynamically-typed value"),
                    ));
                }
            }
        }

        let Some(ty) = ty else {
            return Err(self.fail(
                ErrorKind::UnresolvableDynamicType,
                "missing type in dynamically-typed value",
            ));
        };
        if let Some(value) = value {
            return Ok(value);
        }
        let Some(raw) = buffered else {
            return Err(self.fail(
                ErrorKind::UnresolvableDynamicType,
                "missing value in dynamically-typed value",
            ));
        };

        // The value came before its type; decode the buffered bytes now.
        let outer = std::mem::replace(&mut self.tokens, Tokenizer::new(raw));
        let result = self.decode(&ty);
        self.tokens = outer;
        result
    }
}

// =============================================================================
// ENCODING
// =============================================================================

static DYNAMIC: Type = Type::Dynamic;

/// Encodes a value as JSON according to `ty`.
///
/// The value is validated against `ty` first. Unknown values have no JSON
/// form and are rejected.
pub fn encode_text(value: &Value, ty: &Type) -> Result<Vec<u8>, PathError> {
    validate_value(value, ty)?;
    let mut encoder = TextEncoder {
        out: String::new(),
        path: Path::new(),
    };
    encoder.encode(value, ty)?;
    Ok(encoder.out.into_bytes())
}

struct TextEncoder {
    out: String,
    path: Path,
}

impl Tracked for TextEncoder {
    fn path_mut(&mut self) -> &mut Path {
        &mut self.path
    }
}

impl TextEncoder {
    fn write_json_string(&mut self, s: &str) -> Result<(), PathError> {
        let quoted = serde_json::to_string(s)
            .map_err(|e| self.path.error(ErrorKind::UnencodableValue, e.to_string()))?;
        self.out.push_str(&quoted);
        Ok(())
    }

    fn encode(&mut self, value: &Value, ty: &Type) -> Result<(), PathError> {
        if !value.is_known() {
            return Err(self.path.error(
                ErrorKind::UnencodableValue,
                "value is not known; unknown values cannot be encoded as JSON",
            ));
        }
        if ty.is_dynamic() {
            if value.ty().is_dynamic() {
                // Untyped null.
                self.out.push_str("null");
                return Ok(());
            }
            self.out.push_str("{\"value\":");
            self.encode(value, value.ty())?;
            self.out.push_str(",\"type\":");
            self.out.push_str(&value.ty().to_json().to_string());
            self.out.push('}');
            return Ok(());
        }

        match value.kind() {
            ValueKind::Unknown | ValueKind::Null => self.out.push_str("null"),
            ValueKind::String(s) => self.write_json_string(s)?,
            ValueKind::Number(n) => self.out.push_str(&n.to_string()),
            ValueKind::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            ValueKind::Seq(elems) => {
                self.out.push('[');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    let ety = match ty {
                        Type::List(e) | Type::Set(e) => e.as_ref(),
                        Type::Tuple(etys) => &etys[i],
                        _ => &DYNAMIC,
                    };
                    let step = match ty {
                        Type::Set(_) => PathStep::Key(elem.clone()),
                        _ => PathStep::Index(i),
                    };
                    Descend::new(self, step).encode(elem, ety)?;
                }
                self.out.push(']');
            }
            ValueKind::Map(entries) => {
                self.out.push('{');
                for (i, (key, entry)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.write_json_string(key)?;
                    self.out.push(':');
                    let (ety, step) = match ty {
                        Type::Object(atys) => (
                            atys.get(key).unwrap_or(&DYNAMIC),
                            PathStep::Attr(key.clone()),
                        ),
                        Type::Map(e) => (e.as_ref(), PathStep::Key(Value::string(key.as_str()))),
                        _ => (&DYNAMIC, PathStep::Key(Value::string(key.as_str()))),
                    };
                    Descend::new(self, step).encode(entry, ety)?;
                }
                self.out.push('}');
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str, ty: &Type) -> Result<Value, PathError> {
        decode_text(json.as_bytes(), ty)
    }

    #[test]
    fn test_null_for_every_type() {
        let types = [
            Type::String,
            Type::Number,
            Type::Bool,
            Type::list(Type::String),
            Type::set(Type::Number),
            Type::map(Type::Bool),
            Type::tuple([Type::Number]),
            Type::object([("a", Type::String)]),
            Type::Dynamic,
        ];
        for ty in types {
            let v = decode("null", &ty).unwrap();
            assert!(v.is_null(), "not null for {ty}");
            assert_eq!(v.ty(), &ty);
        }
    }

    #[test]
    fn test_string_coercions() {
        assert_eq!(decode(r#""hi""#, &Type::String).unwrap(), Value::string("hi"));
        assert_eq!(decode("1.50", &Type::String).unwrap(), Value::string("1.50"));
        assert_eq!(decode("true", &Type::String).unwrap(), Value::string("true"));
        let err = decode("[]", &Type::String).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralMismatch);
        assert_eq!(err.message, "a string is required");
    }

    #[test]
    fn test_number_forms() {
        let n = decode("12.5", &Type::Number).unwrap();
        assert_eq!(n.as_number().unwrap().to_string(), "12.5");
        let n = decode(r#""1e400""#, &Type::Number).unwrap();
        assert_eq!(n.as_number().unwrap().exponent(), 400);
        let err = decode(r#""twelve""#, &Type::Number).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueMismatch);
        let err = decode("true", &Type::Number).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralMismatch);
    }

    #[test]
    fn test_bool_strictness() {
        for (json, expected) in [
            ("true", true),
            (r#""true""#, true),
            (r#""1""#, true),
            (r#""false""#, false),
            (r#""0""#, false),
        ] {
            assert_eq!(decode(json, &Type::Bool).unwrap(), Value::bool(expected));
        }
        for json in [r#""True""#, r#""FALSE""#] {
            let err = decode(json, &Type::Bool).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ValueMismatch);
            assert!(err.message.contains("lowercase"));
        }
        let err = decode(r#""yes""#, &Type::Bool).unwrap_err();
        assert_eq!(err.message, "a bool is required");
    }

    #[test]
    fn test_empty_is_not_null() {
        let v = decode("[]", &Type::list(Type::String)).unwrap();
        assert!(!v.is_null());
        assert_eq!(v.len(), Some(0));
        let v = decode("{}", &Type::map(Type::Number)).unwrap();
        assert_eq!(v.len(), Some(0));
    }

    #[test]
    fn test_tuple_arity() {
        let ty = Type::tuple([Type::Number, Type::Number]);
        let err = decode("[1, 2, 3]", &ty).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert!(err.path.is_empty());
        assert_eq!(err.message, "too many tuple elements (need 2)");

        let err = decode("[1]", &ty).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert!(err.path.is_empty());

        let v = decode(r#"[1, "x"]"#, &Type::tuple([Type::Number, Type::String])).unwrap();
        assert_eq!(v.elements().unwrap()[1], Value::string("x"));
    }

    #[test]
    fn test_object_completion() {
        let ty = Type::object([("a", Type::Number), ("b", Type::String)]);
        let v = decode(r#"{"a": 1}"#, &ty).unwrap();
        assert_eq!(v.ty(), &ty);
        let b = v.get("b").unwrap();
        assert!(b.is_null());
        assert_eq!(b.ty(), &Type::String);
    }

    #[test]
    fn test_object_rejects_unknown_attribute() {
        let ty = Type::object([("a", Type::Number)]);
        let err = decode(r#"{"a": 1, "z": 2}"#, &ty).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert_eq!(err.to_string(), r#"unsupported attribute "z""#);
    }

    #[test]
    fn test_path_precision() {
        let ty = Type::object([("x", Type::object([("y", Type::Number)]))]);
        let err = decode(r#"{"x": {"y": "not-a-number"}}"#, &ty).unwrap_err();
        assert_eq!(
            err.path,
            vec![PathStep::Attr("x".to_string()), PathStep::Attr("y".to_string())]
        );
        assert_eq!(err.to_string(), ".x.y: a number is required");
    }

    #[test]
    fn test_map_and_set_paths() {
        let err = decode(r#"{"k": "v"}"#, &Type::map(Type::Number)).unwrap_err();
        assert_eq!(err.path, vec![PathStep::Key(Value::string("k"))]);

        let err = decode(r#"["a"]"#, &Type::set(Type::Number)).unwrap_err();
        assert_eq!(err.path, vec![PathStep::set_element(&Type::Number)]);
        assert_eq!(err.path_string(), "[?]");
    }

    #[test]
    fn test_duplicate_map_key() {
        let err = decode(r#"{"k": 1, "k": 2}"#, &Type::map(Type::Number)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueMismatch);
        assert_eq!(err.path_string(), r#"["k"]"#);
    }

    #[test]
    fn test_set_dedupes() {
        let v = decode("[1, 2, 1]", &Type::set(Type::Number)).unwrap();
        assert_eq!(v.len(), Some(2));
    }

    #[test]
    fn test_dynamic_envelope_either_order() {
        let a = decode(r#"{"type": "number", "value": 5}"#, &Type::Dynamic).unwrap();
        let b = decode(r#"{"value": 5, "type": "number"}"#, &Type::Dynamic).unwrap();
        assert_eq!(a, Value::number(5));
        assert_eq!(a, b);

        let v = decode(
            r#"{"value": {"a": [true]}, "type": ["object", {"a": ["list", "bool"]}]}"#,
            &Type::Dynamic,
        )
        .unwrap();
        assert_eq!(v.ty(), &Type::object([("a", Type::list(Type::Bool))]));
    }

    #[test]
    fn test_dynamic_envelope_errors() {
        let cases = [
            (r#"{"value": 5}"#, "missing type in dynamically-typed value"),
            (r#"{"type": "number"}"#, "missing value in dynamically-typed value"),
            (
                r#"{"type": "number", "value": 5, "extra": 1}"#,
                r#"invalid key "extra" in dynamically-typed value"#,
            ),
        ];
        for (json, message) in cases {
            let err = decode(json, &Type::Dynamic).unwrap_err();
            assert_eq!(err.kind, ErrorKind::UnresolvableDynamicType);
            assert_eq!(err.message, message);
        }
        let err = decode(r#"{"type": "integer", "value": 5}"#, &Type::Dynamic).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvableDynamicType);
        let err = decode("5", &Type::Dynamic).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvableDynamicType);
    }

    #[test]
    fn test_buffered_value_error_keeps_path() {
        let ty = Type::object([("d", Type::Dynamic)]);
        let err = decode(r#"{"d": {"value": ["x"], "type": ["list", "number"]}}"#, &ty)
            .unwrap_err();
        assert_eq!(err.path_string(), ".d[0]");
        assert_eq!(err.kind, ErrorKind::ValueMismatch);
    }

    #[test]
    fn test_dynamic_reconciliation() {
        let list = |elem: &str| format!(r#"{{"value": {elem}, "type": "{}"}}"#, type_of(elem));
        let json = format!("[{}, {}, {}]", list("1"), list("2"), list("3"));
        let v = decode(&json, &Type::list(Type::Dynamic)).unwrap();
        assert_eq!(v.ty(), &Type::list(Type::Number));
        assert_eq!(v.len(), Some(3));

        let json = format!("[{}, {}]", list("1"), list(r#""a""#));
        let err = decode(&json, &Type::list(Type::Dynamic)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnreconcilableElements);
        assert_eq!(err.path, vec![PathStep::Index(1)]);
    }

    fn type_of(elem: &str) -> &'static str {
        if elem.starts_with('"') { "string" } else { "number" }
    }

    #[test]
    fn test_empty_dynamic_list_keeps_declared_type() {
        let v = decode("[]", &Type::list(Type::Dynamic)).unwrap();
        assert_eq!(v.ty(), &Type::list(Type::Dynamic));
    }

    #[test]
    fn test_trailing_data() {
        let err = decode("1 2", &Type::Number).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(decode("  1\n", &Type::Number).is_ok());
    }

    #[test]
    fn test_syntax_errors() {
        let list = Type::list(Type::Number);
        let map = Type::map(Type::Number);
        for (json, ty) in [("", &list), ("[1,", &list), (r#"{"a" 1}"#, &map), ("[1,]", &list), ("nul", &list)] {
            let err = decode(json, ty).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Syntax, "for {json:?}");
        }
    }

    #[test]
    fn test_depth_limit() {
        let mut ty = Type::Number;
        for _ in 0..10 {
            ty = Type::list(ty);
        }
        let json = format!("{}1{}", "[".repeat(10), "]".repeat(10));
        let options = DecodeOptions {
            max_depth: 5,
            ..DecodeOptions::default()
        };
        let err = decode_text_with_options(json.as_bytes(), &ty, &options).unwrap_err();
        assert_eq!(err.kind, ErrorKind::LimitExceeded);
        assert_eq!(err.path.len(), 5);
        assert!(decode_text(json.as_bytes(), &ty).is_ok());
    }

    #[test]
    fn test_input_length_limit() {
        let options = DecodeOptions {
            max_input_len: 4,
            ..DecodeOptions::default()
        };
        let err = decode_text_with_options(b"123456", &Type::Number, &options).unwrap_err();
        assert_eq!(err.kind, ErrorKind::LimitExceeded);
    }

    #[test]
    fn test_encode_dynamic_and_sorted_keys() {
        let mut attrs = BTreeMap::new();
        attrs.insert("b".to_string(), Value::number(2));
        attrs.insert("a".to_string(), Value::string("x"));
        let obj = Value::object(attrs);
        let ty = Type::object([("a", Type::Dynamic), ("b", Type::Number)]);
        let bytes = encode_text(&obj, &ty).unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"a":{"value":"x","type":"string"},"b":2}"#
        );
        assert_eq!(decode_text(&bytes, &ty).unwrap(), obj);
    }

    #[test]
    fn test_encode_rejects_unknown() {
        let v = Value::list(Type::Number, vec![Value::number(1), Value::unknown(Type::Number)]);
        let err = encode_text(&v, &Type::list(Type::Number)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnencodableValue);
        assert_eq!(err.path, vec![PathStep::Index(1)]);
    }
}
