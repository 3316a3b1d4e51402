//! MessagePack binary format.
//!
//! Structurally parallel to the text format. Differences on the wire:
//! - any extension value is an unknown, whatever the expected type
//! - nil stands for a null value of any type, containers included
//! - a dynamic value is a two-element array `[bin(type JSON), value]`
//! - tuples and objects must carry exactly their declared element count

use std::collections::BTreeMap;

use num_bigint::BigInt;
use tracing::{debug, trace};

use crate::codec::DecodeOptions;
use crate::codec::primitives::{Family, Reader, Writer, family};
use crate::codec::reconcile::{Collection, reconcile_elements, reconcile_entries};
use crate::error::{ErrorKind, NumberError, PathError, ReadError};
use crate::model::path::{Descend, Tracked};
use crate::model::{Number, Path, PathStep, Type, Value, ValueKind};
use crate::validate::validate_value;

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a MessagePack document against `ty` with default options.
pub fn decode_binary(bytes: &[u8], ty: &Type) -> Result<Value, PathError> {
    decode_binary_with_options(bytes, ty, &DecodeOptions::default())
}

/// Decodes a MessagePack document against `ty`.
///
/// The whole input must be consumed.
pub fn decode_binary_with_options(
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

    let mut decoder = BinaryDecoder {
        reader: Reader::new(bytes),
        path,
        depth: 0,
        max_depth: options.max_depth,
    };
    let value = decoder.decode(ty)?;
    if !decoder.reader.is_empty() {
        return Err(decoder.path.error(
            ErrorKind::Syntax,
            format!(
                "extraneous data after MessagePack value ({} bytes)",
                decoder.reader.remaining_len()
            ),
        ));
    }
    Ok(value)
}

struct BinaryDecoder<'a> {
    reader: Reader<'a>,
    path: Path,
    depth: usize,
    max_depth: usize,
}

impl Tracked for BinaryDecoder<'_> {
    fn path_mut(&mut self) -> &mut Path {
        &mut self.path
    }
}

impl BinaryDecoder<'_> {
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
        let marker = self.reader.peek_byte("value").map_err(|e| self.syntax(e))?;
        match family(marker) {
            Family::Ext => {
                self.reader.skip_ext("unknown value").map_err(|e| self.syntax(e))?;
                return Ok(Value::unknown(ty.clone()));
            }
            Family::Nil => {
                self.reader.read_byte("nil").map_err(|e| self.syntax(e))?;
                return Ok(Value::null(ty.clone()));
            }
            Family::Reserved => {
                return Err(self.fail(
                    ErrorKind::Syntax,
                    format!("invalid MessagePack marker 0x{marker:02x}"),
                ));
            }
            _ => {}
        }

        match ty {
            Type::Dynamic => self.decode_dynamic(marker),
            Type::String => self.decode_string(marker),
            Type::Number => self.decode_number(marker),
            Type::Bool => self.decode_bool(marker),
            Type::List(ety) => self.decode_list(marker, ety),
            Type::Set(ety) => self.decode_set(marker, ety),
            Type::Tuple(etys) => self.decode_tuple(marker, etys),
            Type::Map(ety) => self.decode_map(marker, ety),
            Type::Object(atys) => self.decode_object(marker, atys),
        }
    }

    fn decode_string(&mut self, marker: u8) -> Result<Value, PathError> {
        match family(marker) {
            Family::Str | Family::Bin => {
                let s = self.reader.read_str("string").map_err(|e| self.syntax(e))?;
                Ok(Value::string(s))
            }
            _ => Err(self.fail(ErrorKind::StructuralMismatch, "a string is required")),
        }
    }

    fn decode_number(&mut self, marker: u8) -> Result<Value, PathError> {
        match family(marker) {
            Family::Int => {
                let n = self.reader.read_int("number").map_err(|e| self.syntax(e))?;
                Ok(Value::number(Number::from_parts(BigInt::from(n), 0)))
            }
            Family::Float => {
                let f = self.reader.read_float("number").map_err(|e| self.syntax(e))?;
                match Number::from_f64(f) {
                    Some(n) => Ok(Value::number(n)),
                    None => Err(self.fail(ErrorKind::ValueMismatch, "number must be finite")),
                }
            }
            Family::Str | Family::Bin => {
                let s = self.reader.read_str("number").map_err(|e| self.syntax(e))?;
                match Number::parse(s) {
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
            _ => Err(self.fail(ErrorKind::StructuralMismatch, "a number is required")),
        }
    }

    fn decode_bool(&mut self, marker: u8) -> Result<Value, PathError> {
        if family(marker) != Family::Bool {
            return Err(self.fail(ErrorKind::StructuralMismatch, "a bool is required"));
        }
        let b = self.reader.read_bool("bool").map_err(|e| self.syntax(e))?;
        Ok(Value::bool(b))
    }

    /// Reads an array header; nil has already been handled by the caller.
    fn array_len(&mut self, marker: u8) -> Result<usize, PathError> {
        if family(marker) != Family::Array {
            return Err(self.fail(ErrorKind::StructuralMismatch, "an array is required"));
        }
        match self.reader.read_array_len("array").map_err(|e| self.syntax(e))? {
            Some(len) => Ok(len),
            None => Err(self.fail(ErrorKind::StructuralMismatch, "an array is required")),
        }
    }

    fn map_len(&mut self, marker: u8) -> Result<usize, PathError> {
        if family(marker) != Family::Map {
            return Err(self.fail(ErrorKind::StructuralMismatch, "a map is required"));
        }
        match self.reader.read_map_len("map").map_err(|e| self.syntax(e))? {
            Some(len) => Ok(len),
            None => Err(self.fail(ErrorKind::StructuralMismatch, "a map is required")),
        }
    }

    fn read_key(&mut self) -> Result<String, PathError> {
        let marker = self.reader.peek_byte("map key").map_err(|e| self.syntax(e))?;
        if family(marker) != Family::Str {
            return Err(self.fail(
                ErrorKind::StructuralMismatch,
                format!("map keys must be strings, found {}", family(marker).name()),
            ));
        }
        let key = self.reader.read_str("map key").map_err(|e| self.syntax(e))?;
        Ok(key.to_string())
    }

    fn decode_list(&mut self, marker: u8, ety: &Type) -> Result<Value, PathError> {
        let len = self.array_len(marker)?;
        let mut elems = Vec::with_capacity(len);
        for i in 0..len {
            let mut child = Descend::new(self, PathStep::Index(i));
            elems.push(child.decode(ety)?);
        }
        if ety.has_dynamic() && !elems.is_empty() {
            let (ety, elems) = reconcile_elements(&self.path, Collection::List, ety, elems)?;
            return Ok(Value::list(ety, elems));
        }
        Ok(Value::list(ety.clone(), elems))
    }

    fn decode_set(&mut self, marker: u8, ety: &Type) -> Result<Value, PathError> {
        let len = self.array_len(marker)?;
        let base = self.path.len();
        let mut elems = Vec::with_capacity(len);
        for i in 0..len {
            // Elements are located by index while decoding; a failure is
            // reported with the same unknown-element step the text format
            // uses.
            let mut child = Descend::new(self, PathStep::Index(i));
            match child.decode(ety) {
                Ok(value) => elems.push(value),
                Err(mut err) => {
                    if let Some(step) = err.path.get_mut(base) {
                        *step = PathStep::set_element(ety);
                    }
                    return Err(err);
                }
            }
        }
        if ety.has_dynamic() && !elems.is_empty() {
            let (ety, elems) = reconcile_elements(&self.path, Collection::Set, ety, elems)?;
            return Ok(Value::set(ety, elems));
        }
        Ok(Value::set(ety.clone(), elems))
    }

    fn decode_tuple(&mut self, marker: u8, etys: &[Type]) -> Result<Value, PathError> {
        let len = self.array_len(marker)?;
        if len != etys.len() {
            return Err(self.fail(
                ErrorKind::ArityMismatch,
                format!("a tuple of length {} is required", etys.len()),
            ));
        }
        let mut elems = Vec::with_capacity(len);
        for (i, ety) in etys.iter().enumerate() {
            let mut child = Descend::new(self, PathStep::Index(i));
            elems.push(child.decode(ety)?);
        }
        Ok(Value::tuple(elems))
    }

    fn decode_map(&mut self, marker: u8, ety: &Type) -> Result<Value, PathError> {
        let len = self.map_len(marker)?;
        let mut entries = BTreeMap::new();
        for _ in 0..len {
            let key = self.read_key()?;
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
        marker: u8,
        atys: &BTreeMap<String, Type>,
    ) -> Result<Value, PathError> {
        let len = self.map_len(marker)?;
        if len != atys.len() {
            return Err(self.fail(
                ErrorKind::ArityMismatch,
                format!(
                    "an object with {} attributes is required ({len} given)",
                    atys.len()
                ),
            ));
        }
        let mut attrs = BTreeMap::new();
        for _ in 0..len {
            let name = self.read_key()?;
            let Some(aty) = atys.get(&name) else {
                return Err(self.fail(
                    ErrorKind::ArityMismatch,
                    format!("unsupported attribute {name:?}"),
                ));
            };
            let mut child = Descend::new(self, PathStep::Attr(name.clone()));
            if attrs.contains_key(&name) {
                return Err(child.fail(ErrorKind::ValueMismatch, "duplicate attribute"));
            }
            let value = child.decode(aty)?;
            attrs.insert(name, value);
        }
        Ok(Value::object(attrs))
    }

    fn decode_dynamic(&mut self, marker: u8) -> Result<Value, PathError> {
        if family(marker) != Family::Array {
            return Err(self.fail(
                ErrorKind::UnresolvableDynamicType,
                "malformed dynamic value",
            ));
        }
        let len = self.reader.read_array_len("dynamic value").map_err(|e| self.syntax(e))?;
        if len != Some(2) {
            return Err(self.fail(
                ErrorKind::UnresolvableDynamicType,
                "malformed dynamic value",
            ));
        }

        let raw = self.reader.read_raw("dynamic type").map_err(|e| {
            self.fail(
                ErrorKind::UnresolvableDynamicType,
                format!("failed to read dynamic type: {e}"),
            )
        })?;
        let ty = Type::from_json_slice(raw).map_err(|e| {
            self.fail(
                ErrorKind::UnresolvableDynamicType,
                format!("failed to parse dynamic type: {e}"),
            )
        })?;
        trace!(path = %self.path, ty = %ty, "resolved dynamic type");
        self.decode(&ty)
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a value as MessagePack according to `ty`.
///
/// The value is validated against `ty` first. Unknown values are written as
/// a one-byte fixext of type 0.
pub fn encode_binary(value: &Value, ty: &Type) -> Result<Vec<u8>, PathError> {
    validate_value(value, ty)?;
    let mut writer = Writer::with_capacity(64);
    encode_value(&mut writer, value, ty);
    Ok(writer.into_bytes())
}

fn encode_value(writer: &mut Writer, value: &Value, ty: &Type) {
    if !value.is_known() {
        writer.write_unknown();
        return;
    }
    if ty.is_dynamic() {
        if value.ty().is_dynamic() {
            writer.write_nil();
            return;
        }
        writer.write_array_len(2);
        writer.write_bin(&value.ty().to_json_bytes());
        encode_value(writer, value, value.ty());
        return;
    }

    match value.kind() {
        ValueKind::Unknown | ValueKind::Null => writer.write_nil(),
        ValueKind::String(s) => writer.write_str(s),
        ValueKind::Number(n) => encode_number(writer, n),
        ValueKind::Bool(b) => writer.write_bool(*b),
        ValueKind::Seq(elems) => {
            writer.write_array_len(elems.len());
            for (i, elem) in elems.iter().enumerate() {
                match ty {
                    Type::List(e) | Type::Set(e) => encode_value(writer, elem, e),
                    Type::Tuple(etys) => encode_value(writer, elem, &etys[i]),
                    _ => encode_value(writer, elem, elem.ty()),
                }
            }
        }
        ValueKind::Map(entries) => {
            writer.write_map_len(entries.len());
            for (key, entry) in entries {
                writer.write_str(key);
                match ty {
                    Type::Map(e) => encode_value(writer, entry, e),
                    Type::Object(atys) => match atys.get(key) {
                        Some(aty) => encode_value(writer, entry, aty),
                        None => encode_value(writer, entry, entry.ty()),
                    },
                    _ => encode_value(writer, entry, entry.ty()),
                }
            }
        }
    }
}

/// Smallest integer encoding when integral and within 64 bits, float64 when
/// that reproduces the value exactly, otherwise the decimal string.
fn encode_number(writer: &mut Writer, n: &Number) {
    if let Some(i) = n.to_i64() {
        writer.write_int(i);
    } else if n.is_exact_f64() {
        writer.write_f64(n.to_f64());
    } else {
        writer.write_str(&n.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::primitives::{FIXEXT1, NIL};

    fn enc(f: impl FnOnce(&mut Writer)) -> Vec<u8> {
        let mut writer = Writer::new();
        f(&mut writer);
        writer.into_bytes()
    }

    #[test]
    fn test_extension_is_unknown_for_every_type() {
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
        let payloads: [&[u8]; 3] = [
            &[0xd4, 0x00, 0x00],
            &[0xd8, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            &[0xc7, 0x03, 0x09, 1, 2, 3],
        ];
        for ty in &types {
            for payload in payloads {
                let v = decode_binary(payload, ty).unwrap();
                assert!(!v.is_known(), "not unknown for {ty}");
                assert_eq!(v.ty(), ty);
            }
        }
    }

    #[test]
    fn test_extension_skips_whole_payload() {
        let bytes = enc(|w| {
            w.write_array_len(2);
            w.write_unknown();
            w.write_str("after");
        });
        let v = decode_binary(&bytes, &Type::list(Type::String)).unwrap();
        let elems = v.elements().unwrap();
        assert!(!elems[0].is_known());
        assert_eq!(elems[1], Value::string("after"));

        let bytes = [0x92, 0xc7, 0x02, 0x05, 0xff, 0xff, 0x07];
        let v = decode_binary(&bytes, &Type::tuple([Type::Number, Type::Number])).unwrap();
        assert_eq!(v.elements().unwrap()[1], Value::number(7));
    }

    #[test]
    fn test_nil_for_every_type() {
        for ty in [Type::String, Type::list(Type::Number), Type::Dynamic] {
            let v = decode_binary(&[NIL], &ty).unwrap();
            assert!(v.is_null());
            assert_eq!(v.ty(), &ty);
        }
    }

    #[test]
    fn test_number_encodings() {
        let int = enc(|w| w.write_int(-300));
        assert_eq!(decode_binary(&int, &Type::Number).unwrap(), Value::number(-300));

        let float = enc(|w| w.write_f64(0.5));
        assert_eq!(
            decode_binary(&float, &Type::Number).unwrap(),
            Value::number(Number::parse("0.5").unwrap())
        );

        let big = "123456789012345678901234567890.5";
        let s = enc(|w| w.write_str(big));
        let v = decode_binary(&s, &Type::Number).unwrap();
        assert_eq!(v.as_number().unwrap().to_string(), big);

        let uint = enc(|w| w.write_uint(u64::MAX));
        let v = decode_binary(&uint, &Type::Number).unwrap();
        assert_eq!(v.as_number().unwrap(), &Number::from(u64::MAX));

        let nan = enc(|w| w.write_f64(f64::NAN));
        let err = decode_binary(&nan, &Type::Number).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueMismatch);

        let bad = enc(|w| w.write_str("12abc"));
        let err = decode_binary(&bad, &Type::Number).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueMismatch);
    }

    #[test]
    fn test_number_encoder_choice() {
        let encode = |s: &str| {
            encode_binary(&Value::number(Number::parse(s).unwrap()), &Type::Number).unwrap()
        };
        assert_eq!(encode("5"), vec![0x05]);
        assert_eq!(encode("0.5")[0], 0xcb);
        assert_eq!(encode("0.10000000000000000000001")[0] & 0xe0, 0xa0);
    }

    #[test]
    fn test_structural_mismatch() {
        let bytes = enc(|w| w.write_bool(true));
        let err = decode_binary(&bytes, &Type::String).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralMismatch);
        let err = decode_binary(&bytes, &Type::list(Type::Bool)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StructuralMismatch);
    }

    #[test]
    fn test_tuple_length_must_match() {
        let bytes = enc(|w| {
            w.write_array_len(3);
            w.write_int(1);
            w.write_int(2);
            w.write_int(3);
        });
        let err = decode_binary(&bytes, &Type::tuple([Type::Number, Type::Number])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert!(err.path.is_empty());
        assert_eq!(err.message, "a tuple of length 2 is required");
    }

    #[test]
    fn test_object_count_must_match() {
        let ty = Type::object([("a", Type::Number), ("b", Type::String)]);
        let bytes = enc(|w| {
            w.write_map_len(1);
            w.write_str("a");
            w.write_int(1);
        });
        let err = decode_binary(&bytes, &ty).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert_eq!(err.message, "an object with 2 attributes is required (1 given)");

        let bytes = enc(|w| {
            w.write_map_len(2);
            w.write_str("a");
            w.write_int(1);
            w.write_str("c");
            w.write_str("x");
        });
        let err = decode_binary(&bytes, &ty).unwrap_err();
        assert_eq!(err.to_string(), r#"unsupported attribute "c""#);
    }

    #[test]
    fn test_path_precision() {
        let ty = Type::object([("x", Type::object([("y", Type::Number)]))]);
        let bytes = enc(|w| {
            w.write_map_len(1);
            w.write_str("x");
            w.write_map_len(1);
            w.write_str("y");
            w.write_bool(false);
        });
        let err = decode_binary(&bytes, &ty).unwrap_err();
        assert_eq!(err.path_string(), ".x.y");
    }

    #[test]
    fn test_set_error_uses_unknown_element_step() {
        let bytes = enc(|w| {
            w.write_array_len(2);
            w.write_int(1);
            w.write_str("x");
        });
        let err = decode_binary(&bytes, &Type::set(Type::Number)).unwrap_err();
        assert_eq!(err.path, vec![PathStep::set_element(&Type::Number)]);

        let text = crate::codec::decode_text(br#"[1, "x"]"#, &Type::set(Type::Bool)).unwrap_err();
        let bin = decode_binary(&bytes, &Type::set(Type::Bool)).unwrap_err();
        assert_eq!(text.path, bin.path);
    }

    #[test]
    fn test_dynamic_value() {
        let bytes = enc(|w| {
            w.write_array_len(2);
            w.write_bin(br#"["list","number"]"#);
            w.write_array_len(2);
            w.write_int(1);
            w.write_int(2);
        });
        let v = decode_binary(&bytes, &Type::Dynamic).unwrap();
        assert_eq!(v, Value::list(Type::Number, vec![Value::number(1), Value::number(2)]));
    }

    #[test]
    fn test_dynamic_value_must_be_pair() {
        let bytes = enc(|w| {
            w.write_array_len(3);
            w.write_bin(b"\"number\"");
            w.write_int(1);
            w.write_int(2);
        });
        let err = decode_binary(&bytes, &Type::Dynamic).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvableDynamicType);
        assert_eq!(err.message, "malformed dynamic value");
    }

    #[test]
    fn test_dynamic_reconciliation() {
        let bytes = enc(|w| {
            w.write_array_len(2);
            w.write_array_len(2);
            w.write_bin(b"\"number\"");
            w.write_int(1);
            w.write_array_len(2);
            w.write_bin(b"\"string\"");
            w.write_str("a");
        });
        let err = decode_binary(&bytes, &Type::list(Type::Dynamic)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnreconcilableElements);
        assert_eq!(err.path, vec![PathStep::Index(1)]);
    }

    #[test]
    fn test_trailing_data() {
        let err = decode_binary(&[0x01, 0x02], &Type::Number).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_truncated() {
        let err = decode_binary(&[0x92, 0x01], &Type::list(Type::Number)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        let err = decode_binary(&[], &Type::Number).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_encode_unknown_and_dynamic() {
        let v = Value::list(Type::Number, vec![Value::unknown(Type::Number)]);
        let bytes = encode_binary(&v, &Type::list(Type::Number)).unwrap();
        assert_eq!(bytes, vec![0x91, FIXEXT1, 0x00, 0x00]);

        let bytes = encode_binary(&Value::bool(true), &Type::Dynamic).unwrap();
        assert_eq!(decode_binary(&bytes, &Type::Dynamic).unwrap(), Value::bool(true));
        assert_eq!(bytes[0], 0x92);
    }
}
