//! Decode benchmark for wirevalue using a synthetic city dataset.
//!
//! Usage: `bench-decode [RECORDS] [--json]`
//!
//! Builds RECORDS city objects, encodes them as JSON and MessagePack and
//! times decoding in both formats. Log output is controlled by
//! `WIREVALUE_LOG` (default `info`).

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;
use wirevalue::{
    Number, Type, Value, decode_binary, decode_text, encode_binary, encode_text,
};

const DEFAULT_RECORDS: usize = 20_000;
const ITERATIONS: u32 = 5;

fn init_tracing() {
    let env = std::env::var("WIREVALUE_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Declared type of one city record. `extra` is dynamic, so every record
/// carries the type of its extra attributes on the wire.
fn city_type() -> Type {
    Type::object([
        ("name", Type::String),
        ("population", Type::Number),
        ("location", Type::tuple([Type::Number, Type::Number])),
        ("timezones", Type::set(Type::String)),
        ("extra", Type::map(Type::Dynamic)),
    ])
}

fn build_city(i: usize) -> Value {
    let mut extra = BTreeMap::new();
    extra.insert("wikidata".to_string(), Value::string(format!("Q{}", 1000 + i)));
    extra.insert("code".to_string(), Value::string(format!("C{:05}", i % 50_000)));

    let lat = Number::from_f64(-90.0 + (i % 18_000) as f64 / 100.0).unwrap_or_default();
    let lon = Number::from_f64(-180.0 + (i % 36_000) as f64 / 100.0).unwrap_or_default();
    let zones = (0..=(i % 3))
        .map(|z| Value::string(format!("UTC{:+}", z as i64 - 1)))
        .collect();

    let mut attrs = BTreeMap::new();
    attrs.insert("name".to_string(), Value::string(format!("City {i}")));
    attrs.insert("population".to_string(), Value::number((i as i64) * 37 + 1_000));
    attrs.insert(
        "location".to_string(),
        Value::tuple(vec![Value::number(lat), Value::number(lon)]),
    );
    attrs.insert("timezones".to_string(), Value::set(Type::String, zones));
    attrs.insert("extra".to_string(), Value::map(Type::String, extra));
    Value::object(attrs)
}

#[derive(Debug, Serialize)]
struct FormatReport {
    format: &'static str,
    bytes: usize,
    encode_ms: f64,
    decode_ms: f64,
    decode_mb_per_s: f64,
}

#[derive(Debug, Serialize)]
struct Report {
    records: usize,
    iterations: u32,
    formats: Vec<FormatReport>,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn run_format(
    format: &'static str,
    value: &Value,
    ty: &Type,
    encode: fn(&Value, &Type) -> Result<Vec<u8>, wirevalue::PathError>,
    decode: fn(&[u8], &Type) -> Result<Value, wirevalue::PathError>,
) -> FormatReport {
    let encode_start = Instant::now();
    let bytes = encode(value, ty).expect("Failed to encode");
    let encode_time = encode_start.elapsed();

    let mut best = Duration::MAX;
    for iteration in 0..ITERATIONS {
        let decode_start = Instant::now();
        let decoded = decode(&bytes, ty).expect("Failed to decode");
        let elapsed = decode_start.elapsed();
        assert_eq!(&decoded, value, "{format} round trip changed the value");
        info!(format, iteration, elapsed_ms = millis(elapsed), "decoded");
        best = best.min(elapsed);
    }

    FormatReport {
        format,
        bytes: bytes.len(),
        encode_ms: millis(encode_time),
        decode_ms: millis(best),
        decode_mb_per_s: (bytes.len() as f64 / 1_000_000.0) / best.as_secs_f64(),
    }
}

fn main() {
    init_tracing();

    let mut records = DEFAULT_RECORDS;
    let mut json_output = false;
    for arg in std::env::args().skip(1) {
        if arg == "--json" {
            json_output = true;
        } else {
            records = arg.parse().expect("RECORDS must be a number");
        }
    }

    let build_start = Instant::now();
    let city = city_type();
    let ty = Type::list(city.clone());
    let value = Value::list(city, (0..records).map(build_city).collect());
    info!(records, elapsed_ms = millis(build_start.elapsed()), "built dataset");

    let report = Report {
        records,
        iterations: ITERATIONS,
        formats: vec![
            run_format("json", &value, &ty, encode_text, decode_text),
            run_format("msgpack", &value, &ty, encode_binary, decode_binary),
        ],
    };

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).expect("Failed to serialize report")
        );
        return;
    }

    println!("Records: {}", report.records);
    for f in &report.formats {
        println!(
            "\n{}: {} bytes ({:.1} MB)",
            f.format,
            f.bytes,
            f.bytes as f64 / 1_000_000.0
        );
        println!("  Encode: {:.2} ms", f.encode_ms);
        println!(
            "  Decode: {:.2} ms (best of {}), {:.2} MB/s",
            f.decode_ms, report.iterations, f.decode_mb_per_s
        );
    }
    if let [json, msgpack] = report.formats.as_slice() {
        println!(
            "\nMessagePack size vs JSON: {:.1}%",
            100.0 * msgpack.bytes as f64 / json.bytes as f64
        );
    }
}
