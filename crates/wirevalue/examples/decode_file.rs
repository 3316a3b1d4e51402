//! Simple decoder to inspect payload files.
//!
//! Usage: `decode_file <TYPE-JSON> <FILE>`
//!
//! Files ending in `.msgpack` or `.mp` are decoded as MessagePack, anything
//! else as JSON. The type is given in its JSON form, e.g. `'["list","number"]'`.

use std::fs;

use wirevalue::{Type, Value, ValueKind, decode_binary, decode_text};

fn print_value(value: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value.kind() {
        ValueKind::Unknown => println!("{pad}<unknown> : {}", value.ty()),
        ValueKind::Null => println!("{pad}null : {}", value.ty()),
        ValueKind::String(s) => {
            let preview: String = s.chars().take(80).collect();
            if s.chars().count() > 80 {
                println!("{pad}{preview:?}...");
            } else {
                println!("{pad}{preview:?}");
            }
        }
        ValueKind::Number(n) => println!("{pad}{n}"),
        ValueKind::Bool(b) => println!("{pad}{b}"),
        ValueKind::Seq(elems) => {
            println!("{pad}{} ({} elements)", value.ty(), elems.len());
            for elem in elems {
                print_value(elem, indent + 1);
            }
        }
        ValueKind::Map(entries) => {
            println!("{pad}{} ({} entries)", value.ty(), entries.len());
            for (key, entry) in entries {
                println!("{pad}  {key}:");
                print_value(entry, indent + 2);
            }
        }
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let (Some(type_json), Some(path)) = (args.next(), args.next()) else {
        eprintln!("usage: decode_file <TYPE-JSON> <FILE>");
        std::process::exit(2);
    };

    let ty = Type::from_json_slice(type_json.as_bytes()).expect("Failed to parse type");
    let data = fs::read(&path).expect("Failed to read file");
    println!("Reading: {} ({} bytes) as {}", path, data.len(), ty);

    let binary = path.ends_with(".msgpack") || path.ends_with(".mp");
    let decoded = if binary {
        decode_binary(&data, &ty)
    } else {
        decode_text(&data, &ty)
    };

    match decoded {
        Ok(value) => print_value(&value, 0),
        Err(err) => {
            eprintln!("error [{}]: {}", err.kind.as_str(), err);
            std::process::exit(1);
        }
    }
}
