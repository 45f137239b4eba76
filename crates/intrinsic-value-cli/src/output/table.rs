use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten_fields, payload, scalar_text, yearly_rows};

/// Format output as tables: headline fields, then the yearly projection,
/// then envelope warnings and methodology.
pub fn print_table(value: &Value) {
    match payload(value) {
        Value::Object(map) => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (key, val) in flatten_fields(map) {
                builder.push_record([key, val]);
            }
            println!("{}", Table::from(builder));

            let (columns, rows) = yearly_rows(map);
            if !rows.is_empty() {
                let mut builder = Builder::default();
                let mut header = vec!["year"];
                header.extend(columns);
                builder.push_record(header);
                for row in rows {
                    builder.push_record(row);
                }
                println!("\nProjection:\n{}", Table::from(builder));
            }
        }
        other => println!("{}", scalar_text(other)),
    }

    print_envelope_notes(value);
}

fn print_envelope_notes(value: &Value) {
    let Some(envelope) = value.as_object() else {
        return;
    };

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
