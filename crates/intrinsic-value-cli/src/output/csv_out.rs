use serde_json::Value;
use std::io;

use super::{flatten_fields, payload, scalar_text, yearly_rows};

/// Write output as CSV to stdout.
///
/// Scalars become `field,value` rows. A DCF result is followed by a blank
/// line and a per-year projection block.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(stdout.lock());

    match payload(value) {
        Value::Object(map) => {
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in flatten_fields(map) {
                let _ = wtr.write_record([key, val]);
            }

            let (columns, rows) = yearly_rows(map);
            if !rows.is_empty() {
                let _ = wtr.write_record([""]);
                let mut header = vec!["year"];
                header.extend(columns);
                let _ = wtr.write_record(&header);
                for row in rows {
                    let _ = wtr.write_record(&row);
                }
            }
        }
        other => {
            let _ = wtr.write_record([scalar_text(other)]);
        }
    }

    let _ = wtr.flush();
}
