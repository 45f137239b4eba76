use serde_json::Value;

use super::{payload, scalar_text};

/// Fields worth printing alone, most important first.
const PRIORITY_KEYS: [&str; 7] = [
    "intrinsic_value_per_share",
    "recommendation",
    "wacc",
    "beta",
    "upside_percent",
    "enterprise_value",
    "equity_value",
];

/// Print just the headline number from the output, e.g. the per-share value
/// of a DCF or the rate of a WACC calculation.
pub fn print_minimal(value: &Value) {
    println!("{}", headline(payload(value)));
}

fn headline(result: &Value) -> String {
    if let Value::Object(map) = result {
        for key in PRIORITY_KEYS {
            match map.get(key) {
                // A nested recommendation prints its label only.
                Some(Value::Object(inner)) => {
                    if let Some(label) = inner.get(key) {
                        return scalar_text(label);
                    }
                }
                Some(val) if !val.is_null() => return scalar_text(val),
                _ => {}
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, scalar_text(val));
        }
    }
    scalar_text(result)
}
