pub mod csv_out;
pub mod json;
pub mod markdown;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The payload of a result envelope, or the value itself when it is not one.
pub(crate) fn payload(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Per-year series that render as their own table rather than a joined cell.
pub(crate) const YEARLY_SERIES: [&str; 3] =
    ["projected_fcf", "discount_factors", "present_value_per_year"];

/// Render a scalar JSON value as plain text. Decimals arrive as strings.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Flatten nested objects into `parent.child` keys, skipping yearly series.
pub(crate) fn flatten_fields(map: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    for (key, val) in map {
        if YEARLY_SERIES.contains(&key.as_str()) {
            continue;
        }
        match val {
            Value::Object(inner) => {
                for (child, v) in flatten_fields(inner) {
                    rows.push((format!("{key}.{child}"), v));
                }
            }
            Value::Array(items) => {
                let joined: Vec<String> = items.iter().map(scalar_text).collect();
                rows.push((key.clone(), joined.join(", ")));
            }
            _ => rows.push((key.clone(), scalar_text(val))),
        }
    }
    rows
}

/// Zip the yearly series present in `map` into rows of (year, values...).
pub(crate) fn yearly_rows(map: &serde_json::Map<String, Value>) -> (Vec<&'static str>, Vec<Vec<String>>) {
    let columns: Vec<&'static str> = YEARLY_SERIES
        .iter()
        .copied()
        .filter(|k| matches!(map.get(*k), Some(Value::Array(_))))
        .collect();
    let years = columns
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_array).map(Vec::len))
        .max()
        .unwrap_or(0);

    let rows = (0..years)
        .map(|idx| {
            let mut row = vec![(idx + 1).to_string()];
            for col in &columns {
                let cell = map
                    .get(*col)
                    .and_then(Value::as_array)
                    .and_then(|arr| arr.get(idx))
                    .map(scalar_text)
                    .unwrap_or_default();
                row.push(cell);
            }
            row
        })
        .collect();
    (columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_recommendation() {
        let value = json!({
            "intrinsic_value_per_share": "152.69",
            "recommendation": {"recommendation": "BUY", "confidence": "MEDIUM"},
            "projected_fcf": ["1100", "1210"],
        });
        let rows = flatten_fields(value.as_object().unwrap());
        assert_eq!(
            rows,
            vec![
                ("intrinsic_value_per_share".to_string(), "152.69".to_string()),
                ("recommendation.confidence".to_string(), "MEDIUM".to_string()),
                ("recommendation.recommendation".to_string(), "BUY".to_string()),
            ]
        );
    }

    #[test]
    fn test_yearly_rows() {
        let value = json!({
            "projected_fcf": ["1100", "1210"],
            "present_value_per_year": ["982.14", "964.60"],
        });
        let (columns, rows) = yearly_rows(value.as_object().unwrap());
        assert_eq!(columns, vec!["projected_fcf", "present_value_per_year"]);
        assert_eq!(rows[1], vec!["2", "1210", "964.60"]);
    }

    #[test]
    fn test_payload_unwraps_envelope() {
        let value = json!({"result": {"wacc": "0.1"}, "warnings": []});
        assert_eq!(payload(&value), &json!({"wacc": "0.1"}));
    }
}
