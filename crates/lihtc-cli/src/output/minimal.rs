use serde_json::Value;

use super::result_of;

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known underwriting fields in priority order,
/// then fall back to the first field in the result object. Nested metrics
/// are searched one level deep so the pipeline output resolves to its IRR.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    let priority_keys = ["irr_pct", "dscr", "net_equity", "loan", "equity_required"];

    if let Value::Object(map) = result {
        for key in &priority_keys {
            if let Some(val) = lookup(map, key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result));
}

fn lookup<'a>(map: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(val) = map.get(key) {
        return Some(val);
    }
    for nested in map.values() {
        if let Value::Object(inner) = nested {
            if let Some(val) = inner.get(key) {
                return Some(val);
            }
        }
    }
    None
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
