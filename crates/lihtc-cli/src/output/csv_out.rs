use serde_json::Value;
use std::io;

use super::result_of;

/// Write the computation result as CSV to stdout: scalar fields as
/// field,value records, the cash-flow series as year,cash_flow records.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match result_of(value) {
        Value::Object(map) => {
            let _ = wtr.write_record(["field", "value"]);
            write_object(&mut wtr, "", map);
        }
        Value::Array(items) => {
            write_series(&mut wtr, items);
        }
        other => {
            let _ = wtr.write_record([&format_csv_value(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_object(
    wtr: &mut csv::Writer<io::StdoutLock<'_>>,
    prefix: &str,
    map: &serde_json::Map<String, Value>,
) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(nested) => write_object(wtr, &name, nested),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    let _ = wtr.write_record([
                        format!("{name}.year_{}", i + 1).as_str(),
                        &format_csv_value(item),
                    ]);
                }
            }
            other => {
                let _ = wtr.write_record([name.as_str(), &format_csv_value(other)]);
            }
        }
    }
}

fn write_series(wtr: &mut csv::Writer<io::StdoutLock<'_>>, items: &[Value]) {
    let _ = wtr.write_record(["year", "cash_flow"]);
    for (i, item) in items.iter().enumerate() {
        let _ = wtr.write_record([(i + 1).to_string().as_str(), &format_csv_value(item)]);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
