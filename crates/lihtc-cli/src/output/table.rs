use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::result_of;

/// Render the computation result as tables: scalar fields in a Field/Value
/// table, year-indexed series as their own Year/Cash Flow table, followed by
/// any warnings and the methodology line.
pub fn print_table(value: &Value) {
    let result = result_of(value);

    match result {
        Value::Object(_) => {
            let mut fields: Vec<(String, String)> = Vec::new();
            let mut series: Vec<(String, Vec<Value>)> = Vec::new();
            collect_rows("", result, &mut fields, &mut series);

            if !fields.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (name, rendered) in &fields {
                    builder.push_record([name.as_str(), rendered.as_str()]);
                }
                println!("{}", Table::from(builder));
            }

            for (name, items) in &series {
                println!("\n{name}:");
                print_year_table(items);
            }
        }
        Value::Array(items) => print_year_table(items),
        other => println!("{}", other),
    }

    if let Some(envelope) = value.as_object() {
        if let Some(Value::Array(warnings)) = envelope.get("warnings") {
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for warning in warnings {
                    if let Value::String(text) = warning {
                        println!("  - {}", text);
                    }
                }
            }
        }

        if let Some(Value::String(methodology)) = envelope.get("methodology") {
            println!("\nMethodology: {}", methodology);
        }
    }
}

/// Flatten nested result objects into dotted field names, pulling numeric
/// arrays (the cash-flow series) aside for their own table.
fn collect_rows(
    prefix: &str,
    value: &Value,
    fields: &mut Vec<(String, String)>,
    series: &mut Vec<(String, Vec<Value>)>,
) {
    if let Value::Object(map) = value {
        for (key, val) in map {
            let name = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match val {
                Value::Object(_) => collect_rows(&name, val, fields, series),
                Value::Array(items) => series.push((name, items.clone())),
                other => fields.push((name, render_scalar(other))),
            }
        }
    }
}

fn print_year_table(items: &[Value]) {
    if items.is_empty() {
        println!("(empty)");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(["Year", "Cash Flow"]);
    for (i, item) in items.iter().enumerate() {
        builder.push_record([(i + 1).to_string(), render_scalar(item)]);
    }
    println!("{}", Table::from(builder));
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
