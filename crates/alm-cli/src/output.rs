use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Text => {
            let mut lines = Vec::new();
            render_text(&serde_json::to_value(value)?, "", &mut lines);
            Ok(lines.join("\n"))
        }
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

/// Print a non-blocking notice to stderr unless quiet.
pub fn notice(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

/// Flatten nested objects into sorted `path.to.key: value` lines. Null fields are skipped.
fn render_text(value: &Value, prefix: &str, lines: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, value) in entries {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                render_text(value, &path, lines);
            }
        }
        Value::Array(items) if items.iter().any(Value::is_object) => {
            for (index, item) in items.iter().enumerate() {
                render_text(item, &format!("{prefix}[{index}]"), lines);
            }
        }
        Value::Null => {}
        scalar => {
            let cell = value_to_cell(scalar);
            if prefix.is_empty() {
                lines.push(cell);
            } else {
                lines.push(format!("{prefix}: {cell}"));
            }
        }
    }
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_cell)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn text_flattens_nested_objects_and_skips_nulls() {
        let rendered = render(
            &json!({
                "date": "2026-03-02",
                "status": "succeeded",
                "advisory": null,
                "report": { "summary": "ok", "highlights": ["a", "b"] },
                "routine": [{ "time": "07:00" }]
            }),
            OutputFormat::Text,
        )
        .unwrap();

        assert_eq!(
            rendered,
            "date: 2026-03-02\nreport.highlights: a, b\nreport.summary: ok\nroutine[0].time: 07:00\nstatus: succeeded"
        );
    }

    #[test]
    fn json_is_pretty() {
        let rendered = render(&json!({ "a": 1 }), OutputFormat::Json).unwrap();
        assert_eq!(rendered, "{\n  \"a\": 1\n}");
    }
}
