//! Purpose: Terminal rendering for CLI output: colored JSON and contact tables.
//! Exports: `colorize_json`, `contact_table`.
//! Role: Pure formatters used by the emit paths in `main.rs`.
//! Invariants: Without color, `colorize_json` equals `serde_json::to_string_pretty`.
//! Invariants: ANSI escapes appear only when explicitly enabled.
use serde_json::{Map, Value};

use contactdb::api::{Contact, ContactField};

#[derive(Clone, Copy)]
enum Tone {
    Key,
    Text,
    Number,
    Literal,
    Plain,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Tone::Key => "36",
            Tone::Text => "32",
            Tone::Number => "33",
            Tone::Literal => "35",
            Tone::Plain => "39",
        }
    }
}

struct Painter {
    color: bool,
    out: String,
}

impl Painter {
    fn paint(&mut self, text: &str, tone: Tone) {
        if self.color {
            self.out.push_str("\u{1b}[");
            self.out.push_str(tone.code());
            self.out.push('m');
            self.out.push_str(text);
            self.out.push_str("\u{1b}[0m");
        } else {
            self.out.push_str(text);
        }
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.paint("null", Tone::Literal),
            Value::Bool(flag) => self.paint(if *flag { "true" } else { "false" }, Tone::Literal),
            Value::Number(num) => self.paint(&num.to_string(), Tone::Number),
            Value::String(text) => self.paint(&quoted(text), Tone::Text),
            Value::Array(items) => self.array(items, depth),
            Value::Object(map) => self.object(map, depth),
        }
    }

    fn array(&mut self, items: &[Value], depth: usize) {
        if items.is_empty() {
            return self.paint("[]", Tone::Plain);
        }
        self.paint("[", Tone::Plain);
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.paint(",", Tone::Plain);
            }
            self.newline(depth + 1);
            self.value(item, depth + 1);
        }
        self.newline(depth);
        self.paint("]", Tone::Plain);
    }

    fn object(&mut self, map: &Map<String, Value>, depth: usize) {
        if map.is_empty() {
            return self.paint("{}", Tone::Plain);
        }
        self.paint("{", Tone::Plain);
        for (idx, (key, value)) in map.iter().enumerate() {
            if idx > 0 {
                self.paint(",", Tone::Plain);
            }
            self.newline(depth + 1);
            self.paint(&quoted(key), Tone::Key);
            self.paint(":", Tone::Plain);
            self.out.push(' ');
            self.value(value, depth + 1);
        }
        self.newline(depth);
        self.paint("}", Tone::Plain);
    }
}

fn quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

pub fn colorize_json(value: &Value, use_color: bool) -> String {
    let mut painter = Painter {
        color: use_color,
        out: String::new(),
    };
    painter.value(value, 0);
    painter.out
}

const TABLE_COLUMNS: [(&str, Option<ContactField>); 5] = [
    ("ID", None),
    ("NAME", Some(ContactField::Name)),
    ("EMAIL", Some(ContactField::Email)),
    ("PHONE", Some(ContactField::PhoneNumber)),
    ("COMPANY", Some(ContactField::Company)),
];

/// Aligned plain-text table of contacts, one row per contact.
pub fn contact_table(contacts: &[Contact]) -> String {
    let rows: Vec<Vec<String>> = contacts
        .iter()
        .map(|contact| {
            TABLE_COLUMNS
                .iter()
                .map(|(_, field)| match field {
                    None => contact.id.to_string(),
                    Some(field) => cell(contact.get(*field).unwrap_or("-")),
                })
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = TABLE_COLUMNS
        .iter()
        .map(|(header, _)| header.chars().count())
        .collect();
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let headers: Vec<String> = TABLE_COLUMNS
        .iter()
        .map(|(header, _)| header.to_string())
        .collect();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(table_line(&headers, &widths));
    for row in &rows {
        lines.push(table_line(row, &widths));
    }
    lines.join("\n")
}

fn cell(value: &str) -> String {
    value.replace('\n', "\\n").replace('\r', "\\r")
}

fn table_line(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(value, width)| format!("{value:<width$}"))
        .collect();
    padded.join("  ").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::{colorize_json, contact_table};
    use contactdb::api::Contact;
    use serde_json::json;
    use time::OffsetDateTime;

    #[test]
    fn plain_output_matches_serde_pretty() {
        let value = json!({
            "id": 1,
            "name": "Ada \"Countess\" Lovelace",
            "email": null,
            "tags": [],
            "nested": {"ok": true, "list": [1, 2.5]},
            "empty": {}
        });
        let expected = serde_json::to_string_pretty(&value).expect("pretty");
        assert_eq!(colorize_json(&value, false), expected);
    }

    #[test]
    fn color_output_wraps_tokens() {
        let out = colorize_json(&json!({"name": "Ada"}), true);
        assert!(out.contains("\u{1b}[36m\"name\"\u{1b}[0m"));
        assert!(out.contains("\u{1b}[32m\"Ada\"\u{1b}[0m"));
    }

    #[test]
    fn table_aligns_columns_and_marks_missing_values() {
        let contact = |id: i64, name: &str, email: Option<&str>| Contact {
            id,
            name: name.to_string(),
            phone_number: None,
            email: email.map(str::to_string),
            address: None,
            company: None,
            notes: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let table = contact_table(&[
            contact(1, "Ada", Some("ada@example.com")),
            contact(12, "Grace Hopper", None),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID  NAME          EMAIL"));
        assert!(lines[1].starts_with("1   Ada           ada@example.com"));
        assert!(lines[2].starts_with("12  Grace Hopper  -"));
    }
}
