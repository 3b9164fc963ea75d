//! Mustache-style string interpolation for `@template`.
//!
//! `{{path}}` is HTML-escaped, `{{{path}}}` is inserted raw. Missing or null
//! values render as the empty string. An unclosed tag is kept as text.

use actionkit_core::FieldPath;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String),
    Var { path: FieldPath, escape: bool },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Template {
    pieces: Vec<Piece>,
}

impl Template {
    pub(crate) fn parse(source: &str) -> Self {
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            let (open, close, escape) = if rest[start..].starts_with("{{{") {
                ("{{{", "}}}", false)
            } else {
                ("{{", "}}", true)
            };
            let body_start = start + open.len();
            let Some(len) = rest[body_start..].find(close) else {
                break;
            };
            text.push_str(&rest[..start]);
            if !text.is_empty() {
                pieces.push(Piece::Text(std::mem::take(&mut text)));
            }
            let name = rest[body_start..body_start + len].trim();
            pieces.push(Piece::Var {
                path: FieldPath::parse(name),
                escape,
            });
            rest = &rest[body_start + len + close.len()..];
        }

        text.push_str(rest);
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        Self { pieces }
    }

    pub(crate) fn render(&self, scope: &Value, escape_html: bool) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Var { path, escape } => {
                    let Some(value) = path.resolve(scope) else {
                        continue;
                    };
                    let rendered = render_value(value);
                    if *escape && escape_html {
                        escape_into(&mut out, &rendered);
                    } else {
                        out.push_str(&rendered);
                    }
                }
            }
        }
        out
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_into(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            c => out.push(c),
        }
    }
}
