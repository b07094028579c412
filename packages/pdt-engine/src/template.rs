use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

lazy_static! {
    /// Template-parameter marker: `${ view.field }`. Matching is confined to
    /// the dollar-brace syntax so plain SQL (`%`, `{}`) is never picked up.
    static ref REFERENCE_RE: Regex =
        Regex::new(r"\$\{\s*([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)\s*\}")
            .expect("reference pattern is valid");
}

/// Phase 1: scan a SQL template for referenced view names. The field portion
/// of each `${view.field}` marker is ignored; any field of view V counts as a
/// dependency on V. Names are returned distinct, in first-appearance order.
pub fn extract_references(sql: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in REFERENCE_RE.captures_iter(sql) {
        let view = caps[1].to_string();
        if !seen.contains(&view) {
            seen.push(view);
        }
    }
    seen
}

/// Phase 2: render the final SQL text. Every literal `%` is escaped first so
/// a percent-based parameter syntax in the SQL layer cannot mistake it for a
/// placeholder, then every known named parameter (`view.field`) is
/// substituted verbatim. A marker naming an unknown parameter fails the
/// render; graph construction reports such references before any warehouse
/// call, so hitting this here means the two phases were run out of order.
pub fn render(sql: &str, parameters: &HashMap<String, String>) -> Result<String> {
    let escaped = sql.replace('%', "%%");

    let mut missing: Vec<String> = Vec::new();
    let rendered = REFERENCE_RE.replace_all(&escaped, |caps: &regex::Captures<'_>| {
        let name = format!("{}.{}", &caps[1], &caps[2]);
        match parameters.get(&name) {
            Some(value) => value.clone(),
            None => {
                missing.push(name);
                caps[0].to_string()
            }
        }
    });

    if let Some(name) = missing.first() {
        return Err(Error::Config(format!(
            "template references unknown parameter '{}'",
            name
        )));
    }
    Ok(rendered.into_owned())
}

/// Restore literal percents for transports whose parameter syntax is not
/// percent-based (the postgres wire protocol uses `$n` placeholders).
pub fn collapse_percent_escapes(sql: &str) -> String {
    sql.replace("%%", "%")
}
