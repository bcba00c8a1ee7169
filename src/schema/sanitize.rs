//! Column and table name sanitizing

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Turn an arbitrary header into a safe lower-case identifier.
///
/// Every character that is not a letter or digit becomes `_`, and a name
/// starting with a digit gets a leading `_`.
pub fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_lowercase();

    if out.is_empty() {
        return "_".to_string();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Sanitize a full header row. Two headers that sanitize to the same name
/// are a schema conflict naming both originals.
pub fn sanitize_columns(headers: &[String]) -> Result<Vec<String>> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    let mut names = Vec::with_capacity(headers.len());

    for header in headers {
        let name = sanitize_name(header);
        if let Some(previous) = seen.insert(name.clone(), header) {
            return Err(Error::schema_conflict(format!(
                "columns '{previous}' and '{header}' both map to '{name}'"
            )));
        }
        names.push(name);
    }
    Ok(names)
}
