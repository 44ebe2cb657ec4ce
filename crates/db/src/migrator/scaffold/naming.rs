//! Name derivation for scaffolded files.

use chrono::{DateTime, Utc};

use crate::migrator::error::ScaffoldError;

/// Normalises a human label into a module-safe slug.
///
/// Lowercases, trims, and collapses runs of whitespace or `-` into a single
/// `_`. Anything outside `[a-z0-9_]` afterwards is rejected.
pub fn slugify(label: &str) -> Result<String, ScaffoldError> {
    let mut slug = String::with_capacity(label.len());
    let mut pending_sep = false;

    for ch in label.trim().chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !slug.is_empty() {
            slug.push('_');
        }
        pending_sep = false;
        slug.extend(ch.to_lowercase());
    }

    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(slug)
    } else {
        Err(ScaffoldError::InvalidName(label.to_string()))
    }
}

/// Prefixes a slug with a timestamp, producing the migration (and module) name.
pub fn migration_name(slug: &str, at: DateTime<Utc>) -> String {
    format!("m{}_{slug}", at.format("%Y%m%d_%H%M%S"))
}

/// Extracts `X` from a `create_X_table` slug.
pub fn created_table(slug: &str) -> Option<&str> {
    slug.strip_prefix("create_")
        .and_then(|rest| rest.strip_suffix("_table"))
        .filter(|table| !table.is_empty() && !table.starts_with('_') && !table.ends_with('_'))
}

/// Singularises the last word of a snake_case table name.
pub fn singular(table: &str) -> String {
    let (head, last) = match table.rsplit_once('_') {
        Some((head, last)) => (Some(head), last),
        None => (None, table),
    };

    let word = if let Some(stem) = last.strip_suffix("ies").filter(|s| !s.is_empty()) {
        format!("{stem}y")
    } else if ["sses", "shes", "ches", "xes", "zes"]
        .iter()
        .any(|suffix| last.ends_with(suffix))
    {
        last[..last.len() - 2].to_string()
    } else if last.len() > 1
        && last.ends_with('s')
        && !["ss", "us", "is"].iter().any(|suffix| last.ends_with(suffix))
    {
        last[..last.len() - 1].to_string()
    } else {
        last.to_string()
    };

    match head {
        Some(head) => format!("{head}_{word}"),
        None => word,
    }
}

/// Converts snake_case to PascalCase.
pub fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
