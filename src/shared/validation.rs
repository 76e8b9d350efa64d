//! Validation Utilities

use validator::ValidationErrors;

/// Flatten validation errors into a single `field: message` line.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    messages.sort();

    if messages.is_empty() {
        "Validation failed".into()
    } else {
        messages.join(", ")
    }
}
