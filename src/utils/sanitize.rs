//! Filesystem-safe name transform

/// Longest sanitized name, in characters
const MAX_LEN: usize = 100;

/// Device names Windows reserves regardless of extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Turn a playlist or track title into a name safe to use as a directory or
/// file stem on any major filesystem.
///
/// Illegal characters become `_`, runs of `_` collapse to one, the result is
/// capped at 100 characters (dropping a trailing `_` left by the cut), and
/// reserved device names are escaped with a leading `_`.
pub fn sanitize_title(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut last_was_underscore = false;

    for c in name.trim().chars() {
        let mapped = match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        sanitized.push(mapped);
    }

    if sanitized.chars().count() > MAX_LEN {
        sanitized = sanitized.chars().take(MAX_LEN).collect();
        while sanitized.ends_with('_') {
            sanitized.pop();
        }
    }

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if RESERVED_NAMES
        .iter()
        .any(|reserved| sanitized.eq_ignore_ascii_case(reserved))
    {
        sanitized.insert(0, '_');
    }

    sanitized
}
