//! Sound path normalization.

/// Normalizes a sound path into a cache key.
///
/// Backslashes become `/`, repeated separators collapse, a leading `./`
/// is dropped and ASCII letters are lowercased.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_sep = false;

    for c in path.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' {
            if last_was_sep {
                continue;
            }
            last_was_sep = true;
        } else {
            last_was_sep = false;
        }
        out.push(c.to_ascii_lowercase());
    }

    while let Some(rest) = out.strip_prefix("./") {
        out = rest.to_string();
    }
    out
}
