//! Text normalisation shared by fingerprinting and scanning.

/// Lowercase, turn every run of non-alphanumeric characters into one space,
/// and trim. `"Internal discount code: ZX-91-PRIVATE"` becomes
/// `"internal discount code zx 91 private"`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Pad with spaces so `contains(" phrase ")` matches whole words only.
pub fn padded(normalized: &str) -> String {
    format!(" {normalized} ")
}
