use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Color used whenever a stored token cannot be resolved
pub const DEFAULT_COLOR: &str = "#667eea";

static PRESET_COLORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("red", "#dc3545"),
        ("blue", "#007bff"),
        ("green", "#28a745"),
        ("yellow", "#ffc107"),
        ("purple", "#6f42c1"),
        ("orange", "#fd7e14"),
        ("teal", "#20c997"),
        ("pink", "#e83e8c"),
        ("indigo", "#6610f2"),
        ("cyan", "#17a2b8"),
    ])
});

/// Hex value of a named preset, if the name is known
pub fn preset_hex(name: &str) -> Option<&'static str> {
    PRESET_COLORS.get(name).copied()
}

/// `#` followed by exactly six hex digits
pub fn is_hex_color(token: &str) -> bool {
    match token.strip_prefix('#') {
        Some(digits) => digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Map a stored color token to a hex string. Never fails.
///
/// Presets are looked up only when `is_preset` is set; a literal hex color is
/// accepted regardless of the flag. Anything else yields [`DEFAULT_COLOR`].
pub fn resolve_color(token: Option<&str>, is_preset: bool) -> String {
    let Some(token) = token else {
        return DEFAULT_COLOR.to_string();
    };

    if is_preset {
        if let Some(hex) = preset_hex(token) {
            return hex.to_string();
        }
    }

    if is_hex_color(token) {
        return token.to_string();
    }

    log::debug!("Unresolvable color token {:?}, using default", token);
    DEFAULT_COLOR.to_string()
}
