//! Display formatting shared by popups, panels and counters.

/// Groups the digits of `value` in threes with commas (`1234567` -> `"1,234,567"`).
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Rounds half-up to an integer and groups it. Missing or non-finite values
/// render as `"0"`.
pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => group_thousands((v + 0.5).floor() as i64),
        _ => "0".to_string(),
    }
}

pub fn format_fixed(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}

/// Shortens `text` to `max_chars` characters followed by `...`.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Turns a property key into a label: `storage_volume_m3` -> `Storage Volume M3`.
pub fn title_case_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_is_word = false;
    for ch in key.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        let is_word = ch.is_alphanumeric();
        if is_word && !prev_is_word {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        prev_is_word = is_word;
    }
    out
}
