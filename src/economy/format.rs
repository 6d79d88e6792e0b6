//! Number rendering for the presentation layer.

use super::state::NumberMode;

const SUFFIXES: [&str; 11] = ["", "K", "M", "B", "T", "Qa", "Qi", "Sx", "Sp", "Oc", "No"];

/// Format `n` for display in the given mode. Values below 1,000 always use
/// the standard form.
pub fn format_number(n: f64, mode: NumberMode) -> String {
    if n.is_nan() {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "∞".into() } else { "-∞".into() };
    }
    if n < 0.0 {
        return format!("-{}", format_number(-n, mode));
    }
    if n < 1000.0 {
        return format_standard(n);
    }
    match mode {
        NumberMode::Standard => format_standard(n),
        NumberMode::Abbreviated => format_abbreviated(n),
        NumberMode::Scientific => format_scientific(n),
    }
}

/// Comma-grouped integer part plus one decimal when it matters.
fn format_standard(n: f64) -> String {
    if n >= u64::MAX as f64 {
        return format_scientific(n);
    }
    let int_part = n.floor() as u64;
    let frac = n - int_part as f64;

    let s = int_part.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    let result: String = result.chars().rev().collect();

    // 0.95 and up would round to "x.10"
    if frac > 0.05 && frac < 0.95 {
        format!("{}.{}", result, (frac * 10.0).round() as u8)
    } else {
        result
    }
}

fn format_abbreviated(n: f64) -> String {
    let mut tier = (n.log10() / 3.0).floor() as usize;
    let mut mantissa = n / 1000f64.powi(tier as i32);
    if (mantissa * 100.0).round() / 100.0 >= 1000.0 {
        tier += 1;
        mantissa /= 1000.0;
    }
    match SUFFIXES.get(tier) {
        Some(suffix) => format!("{:.2}{}", mantissa, suffix),
        None => format_scientific(n),
    }
}

fn format_scientific(n: f64) -> String {
    format!("{:.2e}", n)
}
