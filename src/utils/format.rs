/// Format a float with exactly two decimal places (`0.7` → `"0.70"`).
///
/// Rounds like a browser's `toFixed(2)`: a value exactly halfway between two
/// cents rounds away from zero, and the sign is kept for negative values that
/// round to zero. Only `-0.0` itself prints as `0.00`.
pub fn fixed2(v: f64) -> String {
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{}{}", sign, fixed2_magnitude(v.abs()))
}

fn fixed2_magnitude(a: f64) -> String {
    // Binary values sitting exactly on a half cent are the odd multiples of 1/8.
    let eighths = a * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 == 1.0 {
        let cents = (a * 100.0).ceil() as u64;
        format!("{}.{:02}", cents / 100, cents % 100)
    } else {
        format!("{:.2}", a)
    }
}
