/// Extract a short type name from the full module path.
///
/// Given `"my_crate::some_module::MyType"`, returns `"MyType"`.
pub fn short_type_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Group the whole part of a non-negative amount with thousands separators.
fn group_thousands(whole: u64) -> String {
    let s = whole.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Format a sterling amount with pence and thousands separators: `£1,234.50`.
pub fn format_pounds(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let pence = (amount.abs() * 100.0).round() as u64;
    format!(
        "{}\u{a3}{}.{:02}",
        sign,
        group_thousands(pence / 100),
        pence % 100
    )
}

/// Whole-pound variant for digests and banners: `£12,346`.
pub fn format_whole_pounds(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}\u{a3}{}", sign, group_thousands(amount.abs().round() as u64))
}
