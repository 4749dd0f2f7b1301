/// Print with timestamp prefix
macro_rules! output {
    () => {{
        let now = chrono::Utc::now();
        println!("{}", now.to_rfc3339_opts(chrono::SecondsFormat::Millis, false));
    }};
    ($($arg:tt)*) => {{
        let now = chrono::Utc::now();
        print!("{} ", now.to_rfc3339_opts(chrono::SecondsFormat::Millis, false));
        println!($($arg)*);
    }};
}

pub(crate) use output;

/// Banner printed at the start of each test category.
pub fn section(title: &str) {
    output!();
    output!("{}", "=".repeat(60));
    output!("{}", title);
    output!("{}", "=".repeat(60));
}

/// First `max_chars` characters of a string, for inline previews and
/// error records stored in the report.
pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
