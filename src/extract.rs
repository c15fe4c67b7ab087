use regex::Regex;
use std::sync::OnceLock;

fn re_fenced_sql() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```sql\n(.*?)\n```").ok())
        .as_ref()
}

fn re_bare_statement() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)(SELECT|INSERT|UPDATE|DELETE|SHOW).*?;").ok())
        .as_ref()
}

/// Pulls a single SQL statement out of a model reply.
///
/// A fenced code block tagged `sql` wins. Without one, the first span that
/// starts with a known verb and runs to the next semicolon is taken.
/// The text is not validated in any way.
pub fn extract_sql(text: &str) -> Option<String> {
    if let Some(caps) = re_fenced_sql().and_then(|re| re.captures(text)) {
        return caps.get(1).map(|m| m.as_str().trim().to_string());
    }

    re_bare_statement()
        .and_then(|re| re.find(text))
        .map(|m| m.as_str().trim().to_string())
}
