/// Text processing utilities shared by the normalizer and request builder.
pub mod text {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

    /// Reduce untrusted feed text to plain prose: strip markup, decode
    /// entities, collapse whitespace runs, trim.
    pub fn clean(raw: &str) -> String {
        let stripped = TAG_RE.replace_all(raw, " ");
        let decoded = html_escape::decode_html_entities(stripped.as_ref());
        WS_RE.replace_all(decoded.as_ref(), " ").trim().to_string()
    }

    /// HTML-escape cleaned text. Running `escape(&clean(..))` over its own
    /// output is a no-op, so normalization can never double-escape.
    pub fn escape(text: &str) -> String {
        html_escape::encode_text(text).into_owned()
    }

    /// Truncate to at most `max` characters, preferring a word boundary.
    /// Counts chars, not bytes, so multibyte text never splits mid-symbol.
    /// The ellipsis counts against `max`, so output never exceeds it and
    /// already-truncated text passes through unchanged.
    pub fn truncate_chars(text: &str, max: usize) -> String {
        if text.chars().count() <= max {
            return text.to_string();
        }
        let budget = max.saturating_sub(3);
        let cut: String = text.chars().take(budget).collect();
        match cut.rfind(' ') {
            Some(idx) if idx > budget / 2 => format!("{}...", cut[..idx].trim_end()),
            _ => format!("{}...", cut.trim_end()),
        }
    }
}
