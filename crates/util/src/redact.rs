use once_cell::sync::Lazy;
use regex::Regex;

/// Patterns whose first capture group is kept and whose remainder is replaced.
static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)((?:authorization|authentication):\s*)([^\r\n]+)",
        r"(?i)(x-openerp-session-id:\s*)([^\s]+)",
        r"(?i)((?:^|\b)Bearer\s+)([A-Za-z0-9\-._~+/]+=*)",
        r#"(?i)("(?:password|token|session_id|access_token|refresh_token)"\s*:\s*)("[^"]*")"#,
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s]+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("redaction pattern should compile"))
    .collect()
});

/// Redacts values that look like secrets in a string.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}<redacted>")
            })
            .to_string();
    }
    redacted
}
