//! Identity validation and the one-way HTML escaping applied to stored text.

use std::sync::LazyLock;

use regex::Regex;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const TITLE_MAX_CHARS: usize = 200;
pub const CONTENT_MAX_CHARS: usize = 20_000;

static IDENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").expect("identity pattern compiles"));

/// Usernames and nicknames: 3 to 32 characters of `[A-Za-z0-9_.-]`.
pub fn valid_identity(name: &str) -> bool {
    IDENTITY_PATTERN.is_match(name)
}

/// Escape HTML-significant characters. Not reversible; apply once, at write time.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
