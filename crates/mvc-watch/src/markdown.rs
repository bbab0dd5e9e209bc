//! Escaping for Telegram's MarkdownV2 dialect.

const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Escapes literal text so it renders verbatim.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escapes the target of an inline link, where only `)` and `\` are reserved.
pub fn escape_link_url(url: &str) -> String {
    let mut escaped = String::with_capacity(url.len());
    for c in url.chars() {
        if c == ')' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
