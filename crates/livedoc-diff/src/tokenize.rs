//! Whitespace-preserving tokenizer.

use std::sync::LazyLock;

use regex::Regex;

/// ECMAScript's `\s` class. Unlike Unicode `White_Space` it includes U+FEFF
/// and excludes U+0085.
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\t\n\x0B\x0C\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}]+",
    )
    .expect("static regex")
});

/// An atomic unit of text: either a run of whitespace or a run of
/// non-whitespace. Never empty.
pub type Token = String;

/// Split `text` into alternating word and whitespace runs.
///
/// Concatenating the result reproduces `text` exactly; the empty string
/// yields no tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for m in WHITESPACE_RUN.find_iter(text) {
        if m.start() > last {
            tokens.push(text[last..m.start()].to_string());
        }
        tokens.push(m.as_str().to_string());
        last = m.end();
    }
    if last < text.len() {
        tokens.push(text[last..].to_string());
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_words_and_runs() {
        assert_eq!(tokenize("hello  world\n"), vec!["hello", "  ", "world", "\n"]);
    }

    #[test]
    fn test_leading_whitespace() {
        assert_eq!(tokenize(" \tx"), vec![" \t", "x"]);
    }

    #[test]
    fn test_only_whitespace() {
        assert_eq!(tokenize("\n\n"), vec!["\n\n"]);
    }

    #[test]
    fn test_unicode_whitespace_and_words() {
        let text = "日本語\u{3000}テキスト — ok";
        let tokens = tokenize(text);
        assert_eq!(tokens.concat(), text);
        assert_eq!(tokens[0], "日本語");
        assert_eq!(tokens[1], "\u{3000}");
    }

    #[test]
    fn test_bom_is_whitespace_nel_is_not() {
        assert_eq!(tokenize("a\u{FEFF}b"), vec!["a", "\u{FEFF}", "b"]);
        assert_eq!(tokenize("a\u{0085}b"), vec!["a\u{0085}b"]);
        assert_eq!(tokenize("a\u{00A0}\u{2009}b"), vec!["a", "\u{00A0}\u{2009}", "b"]);
    }

    #[test]
    fn test_markdown_keeps_punctuation_attached() {
        assert_eq!(tokenize("# Title\n- item"), vec!["#", " ", "Title", "\n", "-", " ", "item"]);
    }
}
