//! WDL reserved words

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Words the lexer emits as `Token::Keyword` rather than identifiers.
///
/// Type names (`Int`, `Array`, ...) and section names that only matter in
/// one context (`requirements`, `hints`) stay identifiers; the parser
/// recognizes them where they can appear.
static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "after",
        "alias",
        "as",
        "call",
        "command",
        "else",
        "if",
        "import",
        "in",
        "input",
        "meta",
        "None",
        "object",
        "output",
        "parameter_meta",
        "runtime",
        "scatter",
        "struct",
        "task",
        "then",
        "version",
        "workflow",
    ]
    .into_iter()
    .collect()
});

/// Keywords that start a top-level document item (the `version` header is
/// lexed as its own token)
pub const TOP_LEVEL_KEYWORDS: &[&str] = &["import", "struct", "task", "workflow"];

/// Check if a word is a reserved keyword
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert!(is_keyword("workflow"));
        assert!(is_keyword("scatter"));
        assert!(is_keyword("None"));
        assert!(!is_keyword("Int"));
        assert!(!is_keyword("requirements"));
        assert!(!is_keyword("my_task"));
    }

    #[test]
    fn test_top_level_keywords_are_reserved() {
        for kw in TOP_LEVEL_KEYWORDS {
            assert!(is_keyword(kw));
        }
    }
}
