// Lexical filter: fast keyword screen that runs before the classifier.
//
// A hit short-circuits classification entirely, which also makes the filter
// the deterministic fallback while the model is loading or unavailable. The
// built-in list is small; deployments load their own list
// with `from_file` (HATEBLOCK_KEYWORDS_FILE).

use std::path::Path;

use anyhow::{Context, Result};

/// Built-in marker terms. Matching is case-insensitive substring matching.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "hate",
    "kill",
    "stupid",
    "idiot",
    "dumb",
    "ugly",
    "racist",
    "bigot",
    "homophobe",
    "moron",
    "terrorist",
    "scum",
];

#[derive(Debug, Clone)]
pub struct LexicalFilter {
    /// Lowercased, non-blank terms.
    terms: Vec<String>,
}

impl Default for LexicalFilter {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }
}

impl LexicalFilter {
    /// Build a filter from arbitrary terms. Blank terms are dropped.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    /// Parse a keyword list: one term per line, `#` starts a comment line.
    pub fn parse_list(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    /// Load a keyword list file (see [`parse_list`](Self::parse_list)).
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword list {}", path.display()))?;
        let filter = Self::parse_list(&contents);
        if filter.is_empty() {
            anyhow::bail!("Keyword list {} contains no terms", path.display());
        }
        Ok(filter)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether `text` contains any marker term, ignoring case.
    pub fn matches(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        self.terms.iter().any(|term| lower.contains(term.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_any_case() {
        let filter = LexicalFilter::default();
        assert!(filter.matches("You are an idiot"));
        assert!(filter.matches("YOU ARE AN IDIOT"));
        assert!(filter.matches("iDiOt"));
    }

    #[test]
    fn test_substring_match_inside_words() {
        // Substring semantics: "hateful" contains "hate"
        let filter = LexicalFilter::default();
        assert!(filter.matches("what a hateful comment"));
    }

    #[test]
    fn test_clean_text_does_not_match() {
        let filter = LexicalFilter::default();
        assert!(!filter.matches("Lovely weather for a walk today"));
    }

    #[test]
    fn test_empty_and_whitespace_never_match() {
        let filter = LexicalFilter::new([" "]);
        assert!(filter.is_empty());
        let filter = LexicalFilter::default();
        assert!(!filter.matches(""));
        assert!(!filter.matches("   \n\t"));
    }

    #[test]
    fn test_custom_terms_are_normalised() {
        let filter = LexicalFilter::new(["  TrOlL  ", ""]);
        assert_eq!(filter.len(), 1);
        assert!(filter.matches("such a troll"));
        assert!(!filter.matches("You are an idiot"));
    }

    #[test]
    fn test_parse_list_skips_comments_and_blanks() {
        let filter = LexicalFilter::parse_list("# insults\nclown\n\n  buffoon \n#jerk\n");
        assert_eq!(filter.len(), 2);
        assert!(filter.matches("BUFFOON"));
        assert!(!filter.matches("jerk"));
    }

    #[test]
    fn test_from_file_rejects_empty_list() {
        let path = std::env::temp_dir().join("hateblock-empty-keywords.txt");
        std::fs::write(&path, "# nothing here\n\n").unwrap();
        assert!(LexicalFilter::from_file(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
