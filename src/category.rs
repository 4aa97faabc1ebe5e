// 🏷️ Contest Categories - the five fixed voting categories
//
// Every vote targets exactly one of these. Labels coming from clients are
// matched exactly against the canonical list, then mapped to a fixed counter
// column. Column names are never built from request text.

use serde::{Deserialize, Serialize};

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Overall,
    Scariest,
    Funniest,
    #[serde(rename = "Homemade/DIY")]
    HomemadeDiy,
    Family,
}

/// The implicit tag every entry carries.
pub const DEFAULT_TAG: &str = "Overall";

impl Category {
    /// All categories, in display order
    pub const ALL: [Category; 5] = [
        Category::Overall,
        Category::Scariest,
        Category::Funniest,
        Category::HomemadeDiy,
        Category::Family,
    ];

    /// Public label, as clients send and receive it
    pub fn label(&self) -> &'static str {
        match self {
            Category::Overall => "Overall",
            Category::Scariest => "Scariest",
            Category::Funniest => "Funniest",
            Category::HomemadeDiy => "Homemade/DIY",
            Category::Family => "Family",
        }
    }

    /// Counter column in the `entries` table
    pub fn column(&self) -> &'static str {
        match self {
            Category::Overall => "votes_overall",
            Category::Scariest => "votes_scariest",
            Category::Funniest => "votes_funniest",
            Category::HomemadeDiy => "votes_homemade_diy",
            Category::Family => "votes_family",
        }
    }

    /// Exact, case-sensitive label lookup. "overall" or "Homemade" are rejected.
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.label() == label)
    }

    /// Position inside `ALL`, used to index per-category arrays
    pub fn index(&self) -> usize {
        match self {
            Category::Overall => 0,
            Category::Scariest => 1,
            Category::Funniest => 2,
            Category::HomemadeDiy => 3,
            Category::Family => 4,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// TAG NORMALIZATION
// ============================================================================

/// Parse the `categories` form field (a JSON-encoded list of strings).
///
/// Anything that isn't a JSON list yields an empty list; non-string items in
/// a list are skipped. The result still needs `normalize_categories`.
pub fn parse_category_tags(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Trim tags, drop blanks and case-insensitive duplicates, and make sure
/// "Overall" is present. The returned list is never empty.
pub fn normalize_categories<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();

    for tag in tags {
        let trimmed = tag.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if normalized.iter().any(|t| same_tag(t, trimmed)) {
            continue;
        }
        normalized.push(trimmed.to_string());
    }

    if !normalized.iter().any(|t| same_tag(t, DEFAULT_TAG)) {
        normalized.push(DEFAULT_TAG.to_string());
    }

    normalized
}

fn same_tag(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.label()), Some(category));
        }
        assert_eq!(Category::from_label("Homemade/DIY"), Some(Category::HomemadeDiy));
    }

    #[test]
    fn test_unknown_labels_rejected() {
        assert_eq!(Category::from_label("Spookiest"), None);
        assert_eq!(Category::from_label("overall"), None);
        assert_eq!(Category::from_label("Homemade"), None);
        assert_eq!(Category::from_label(""), None);
        assert_eq!(Category::from_label("votes_overall = 0; --"), None);
    }

    #[test]
    fn test_columns_are_distinct() {
        let mut columns: Vec<&str> = Category::ALL.iter().map(|c| c.column()).collect();
        columns.sort();
        columns.dedup();
        assert_eq!(columns.len(), 5);
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Category::HomemadeDiy).unwrap();
        assert_eq!(json, "\"Homemade/DIY\"");
        let back: Category = serde_json::from_str("\"Scariest\"").unwrap();
        assert_eq!(back, Category::Scariest);
    }

    #[test]
    fn test_overall_appended() {
        assert_eq!(normalize_categories(["scary"]), vec!["scary", "Overall"]);
    }

    #[test]
    fn test_overall_not_duplicated() {
        assert_eq!(normalize_categories(["  overall ", "Funniest"]), vec!["overall", "Funniest"]);
        assert_eq!(normalize_categories(["OVERALL"]), vec!["OVERALL"]);
    }

    #[test]
    fn test_blank_and_duplicate_tags_dropped() {
        assert_eq!(
            normalize_categories(["Family", "  ", "family", " Family "]),
            vec!["Family", "Overall"]
        );
    }

    #[test]
    fn test_empty_input_yields_overall() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(normalize_categories(empty), vec!["Overall"]);
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_category_tags(Some(r#"["Scariest","Family"]"#)), vec!["Scariest", "Family"]);
        assert_eq!(parse_category_tags(Some(r#"["Scariest", 3, null]"#)), vec!["Scariest"]);
    }

    #[test]
    fn test_malformed_tags_yield_overall_only() {
        for raw in [Some("not json"), Some(r#"{"a":1}"#), Some("\"Scariest\""), Some(""), None] {
            let tags = parse_category_tags(raw);
            assert!(tags.is_empty(), "expected no tags for {:?}", raw);
            assert_eq!(normalize_categories(tags), vec!["Overall"]);
        }
    }

    #[test]
    fn test_normalize_folds_non_ascii_case() {
        assert_eq!(
            normalize_categories(["Élégant", "élégant", "ÉLÉGANT"]),
            vec!["Élégant", "Overall"]
        );
    }
}
