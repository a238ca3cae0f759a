use std::fmt;

use serde::{Deserialize, Serialize};

/// Skill domain a quest belongs to. Declaration order is the tie-break order
/// used by title derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Social,
    Fitness,
    Fun,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Social, Category::Fitness, Category::Fun];

    /// Category used for anything that does not parse.
    pub const FALLBACK: Category = Category::Fun;

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Social => "social",
            Category::Fitness => "fitness",
            Category::Fun => "fun",
        }
    }

    /// Exact, case-sensitive match against the stored category names.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == raw)
    }

    /// Validate-or-default: unknown names map to [`Category::FALLBACK`].
    pub fn parse_or_fallback(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Self::FALLBACK)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Category;

    #[test]
    fn parses_known_categories() {
        assert_eq!(Category::parse("social"), Some(Category::Social));
        assert_eq!(Category::parse("fitness"), Some(Category::Fitness));
        assert_eq!(Category::parse("fun"), Some(Category::Fun));
    }

    #[test]
    fn unknown_categories_fall_back_to_fun() {
        assert_eq!(Category::parse("badminton"), None);
        assert_eq!(Category::parse_or_fallback("badminton"), Category::Fun);
        assert_eq!(Category::parse_or_fallback(""), Category::Fun);
        assert_eq!(Category::parse_or_fallback("Fitness"), Category::Fun);
        assert_eq!(Category::parse_or_fallback("social"), Category::Social);
    }

    #[test]
    fn display_matches_stored_name() {
        for category in Category::ALL {
            assert_eq!(category.to_string(), category.as_str());
        }
    }
}
