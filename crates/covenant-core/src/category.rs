//! The closed set of contract categories and the registry that maps
//! free-form labels onto it.
//!
//! Every strategy's output passes through [`validate`] before it reaches a
//! caller, so a misspelled or invented label never leaks out of the service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CovenantError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Employment,
    #[serde(rename = "NDA")]
    Nda,
    Partnership,
    Service,
    Vendor,
    /// Abstain sentinel: no strategy could map the input onto a known category.
    Unknown,
}

impl Category {
    /// The supported categories in registry order. `Unknown` is not part of it.
    pub const ALL: [Category; 5] = [
        Category::Employment,
        Category::Nda,
        Category::Partnership,
        Category::Service,
        Category::Vendor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employment => "Employment",
            Self::Nda => "NDA",
            Self::Partnership => "Partnership",
            Self::Service => "Service",
            Self::Vendor => "Vendor",
            Self::Unknown => "Unknown",
        }
    }

    /// Long-form name, as used in prompts and training labels.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Employment => "Employment Contracts",
            Self::Nda => "Non-Disclosure Agreements",
            Self::Partnership => "Partnership Agreements",
            Self::Service => "Service-Level Agreements",
            Self::Vendor => "Vendor Agreements",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CovenantError;

    fn from_str(s: &str) -> Result<Self> {
        validate(s)
    }
}

/// Phrases (already cleaned and singularized) that resolve to a category.
const ALIASES: &[(&str, Category)] = &[
    ("employment", Category::Employment),
    ("employee", Category::Employment),
    ("employer", Category::Employment),
    ("job", Category::Employment),
    ("work", Category::Employment),
    ("nda", Category::Nda),
    ("non disclosure", Category::Nda),
    ("nondisclosure", Category::Nda),
    ("confidentiality", Category::Nda),
    ("confidential disclosure", Category::Nda),
    ("partnership", Category::Partnership),
    ("partner", Category::Partnership),
    ("business partnership", Category::Partnership),
    ("joint venture", Category::Partnership),
    ("service", Category::Service),
    ("service level", Category::Service),
    ("sla", Category::Service),
    ("master service", Category::Service),
    ("professional service", Category::Service),
    ("vendor", Category::Vendor),
    ("supplier", Category::Vendor),
    ("supply", Category::Vendor),
    ("procurement", Category::Vendor),
    ("purchasing", Category::Vendor),
];

/// Nouns that carry no category information on their own.
const FILLER_WORDS: &[&str] = &["a", "an", "the", "agreement", "contract", "type", "category"];

/// Resolve a free-form label to one of the five supported categories.
///
/// Exact canonical names and long-form descriptions match directly. Anything
/// else is normalized (trimmed, case-folded, punctuation stripped, plurals
/// singularized, filler nouns dropped) and looked up in the alias table.
pub fn validate(label: &str) -> Result<Category> {
    let trimmed = label.trim();
    if let Some(category) = Category::ALL
        .iter()
        .find(|c| c.as_str() == trimmed || c.description() == trimmed)
    {
        return Ok(*category);
    }

    let normalized = normalize(trimmed);
    if normalized.is_empty() {
        return Err(CovenantError::UnknownCategory(label.to_string()));
    }

    ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, category)| *category)
        .ok_or_else(|| CovenantError::UnknownCategory(label.to_string()))
}

fn normalize(label: &str) -> String {
    let cleaned: String = label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .map(singularize)
        .filter(|word| !FILLER_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn singularize(word: &str) -> &str {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        &word[..word.len() - 1]
    } else {
        word
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(validate(category.as_str()).unwrap(), category);
            assert_eq!(validate(category.description()).unwrap(), category);
        }
    }

    #[test]
    fn normalizes_case_whitespace_and_plurals() {
        assert_eq!(validate("  employment  ").unwrap(), Category::Employment);
        assert_eq!(validate("NDAs").unwrap(), Category::Nda);
        assert_eq!(validate("non-disclosure agreements").unwrap(), Category::Nda);
        assert_eq!(validate("\"Vendor Agreement\"").unwrap(), Category::Vendor);
        assert_eq!(validate("service level agreement").unwrap(), Category::Service);
        assert_eq!(validate("SLA").unwrap(), Category::Service);
        assert_eq!(validate("Partnerships.").unwrap(), Category::Partnership);
        assert_eq!(validate("Joint Venture Agreement").unwrap(), Category::Partnership);
    }

    #[test]
    fn rejects_out_of_vocabulary_labels() {
        assert!(matches!(
            validate("Lease"),
            Err(CovenantError::UnknownCategory(ref l)) if l == "Lease"
        ));
        assert!(validate("").is_err());
        assert!(validate("agreement").is_err());
        assert!(validate("Unknown").is_err());
    }

    #[test]
    fn serializes_with_canonical_names() {
        assert_eq!(serde_json::to_string(&Category::Nda).unwrap(), "\"NDA\"");
        assert_eq!(
            serde_json::to_string(&Category::Unknown).unwrap(),
            "\"Unknown\""
        );
        let parsed: Category = serde_json::from_str("\"Service\"").unwrap();
        assert_eq!(parsed, Category::Service);
    }

    #[test]
    fn registry_order_is_fixed() {
        let names: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, ["Employment", "NDA", "Partnership", "Service", "Vendor"]);
    }
}
