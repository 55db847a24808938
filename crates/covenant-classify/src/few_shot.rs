use async_trait::async_trait;

use covenant_core::category::Category;
use covenant_core::classifier::{Classifier, ScoredCategory, StrategyKind, StrategyOutput};
use covenant_core::error::Result;

use crate::text::{cosine, SparseVector, TfidfVectorizer, ENGLISH_STOP_WORDS};

const MAX_FEATURES: usize = 1000;
const SIMILARITY_WEIGHT: f64 = 0.7;
const KEYWORD_WEIGHT: f64 = 0.3;

const EXAMPLES: &[(Category, &[&str])] = &[
    (
        Category::Employment,
        &[
            "employment agreement specifying salary benefits and job responsibilities",
            "contract of employment with termination conditions and compensation",
            "employee agreement outlining terms of service and benefits",
        ],
    ),
    (
        Category::Nda,
        &[
            "confidentiality agreement between parties to protect proprietary information",
            "non-disclosure agreement prohibiting disclosure of trade secrets",
            "NDA protecting confidential business information during discussions",
        ],
    ),
    (
        Category::Partnership,
        &[
            "partnership agreement establishing business collaboration terms",
            "joint venture agreement with profit sharing and management structure",
            "partnership contract outlining roles responsibilities and contributions",
        ],
    ),
    (
        Category::Service,
        &[
            "service level agreement defining uptime guarantees and performance metrics",
            "SLA outlining response times and availability commitments",
            "service agreement with performance standards and remedies",
        ],
    ),
    (
        Category::Vendor,
        &[
            "vendor contract for supply of goods and services with payment terms",
            "supplier agreement outlining delivery schedules and quality standards",
            "purchasing agreement with vendor performance requirements",
        ],
    ),
];

const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Employment,
        &[
            "employment", "salary", "benefits", "termination", "job", "wages", "employee",
            "employer",
        ],
    ),
    (
        Category::Nda,
        &[
            "confidential", "nda", "non-disclosure", "proprietary", "trade secret", "disclosure",
        ],
    ),
    (
        Category::Partnership,
        &[
            "partnership", "joint venture", "profit sharing", "collaboration", "partner",
            "venture", "joint",
        ],
    ),
    (
        Category::Service,
        &[
            "sla", "service level", "uptime", "response time", "performance", "availability",
            "guarantee",
        ],
    ),
    (
        Category::Vendor,
        &[
            "vendor", "supplier", "purchase", "delivery", "goods", "services", "procurement",
            "supply",
        ],
    ),
];

struct CategoryExamples {
    category: Category,
    vectors: Vec<SparseVector>,
    keywords: &'static [&'static str],
}

/// Few-shot matcher: similarity to a handful of labelled example sentences,
/// blended with keyword coverage.
///
/// The vectorizer is fitted once on the examples at construction; after that
/// the matcher is immutable and deterministic.
pub struct FewShotMatcher {
    vectorizer: TfidfVectorizer,
    categories: Vec<CategoryExamples>,
}

impl FewShotMatcher {
    pub fn new() -> Self {
        let corpus: Vec<&str> = EXAMPLES
            .iter()
            .flat_map(|(_, examples)| examples.iter().copied())
            .collect();
        let vectorizer = TfidfVectorizer::fit(&corpus, ENGLISH_STOP_WORDS, MAX_FEATURES);

        let categories = EXAMPLES
            .iter()
            .map(|(category, examples)| CategoryExamples {
                category: *category,
                vectors: examples.iter().map(|e| vectorizer.transform(e)).collect(),
                keywords: KEYWORDS
                    .iter()
                    .find(|(c, _)| c == category)
                    .map(|(_, k)| *k)
                    .unwrap_or(&[]),
            })
            .collect();

        Self {
            vectorizer,
            categories,
        }
    }

    /// Mean cosine similarity between the input and a category's examples.
    fn similarity(input: &SparseVector, examples: &CategoryExamples) -> f64 {
        if examples.vectors.is_empty() {
            return 0.0;
        }
        let total: f64 = examples.vectors.iter().map(|v| cosine(input, v)).sum();
        total / examples.vectors.len() as f64
    }

    /// Fraction of a category's keywords present as whole words or phrases.
    fn keyword_coverage(padded_words: &str, keywords: &[&str]) -> f64 {
        if keywords.is_empty() {
            return 0.0;
        }
        let matches = keywords
            .iter()
            .filter(|kw| padded_words.contains(&format!(" {kw} ")))
            .count();
        matches as f64 / keywords.len() as f64
    }

    /// Lowercased words (hyphenated words kept whole) joined by single
    /// spaces, with a leading and trailing space for whole-word lookup.
    fn padded_words(text: &str) -> String {
        let words: Vec<&str> = text
            .split(|c: char| !(c.is_alphanumeric() || c == '-'))
            .map(|w| w.trim_matches('-'))
            .filter(|w| !w.is_empty())
            .collect();
        format!(" {} ", words.join(" ").to_lowercase())
    }

    pub fn scores(&self, text: &str) -> Vec<ScoredCategory> {
        let input = self.vectorizer.transform(text);
        let padded = Self::padded_words(text);

        self.categories
            .iter()
            .map(|examples| {
                let similarity = Self::similarity(&input, examples);
                let coverage = Self::keyword_coverage(&padded, examples.keywords);
                ScoredCategory {
                    category: examples.category,
                    confidence: (SIMILARITY_WEIGHT * similarity + KEYWORD_WEIGHT * coverage)
                        .clamp(0.0, 1.0),
                }
            })
            .collect()
    }
}

impl Default for FewShotMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for FewShotMatcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FewShot
    }

    async fn classify(&self, text: &str) -> Result<StrategyOutput> {
        if text.trim().is_empty() {
            return Ok(StrategyOutput::abstain());
        }

        let scores = self.scores(text);
        // Ties resolve to the earlier category in registry order.
        let best = scores
            .iter()
            .copied()
            .fold(None::<ScoredCategory>, |best, s| match best {
                Some(b) if b.confidence >= s.confidence => Some(b),
                _ => Some(s),
            });

        match best {
            Some(best) if best.confidence > 0.0 => {
                tracing::debug!(
                    category = %best.category,
                    confidence = best.confidence,
                    "Few-shot match"
                );
                Ok(StrategyOutput::labelled(best.category, best.confidence, scores))
            }
            _ => Ok(StrategyOutput {
                scores,
                ..StrategyOutput::abstain()
            }),
        }
    }
}
