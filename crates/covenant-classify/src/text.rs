//! Tokenization and TF-IDF weighting shared by the few-shot and statistical
//! strategies.
//!
//! Weighting follows the conventions of scikit-learn's `TfidfVectorizer` with
//! default settings (word runs of two or more characters, smoothed idf, L2
//! norm) so that exported model artifacts score identically here.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Sparse feature vector: column index to weight.
pub type SparseVector = BTreeMap<usize, f64>;

pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "almost", "also", "am", "among",
    "an", "and", "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
    "during", "each", "either", "else", "etc", "ever", "every", "few", "for", "from", "further",
    "had", "has", "have", "having", "he", "her", "here", "hereby", "herein", "hers", "herself",
    "him", "himself", "his", "how", "however", "i", "ie", "if", "in", "into", "is", "it", "its",
    "itself", "just", "may", "me", "might", "more", "most", "must", "my", "myself", "neither",
    "no", "nor", "not", "now", "of", "off", "often", "on", "once", "only", "or", "other",
    "otherwise", "our", "ours", "ourselves", "out", "over", "own", "per", "same", "she",
    "should", "since", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "thereby", "therefore", "these", "they", "this", "those",
    "though", "through", "thus", "to", "too", "under", "until", "up", "upon", "us", "very",
    "via", "was", "we", "were", "what", "when", "where", "whether", "which", "while", "who",
    "whom", "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your",
    "yours", "yourself", "yourselves",
];

/// Lowercased word tokens of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Word n-grams for `min..=max`, joined with single spaces.
pub fn ngrams(tokens: &[String], (min, max): (usize, usize)) -> Vec<String> {
    let mut out = Vec::new();
    for n in min.max(1)..=max {
        if n == 1 {
            out.extend(tokens.iter().cloned());
            continue;
        }
        out.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    out
}

pub fn l2_normalize(vector: &mut SparseVector) {
    let norm = vector.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for v in vector.values_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity of two sparse vectors.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(k, v)| large.get(k).map(|w| v * w))
        .sum();
    let na = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let nb = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    stop_words: HashSet<String>,
    ngram_range: (usize, usize),
    sublinear_tf: bool,
}

impl TfidfVectorizer {
    /// Build from a fitted vocabulary and idf weights.
    pub fn from_parts(
        vocabulary: HashMap<String, usize>,
        idf: Vec<f64>,
        stop_words: impl IntoIterator<Item = String>,
        ngram_range: (usize, usize),
        sublinear_tf: bool,
    ) -> Self {
        Self {
            vocabulary,
            idf,
            stop_words: stop_words.into_iter().collect(),
            ngram_range,
            sublinear_tf,
        }
    }

    /// Fit on a corpus, keeping at most `max_features` terms by corpus frequency.
    /// Columns are assigned in lexical term order.
    pub fn fit(documents: &[&str], stop_words: &[&str], max_features: usize) -> Self {
        let stop_words: HashSet<String> = stop_words.iter().map(|s| s.to_string()).collect();
        let mut corpus_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = Self::terms_with(doc, &stop_words, (1, 1));
            let mut seen = HashSet::new();
            for term in terms {
                *corpus_counts.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term.clone()) {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort();

        let n_docs = documents.len() as f64;
        let idf = terms
            .iter()
            .map(|t| {
                let df = doc_freq.get(t).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();

        Self {
            vocabulary,
            idf,
            stop_words,
            ngram_range: (1, 1),
            sublinear_tf: false,
        }
    }

    fn terms_with(
        text: &str,
        stop_words: &HashSet<String>,
        ngram_range: (usize, usize),
    ) -> Vec<String> {
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|t| !stop_words.contains(t))
            .collect();
        ngrams(&tokens, ngram_range)
    }

    /// L2-normalized TF-IDF vector. Out-of-vocabulary terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in Self::terms_with(text, &self.stop_words, self.ngram_range) {
            if let Some(&col) = self.vocabulary.get(&term) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(col, tf)| {
                let tf = if self.sublinear_tf { tf.ln() + 1.0 } else { tf };
                (col, tf * self.idf.get(col).copied().unwrap_or(0.0))
            })
            .collect();
        l2_normalize(&mut vector);
        vector
    }

    pub fn feature_count(&self) -> usize {
        self.vocabulary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_single_characters_and_punctuation() {
        assert_eq!(
            tokenize("A Non-Disclosure, agreement (NDA) & x"),
            vec!["non", "disclosure", "agreement", "nda"]
        );
    }

    #[test]
    fn bigrams_follow_unigrams() {
        let tokens = tokenize("joint venture terms");
        assert_eq!(
            ngrams(&tokens, (1, 2)),
            vec!["joint", "venture", "terms", "joint venture", "venture terms"]
        );
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v: SparseVector = [(0, 1.0), (3, 2.0)].into_iter().collect();
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-12);
        assert_eq!(cosine(&v, &SparseVector::new()), 0.0);
    }

    #[test]
    fn fit_assigns_lexical_columns_and_smooth_idf() {
        let vec = TfidfVectorizer::fit(&["salary salary benefits", "salary vendor"], &[], 100);
        assert_eq!(vec.feature_count(), 3);
        assert_eq!(vec.vocabulary["benefits"], 0);
        assert_eq!(vec.vocabulary["salary"], 1);
        assert_eq!(vec.vocabulary["vendor"], 2);
        // salary appears in both documents: ln(3/3) + 1
        assert!((vec.idf[1] - 1.0).abs() < 1e-12);
        assert!((vec.idf[0] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn max_features_keeps_most_frequent_terms() {
        let vec = TfidfVectorizer::fit(&["alpha alpha alpha beta beta gamma"], &[], 2);
        assert_eq!(vec.feature_count(), 2);
        assert!(vec.vocabulary.contains_key("alpha"));
        assert!(vec.vocabulary.contains_key("beta"));
    }

    #[test]
    fn transform_is_normalized_and_ignores_stop_words() {
        let vec = TfidfVectorizer::fit(&["the salary", "the vendor"], ENGLISH_STOP_WORDS, 100);
        assert_eq!(vec.feature_count(), 2);
        let v = vec.transform("The salary and the vendor");
        let norm: f64 = v.values().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(vec.transform("the and of").is_empty());
    }
}
