use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

const MIN_TOKEN_LEN: usize = 2;

const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by",
    "can", "could", "do", "for", "from", "had", "has", "have", "he", "her", "his", "how", "i",
    "if", "in", "into", "is", "it", "its", "just", "like", "me", "more", "my", "no", "not", "of",
    "on", "or", "our", "out", "she", "so", "some", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "to", "up", "us", "was", "we", "were", "what", "when",
    "which", "who", "will", "with", "would", "you", "your",
];

/// Options controlling vocabulary construction at fit time.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Terms appearing in fewer documents than this are dropped.
    pub min_df: usize,
    /// Upper bound on vocabulary size; `None` keeps every surviving term.
    pub max_features: Option<usize>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            min_df: 1,
            max_features: None,
        }
    }
}

/// Fitted TF-IDF vectorizer over a fixed vocabulary.
///
/// Vectors are raw term counts weighted by smoothed IDF
/// (`ln((N + 1) / (df + 1)) + 1`) and L2-normalized. The same instance
/// vectorizes the corpus at build time and queries at request time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorizerModel {
    terms: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl VectorizerModel {
    /// Rebuild a model from persisted `(term, idf)` pairs in dimension order.
    pub fn from_parts(entries: Vec<(String, f32)>) -> Self {
        let mut terms = Vec::with_capacity(entries.len());
        let mut idf = Vec::with_capacity(entries.len());
        for (term, weight) in entries {
            terms.push(term);
            idf.push(weight);
        }
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        Self { terms, index, idf }
    }

    /// Fit vocabulary and IDF weights over a document collection.
    ///
    /// Deterministic: when `max_features` truncates, terms are kept by
    /// descending document frequency with lexicographic tie-break, and the
    /// final vocabulary is sorted lexicographically.
    pub fn fit<S: AsRef<str>>(documents: &[S], options: FitOptions) -> Self {
        let doc_count = documents.len();
        let mut doc_frequencies: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let unique: HashSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for term in unique {
                *doc_frequencies.entry(term).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<(String, usize)> = doc_frequencies
            .into_iter()
            .filter(|(_, df)| *df >= options.min_df.max(1))
            .collect();
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(limit) = options.max_features {
            kept.truncate(limit);
        }
        kept.sort_by(|a, b| a.0.cmp(&b.0));

        let n = doc_count as f32;
        let entries = kept
            .into_iter()
            .map(|(term, df)| {
                let idf = ((n + 1.0) / (df as f32 + 1.0)).ln() + 1.0;
                (term, idf)
            })
            .collect();
        Self::from_parts(entries)
    }

    /// Vector dimension, equal to the vocabulary size.
    pub fn dim(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f32] {
        &self.idf
    }

    /// Map text to a unit-length TF-IDF vector, or the zero vector when no
    /// in-vocabulary term survives tokenization.
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim()];
        for token in tokenize(text) {
            if let Some(&idx) = self.index.get(&token) {
                vector[idx] += self.idf[idx];
            }
        }
        normalize_vector(&mut vector);
        vector
    }
}

/// Split text into lowercase terms, dropping stop words, pure numbers and
/// single characters.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.chars().count() >= MIN_TOKEN_LEN)
        .filter(|s| !s.chars().all(|c| c.is_numeric()))
        .filter(|s| !is_stop_word(s))
        .map(String::from)
        .collect()
}

fn normalize(input: &str) -> Cow<'_, str> {
    Cow::Owned(input.trim().to_lowercase())
}

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

fn normalize_vector(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for v in vector {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> VectorizerModel {
        VectorizerModel::fit(
            &[
                "chicken garlic lemon",
                "chicken rice soup",
                "chocolate cake flour sugar",
            ],
            FitOptions::default(),
        )
    }

    #[test]
    fn stop_words_are_sorted_for_binary_search() {
        let mut sorted = STOP_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOP_WORDS);
    }

    #[test]
    fn tokenize_folds_case_and_drops_noise() {
        let tokens = tokenize("The Chicken, and 2 cups of RICE! a");
        assert_eq!(tokens, vec!["chicken", "cups", "rice"]);
    }

    #[test]
    fn fit_builds_sorted_vocabulary() {
        let model = sample_model();
        let terms: Vec<&str> = model.terms().iter().map(String::as_str).collect();
        assert_eq!(
            terms,
            vec![
                "cake",
                "chicken",
                "chocolate",
                "flour",
                "garlic",
                "lemon",
                "rice",
                "soup",
                "sugar"
            ]
        );
        let chicken = model.idf()[1];
        let garlic = model.idf()[4];
        assert!(chicken < garlic, "common terms weigh less");
    }

    #[test]
    fn max_features_keeps_most_frequent_terms() {
        let model = VectorizerModel::fit(
            &["chicken garlic", "chicken rice", "rice beans"],
            FitOptions {
                min_df: 1,
                max_features: Some(2),
            },
        );
        assert_eq!(model.terms(), &["chicken".to_string(), "rice".to_string()]);
    }

    #[test]
    fn min_df_filters_rare_terms() {
        let model = VectorizerModel::fit(
            &["chicken garlic", "chicken rice"],
            FitOptions {
                min_df: 2,
                max_features: None,
            },
        );
        assert_eq!(model.terms(), &["chicken".to_string()]);
    }

    #[test]
    fn vectorize_is_unit_length_and_deterministic() {
        let model = sample_model();
        let first = model.vectorize("Garlic chicken");
        let second = model.vectorize("Garlic chicken");
        assert_eq!(first, second);
        assert_eq!(first.len(), model.dim());
        let norm: f32 = first.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_and_stop_word_text_yields_zero_vector() {
        let model = sample_model();
        for text in ["", "   ", "the and of", "unknownterm"] {
            let vector = model.vectorize(text);
            assert_eq!(vector.len(), model.dim());
            assert!(vector.iter().all(|v| *v == 0.0), "{text:?}");
        }
    }

    #[test]
    fn from_parts_round_trips_fitted_model() {
        let model = sample_model();
        let entries = model
            .terms()
            .iter()
            .cloned()
            .zip(model.idf().iter().copied())
            .collect();
        assert_eq!(VectorizerModel::from_parts(entries), model);
    }
}
