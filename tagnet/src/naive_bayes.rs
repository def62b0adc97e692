//! Binary relevance multinomial Naive Bayes.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use log::debug;

use crate::classifier::{self, Classifier, FieldModels};
use crate::corpus::{Corpus, Field, WordCounts};
use crate::errors::{Result, TagnetError};
use crate::tags::{TagId, TagVocabulary};
use crate::utils;

/// Per-tag log-odds of a document.
///
/// Tags that had no training document have no entry and are never predicted.
#[derive(Clone, Debug, PartialEq)]
pub struct LogOdds(Vec<Option<f64>>);

impl LogOdds {
    pub fn get(&self, tag: TagId) -> Option<f64> {
        self.0.get(tag).copied().flatten()
    }

    /// Iterates over the defined entries in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (TagId, f64)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(tag, lo)| lo.map(|lo| (tag, lo)))
    }

    /// Tags on the positive side of the decision boundary.
    pub fn positive(&self) -> BTreeSet<TagId> {
        self.iter()
            .filter(|&(_, lo)| lo >= 0.0)
            .map(|(tag, _)| tag)
            .collect()
    }

    /// The highest scoring tag. The first tag wins on ties.
    pub fn best(&self) -> Option<(TagId, f64)> {
        utils::first_max_by(self.iter(), |&(_, lo)| lo).map(|(best, _)| best)
    }
}

impl From<Vec<Option<f64>>> for LogOdds {
    fn from(scores: Vec<Option<f64>>) -> Self {
        Self(scores)
    }
}

/// Naive Bayes tables of a single field.
#[derive(Clone, Debug)]
pub struct NaiveBayesModel {
    tags: TagVocabulary,
    n_docs: usize,
    tag_doc_counts: Vec<usize>,
    prior_tag: Vec<Option<f64>>,
    prior_not_tag: Vec<f64>,
    smooth: f64,
    word_tag: Vec<HashMap<String, f64>>,
    word_not_tag: Vec<HashMap<String, f64>>,
}

impl NaiveBayesModel {
    /// Trains the tables of `field` on `train_ids`.
    ///
    /// # Errors
    ///
    /// [`TagnetError::DegenerateInput`] will be returned if there is no training document, if
    /// the field has no word, or if no training document carries a tag of `tags`.
    pub fn train(
        corpus: &Corpus,
        field: Field,
        train_ids: &[&str],
        tags: &TagVocabulary,
    ) -> Result<Self> {
        if train_ids.is_empty() {
            return Err(TagnetError::degenerate_input("no training documents"));
        }
        let mut vocab_all: HashMap<&str, u64> = HashMap::new();
        let mut count_all = 0;
        let mut vocab_tag: Vec<HashMap<&str, u64>> = vec![HashMap::new(); tags.len()];
        let mut count_tag = vec![0; tags.len()];
        let mut tag_doc_counts = vec![0; tags.len()];

        for &id in train_ids {
            let doc = corpus.document(id)?;
            let doc_tags = tags.filter(doc.tags());
            let text = doc.field(field);
            for (w, &c) in text.iter() {
                *vocab_all.entry(w.as_str()).or_insert(0) += u64::from(c);
                count_all += u64::from(c);
            }
            for &t in &doc_tags {
                tag_doc_counts[t] += 1;
                for (w, &c) in text.iter() {
                    *vocab_tag[t].entry(w.as_str()).or_insert(0) += u64::from(c);
                    count_tag[t] += u64::from(c);
                }
            }
        }

        if vocab_all.is_empty() {
            return Err(TagnetError::degenerate_input(format!(
                "field `{field}` has an empty vocabulary"
            )));
        }
        if tag_doc_counts.iter().all(|&c| c == 0) {
            return Err(TagnetError::degenerate_input(
                "no training document carries a vocabulary tag",
            ));
        }

        let n_docs = train_ids.len();
        let log_n_docs = (n_docs as f64).ln();
        let mut prior_tag = vec![None; tags.len()];
        let mut prior_not_tag = vec![0.0; tags.len()];
        for (t, &c) in tag_doc_counts.iter().enumerate() {
            if c == 0 {
                continue;
            }
            prior_tag[t] = Some((c as f64).ln() - log_n_docs);
            // A tag covering every document keeps a zero complement.
            if c < n_docs {
                prior_not_tag[t] = ((n_docs - c) as f64).ln() - log_n_docs;
            }
        }

        let v = vocab_all.len() as f64;
        let smooth = 1f64.ln() - v.ln();

        let mut word_tag = vec![HashMap::new(); tags.len()];
        let mut word_not_tag = vec![HashMap::new(); tags.len()];
        for (&w, &c) in &vocab_all {
            for t in tags.ids() {
                // Words never seen with the tag use zero for both the in-tag count and total.
                let (tag_count, tag_total) = if let Some(&tc) = vocab_tag[t].get(w) {
                    word_tag[t].insert(
                        w.to_string(),
                        (tc as f64 + 1.0).ln() - (count_tag[t] as f64 + v).ln(),
                    );
                    (tc, count_tag[t])
                } else {
                    (0, 0)
                };
                let lp_not_tag = ((c - tag_count) as f64 + 1.0).ln()
                    - ((count_all - tag_total) as f64 + v).ln();
                word_not_tag[t].insert(w.to_string(), lp_not_tag);
            }
        }
        debug!(
            "naive bayes: field={field} docs={n_docs} vocabulary={} words={count_all}",
            vocab_all.len()
        );

        Ok(Self {
            tags: tags.clone(),
            n_docs,
            tag_doc_counts,
            prior_tag,
            prior_not_tag,
            smooth,
            word_tag,
            word_not_tag,
        })
    }

    /// Vocabulary the model was trained on.
    pub fn tags(&self) -> &TagVocabulary {
        &self.tags
    }

    pub fn n_tags(&self) -> usize {
        self.prior_tag.len()
    }

    pub fn n_docs(&self) -> usize {
        self.n_docs
    }

    pub fn tag_doc_count(&self, tag: TagId) -> usize {
        self.tag_doc_counts[tag]
    }

    /// Gets the log prior of `tag` and of its complement.
    pub fn prior(&self, tag: TagId) -> Option<(f64, f64)> {
        self.prior_tag[tag].map(|p| (p, self.prior_not_tag[tag]))
    }

    /// Gets the prior log-odds of `tag`.
    pub fn prior_log_odds(&self, tag: TagId) -> Option<f64> {
        self.prior(tag).map(|(p, np)| p - np)
    }

    /// Log probability used for words outside a table.
    pub fn smooth(&self) -> f64 {
        self.smooth
    }

    /// Computes the log-odds of every trained tag for a document.
    pub fn log_odds(&self, words: &WordCounts) -> LogOdds {
        // Fixed summation order keeps the result independent of the hash order.
        let mut words: Vec<(&str, f64)> = words
            .iter()
            .map(|(w, &c)| (w.as_str(), f64::from(c)))
            .collect();
        words.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut scores = vec![None; self.n_tags()];
        for (t, score) in scores.iter_mut().enumerate() {
            let Some((prior, prior_not)) = self.prior(t) else {
                continue;
            };
            let mut lo = prior - prior_not;
            for &(w, c) in &words {
                let lp_tag = self.word_tag[t].get(w).copied().unwrap_or(self.smooth);
                let lp_not_tag = self.word_not_tag[t].get(w).copied().unwrap_or(self.smooth);
                lo += c * (lp_tag - lp_not_tag);
            }
            *score = Some(lo);
        }
        LogOdds(scores)
    }

    pub(crate) fn check_tags(&self, tags: &TagVocabulary) -> Result<()> {
        classifier::check_vocabulary(&self.tags, tags)
    }
}

/// Binary relevance multinomial Naive Bayes classifier.
///
/// Every tag is an independent binary decision taken at the Bayes boundary `log-odds >= 0`.
///
/// # Examples
///
/// ```
/// use tagnet::{Classifier, Corpus, Document, Field, NaiveBayes, WordCounts};
///
/// let mut corpus = Corpus::new();
/// for (id, tags, title) in [
///     ("1", vec!["A"], "cat dog"),
///     ("2", vec!["A", "B"], "dog bird"),
///     ("3", vec!["B"], "bird fish"),
/// ] {
///     let title = WordCounts::from_tokens(title.split_whitespace());
///     corpus.push_document(Document::new(id, tags, title, WordCounts::new())).unwrap();
/// }
/// let tags = corpus.tag_vocabulary().unwrap();
///
/// let model = NaiveBayes.train(&corpus, &[Field::Title], &corpus.doc_ids(), &tags).unwrap();
/// let predicted = NaiveBayes
///     .predict(&model, Field::Title, &WordCounts::from_tokens(["cat"]), &tags)
///     .unwrap();
/// assert!(predicted.contains(&tags.id("A").unwrap()));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct NaiveBayes;

impl Classifier for NaiveBayes {
    type Model = FieldModels<NaiveBayesModel>;

    fn name(&self) -> &'static str {
        "nb"
    }

    fn train(
        &self,
        corpus: &Corpus,
        fields: &[Field],
        train_ids: &[&str],
        tags: &TagVocabulary,
    ) -> Result<Self::Model> {
        FieldModels::train_each(fields, |field| {
            NaiveBayesModel::train(corpus, field, train_ids, tags)
        })
    }

    fn predict(
        &self,
        model: &Self::Model,
        field: Field,
        words: &WordCounts,
        tags: &TagVocabulary,
    ) -> Result<BTreeSet<TagId>> {
        let model = model.get(field)?;
        model.check_tags(tags)?;
        Ok(model.log_odds(words).positive())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use crate::corpus::Document;

    /// Four documents over tags {A, B}.
    pub(crate) fn pet_corpus() -> Corpus {
        let mut corpus = Corpus::new();
        for (id, tags, title) in [
            ("1", vec!["A"], "cat dog"),
            ("2", vec!["A", "B"], "dog bird"),
            ("3", vec!["B"], "bird fish"),
            ("4", vec!["A", "B"], "cat fish"),
        ] {
            corpus
                .push_document(Document::new(
                    id,
                    tags,
                    WordCounts::from_tokens(title.split_whitespace()),
                    WordCounts::new(),
                ))
                .unwrap();
        }
        corpus
    }

    fn train_title(corpus: &Corpus, tags: &TagVocabulary) -> NaiveBayesModel {
        NaiveBayesModel::train(corpus, Field::Title, &corpus.doc_ids(), tags).unwrap()
    }

    #[test]
    fn test_prior_reconstructs_frequencies() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let model = train_title(&corpus, &tags);

        for t in tags.ids() {
            let (p, np) = model.prior(t).unwrap();
            let expected = model.tag_doc_count(t) as f64 / model.n_docs() as f64;
            assert!((p.exp() - expected).abs() < 1e-12);
            assert!((np.exp() - (1.0 - expected)).abs() < 1e-12);
            assert!((p.exp() + np.exp() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_prior_saturated_tag() {
        let mut corpus = Corpus::new();
        for (id, title) in [("1", "a b"), ("2", "b c")] {
            corpus
                .push_document(Document::new(
                    id,
                    ["all"],
                    WordCounts::from_tokens(title.split_whitespace()),
                    WordCounts::new(),
                ))
                .unwrap();
        }
        let tags = corpus.tag_vocabulary().unwrap();
        let model = train_title(&corpus, &tags);

        assert_eq!(Some((0.0, 0.0)), model.prior(0));
    }

    #[test]
    fn test_word_tables() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let model = train_title(&corpus, &tags);

        // V = 4, A: cat 2, dog 2, bird 1, fish 1 (6 words); all: 8 words.
        assert!((model.smooth() - (-(4f64).ln())).abs() < 1e-12);
        let lp = model.word_tag[0]["dog"];
        assert!((lp - (3f64.ln() - 10f64.ln())).abs() < 1e-12);
        let lp_not = model.word_not_tag[0]["dog"];
        assert!((lp_not - (1f64.ln() - 6f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_predict_dog() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let model = NaiveBayes
            .train(&corpus, &[Field::Title], &corpus.doc_ids(), &tags)
            .unwrap();

        let predicted = NaiveBayes
            .predict(&model, Field::Title, &WordCounts::from_tokens(["dog"]), &tags)
            .unwrap();

        assert!(!predicted.is_empty());
        assert!(predicted.iter().all(|&t| t < tags.len()));
        assert_eq!(vec!["A", "B"], tags.names(&predicted));
    }

    #[test]
    fn test_log_odds_dog() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let model = train_title(&corpus, &tags);

        let lo = model.log_odds(&WordCounts::from_tokens(["dog"]));

        assert!((lo.get(0).unwrap() - (3f64.ln() + 1.8f64.ln())).abs() < 1e-12);
        assert!((lo.get(1).unwrap() - (3f64.ln() + 0.6f64.ln())).abs() < 1e-12);
        assert_eq!(Some(0), lo.best().map(|(t, _)| t));
    }

    #[test]
    fn test_predict_empty_document_uses_priors() {
        let mut corpus = pet_corpus();
        corpus
            .push_document(Document::new(
                "5",
                ["C"],
                WordCounts::from_tokens(["eel"]),
                WordCounts::new(),
            ))
            .unwrap();
        let tags = TagVocabulary::new(["A", "B", "C"]).unwrap();
        let model = train_title(&corpus, &tags);

        let predicted = model.log_odds(&WordCounts::new()).positive();
        let expected: BTreeSet<_> = tags
            .ids()
            .filter(|&t| model.prior_log_odds(t).unwrap() >= 0.0)
            .collect();

        assert_eq!(expected, predicted);
        assert!(!predicted.contains(&2));
    }

    #[test]
    fn test_untrained_tag_never_predicted() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B", "Z"]).unwrap();
        let model = train_title(&corpus, &tags);

        let lo = model.log_odds(&WordCounts::from_tokens(["cat", "dog"]));

        assert_eq!(None, lo.get(2));
        assert_eq!(None, model.prior(2));
        assert!(!lo.positive().contains(&2));
    }

    #[test]
    fn test_predict_order_independent() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let model = train_title(&corpus, &tags);

        let w1: WordCounts = [("fish", 2), ("bird", 1), ("cat", 1)].into_iter().collect();
        let w2: WordCounts = [("cat", 1), ("fish", 2), ("bird", 1)].into_iter().collect();

        assert_eq!(model.log_odds(&w1), model.log_odds(&w2));
    }

    #[test]
    fn test_predict_tag_order_independent() {
        let corpus = pet_corpus();
        let mut predictions = vec![];
        for order in [["A", "B"], ["B", "A"]] {
            let tags = TagVocabulary::new(order).unwrap();
            let model = NaiveBayes
                .train(&corpus, &[Field::Title], &corpus.doc_ids(), &tags)
                .unwrap();
            for words in [vec!["dog"], vec!["bird", "fish"], vec!["cat"]] {
                let predicted = NaiveBayes
                    .predict(&model, Field::Title, &WordCounts::from_tokens(words), &tags)
                    .unwrap();
                let names: BTreeSet<String> = tags
                    .names(&predicted)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                predictions.push(names);
            }
        }

        assert_eq!(predictions[..3], predictions[3..]);
    }

    #[test]
    fn test_predict_other_vocabulary() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let model = NaiveBayes
            .train(&corpus, &[Field::Title], &corpus.doc_ids(), &tags)
            .unwrap();
        let swapped = TagVocabulary::new(["B", "A"]).unwrap();

        let result = NaiveBayes.predict(
            &model,
            Field::Title,
            &WordCounts::from_tokens(["dog"]),
            &swapped,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_train_empty_vocabulary() {
        let mut corpus = Corpus::new();
        corpus
            .push_document(Document::new(
                "1",
                ["A"],
                WordCounts::new(),
                WordCounts::from_tokens(["x"]),
            ))
            .unwrap();
        let tags = corpus.tag_vocabulary().unwrap();

        let result = NaiveBayesModel::train(&corpus, Field::Title, &["1"], &tags);

        assert!(result.is_err());
        assert_eq!(
            "DegenerateInputError: field `title` has an empty vocabulary",
            &result.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_train_no_documents() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();

        assert!(NaiveBayesModel::train(&corpus, Field::Title, &[], &tags).is_err());
    }

    #[test]
    fn test_predict_untrained_field() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let model = NaiveBayes
            .train(&corpus, &[Field::Title], &corpus.doc_ids(), &tags)
            .unwrap();

        let result = NaiveBayes.predict(&model, Field::Body, &WordCounts::new(), &tags);

        assert!(result.is_err());
    }
}
