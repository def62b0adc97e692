//! Parametric mixture model trained by expectation-maximization.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;
use log::debug;

use crate::classifier::{self, Classifier, FieldModels};
use crate::corpus::{Corpus, Field, WordCounts};
use crate::errors::{Result, TagnetError};
use crate::tags::{TagId, TagVocabulary};
use crate::utils;

/// Per-tag word distributions of a single field.
#[derive(Clone, Debug)]
pub struct MixtureModel {
    tags: TagVocabulary,
    word_probs: Vec<HashMap<String, f64>>,
    smooth: f64,
    prior: f64,
    iterations: usize,
}

impl MixtureModel {
    /// Vocabulary the model was trained on.
    pub fn tags(&self) -> &TagVocabulary {
        &self.tags
    }

    pub fn n_tags(&self) -> usize {
        self.word_probs.len()
    }

    /// Gets the probability of `word` under `tag`, falling back to the smoothing value.
    pub fn prob(&self, tag: TagId, word: &str) -> f64 {
        self.word_probs[tag].get(word).copied().unwrap_or(self.smooth)
    }

    /// Probability used for words outside a tag's table, `1 / V`.
    pub fn smooth(&self) -> f64 {
        self.smooth
    }

    /// Uniform tag prior, `1 / n_tags`.
    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Number of EM iterations run before convergence.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Log-likelihood of `words` under the uniform mixture of `tags`.
    pub fn log_likelihood(
        &self,
        tags: &[TagId],
        words: &[(&str, f64)],
        include_priors: bool,
    ) -> f64 {
        let size = tags.len() as f64;
        let mut lp = 0.0;
        for &(w, c) in words {
            let p: f64 = tags.iter().map(|&t| self.prob(t, w)).sum();
            lp += c * (p.ln() - size.ln());
        }
        if include_priors {
            lp += size * self.prior.ln();
        }
        lp
    }

    /// Greedily adds the tag that improves the likelihood most until no tag improves it.
    pub fn predict(&self, words: &WordCounts, include_priors: bool) -> BTreeSet<TagId> {
        let mut words: Vec<(&str, f64)> = words
            .iter()
            .map(|(w, &c)| (w.as_str(), f64::from(c)))
            .collect();
        words.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut current: Vec<TagId> = vec![];
        let mut remaining: BTreeSet<TagId> = (0..self.n_tags()).collect();
        let mut lp_current = -f64::MAX;
        while !remaining.is_empty() {
            let best = utils::first_max_by(remaining.iter().copied(), |&t| {
                let mut trial = current.clone();
                trial.push(t);
                self.log_likelihood(&trial, &words, include_priors)
            });
            match best {
                Some((t, lp)) if lp > lp_current => {
                    current.push(t);
                    remaining.remove(&t);
                    lp_current = lp;
                }
                _ => break,
            }
        }
        current.into_iter().collect()
    }
}

/// Multi-label classifier based on a parametric mixture of per-tag word distributions.
///
/// Training re-estimates every tag's word distribution by splitting each word of a document
/// among the document's tags. It stops when the largest relative change of an iteration differs
/// from the previous iteration's by at most `tolerance`.
#[derive(Clone, Copy, Debug)]
pub struct Mixture {
    tolerance: f64,
    max_iterations: usize,
    include_priors: bool,
}

impl Default for Mixture {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            max_iterations: 100,
            include_priors: true,
        }
    }
}

impl Mixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the iteration bound. Training fails with [`TagnetError::NotConverged`] past it.
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = std::cmp::max(n, 1);
        self
    }

    /// Whether prediction adds the tag prior once per selected tag.
    pub fn include_priors(mut self, flag: bool) -> Self {
        self.include_priors = flag;
        self
    }

    /// Trains the word distributions of `field` on `train_ids`.
    ///
    /// # Errors
    ///
    /// - [`TagnetError::DegenerateInput`] if the field has no word, if no training document
    ///   carries a tag of `tags`, or if a responsibility has a zero denominator.
    /// - [`TagnetError::NotConverged`] if the iteration bound is reached.
    pub fn train_field(
        &self,
        corpus: &Corpus,
        field: Field,
        train_ids: &[&str],
        tags: &TagVocabulary,
    ) -> Result<MixtureModel> {
        // Words are interned in sorted order so that every sum below is reproducible.
        let mut vocab: BTreeSet<&str> = BTreeSet::new();
        let mut docs = vec![];
        for &id in train_ids {
            let doc = corpus.document(id)?;
            let text = doc.field(field);
            vocab.extend(text.keys().map(String::as_str));
            let doc_tags: Vec<TagId> = tags.filter(doc.tags()).into_iter().collect();
            if !doc_tags.is_empty() {
                docs.push((id, doc_tags, text));
            }
        }
        if vocab.is_empty() {
            return Err(TagnetError::degenerate_input(format!(
                "field `{field}` has an empty vocabulary"
            )));
        }
        if docs.is_empty() {
            return Err(TagnetError::degenerate_input(
                "no training document carries a vocabulary tag",
            ));
        }
        let vocab: Vec<&str> = vocab.into_iter().collect();
        let word_ids: HashMap<&str, usize> =
            vocab.iter().enumerate().map(|(i, &w)| (w, i)).collect();
        let v = vocab.len() as f64;

        let docs: Vec<(&str, Vec<TagId>, Vec<(usize, f64)>)> = docs
            .into_iter()
            .map(|(id, doc_tags, text)| {
                let mut words: Vec<(usize, f64)> = text
                    .iter()
                    .filter(|&(_, &c)| c > 0)
                    .map(|(w, &c)| (word_ids[w.as_str()], f64::from(c)))
                    .collect();
                words.sort_unstable_by_key(|&(w, _)| w);
                (id, doc_tags, words)
            })
            .collect();

        // Relative frequencies within each tag's documents.
        let mut probs: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); tags.len()];
        for (_, doc_tags, words) in &docs {
            for &t in doc_tags {
                for &(w, c) in words {
                    *probs[t].entry(w).or_insert(0.0) += c;
                }
            }
        }
        for table in &mut probs {
            let total: f64 = table.values().sum();
            for p in table.values_mut() {
                *p /= total;
            }
        }

        let mut last_max_change = 0.0;
        let mut iterations = 0;
        loop {
            iterations += 1;

            // E-step and M-step numerators in one pass.
            let mut next: Vec<BTreeMap<usize, f64>> = probs
                .iter()
                .map(|table| table.keys().map(|&w| (w, 0.0)).collect())
                .collect();
            let mut totals = vec![0.0; tags.len()];
            for (id, doc_tags, words) in &docs {
                for &(w, c) in words {
                    let sum: f64 = doc_tags
                        .iter()
                        .map(|&t| probs[t].get(&w).copied().unwrap_or(0.0))
                        .sum();
                    if sum <= 0.0 || !sum.is_finite() {
                        return Err(TagnetError::degenerate_input(format!(
                            "word `{}` of document `{id}` has no probability under its tags",
                            vocab[w]
                        )));
                    }
                    for &t in doc_tags {
                        let g = probs[t].get(&w).copied().unwrap_or(0.0) / sum;
                        let term = c * g + 1.0;
                        *next[t].entry(w).or_insert(0.0) += term;
                        totals[t] += term;
                    }
                }
            }

            let mut max_change: f64 = 0.0;
            for (t, table) in next.iter_mut().enumerate() {
                let denom = totals[t] + v;
                for (w, p) in table.iter_mut() {
                    *p /= denom;
                    let old = probs[t][w];
                    max_change = max_change.max((*p - old).abs() / old);
                }
            }
            probs = next;

            let delta = (max_change - last_max_change).abs();
            last_max_change = max_change;
            debug!(
                "mixture: field={field} iteration={iterations} max_change={max_change} delta={delta}"
            );
            if delta <= self.tolerance {
                break;
            }
            if iterations >= self.max_iterations {
                return Err(TagnetError::not_converged(iterations, delta));
            }
        }

        let word_probs = probs
            .into_iter()
            .map(|table| {
                table
                    .into_iter()
                    .map(|(w, p)| (vocab[w].to_string(), p))
                    .collect()
            })
            .collect();
        Ok(MixtureModel {
            tags: tags.clone(),
            word_probs,
            smooth: 1.0 / v,
            prior: 1.0 / tags.len() as f64,
            iterations,
        })
    }
}

impl Classifier for Mixture {
    type Model = FieldModels<MixtureModel>;

    fn name(&self) -> &'static str {
        "pmm"
    }

    fn train(
        &self,
        corpus: &Corpus,
        fields: &[Field],
        train_ids: &[&str],
        tags: &TagVocabulary,
    ) -> Result<Self::Model> {
        FieldModels::train_each(fields, |field| {
            self.train_field(corpus, field, train_ids, tags)
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
        classifier::check_vocabulary(model.tags(), tags)?;
        Ok(model.predict(words, self.include_priors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::corpus::Document;
    use crate::naive_bayes::tests::pet_corpus;

    /// Two single-tag documents. Every responsibility is one, so EM settles after one step.
    fn split_corpus() -> (Corpus, TagVocabulary) {
        let mut corpus = Corpus::new();
        for (id, tag, title) in [("1", "A", "cat cat dog"), ("2", "B", "bird bird bird fish")] {
            corpus
                .push_document(Document::new(
                    id,
                    [tag],
                    WordCounts::from_tokens(title.split_whitespace()),
                    WordCounts::new(),
                ))
                .unwrap();
        }
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        (corpus, tags)
    }

    #[test]
    fn test_train_single_tag_documents() {
        let (corpus, tags) = split_corpus();
        let model = Mixture::new()
            .train_field(&corpus, Field::Title, &corpus.doc_ids(), &tags)
            .unwrap();

        // Relative change drops to zero on the second iteration, the delta on the third.
        assert_eq!(3, model.iterations());
        // V = 4; A: cat 2 + 1, dog 1 + 1 over 5 + 4.
        assert!((model.prob(0, "cat") - 3.0 / 9.0).abs() < 1e-12);
        assert!((model.prob(0, "dog") - 2.0 / 9.0).abs() < 1e-12);
        assert!((model.prob(1, "bird") - 4.0 / 10.0).abs() < 1e-12);
        assert!((model.prob(0, "bird") - 1.0 / 4.0).abs() < 1e-12);
        assert!((model.smooth() - 1.0 / 4.0).abs() < 1e-12);
        assert!((model.prior() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_train_not_converged() {
        let (corpus, tags) = split_corpus();
        let result =
            Mixture::new()
                .max_iterations(1)
                .train_field(&corpus, Field::Title, &corpus.doc_ids(), &tags);

        assert!(result.is_err());
        assert!(result
            .err()
            .unwrap()
            .to_string()
            .starts_with("NotConvergedError: no convergence after 1 iterations"));
    }

    #[test]
    fn test_train_converges_on_shared_tags() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let model = Mixture::new()
            .train_field(&corpus, Field::Title, &corpus.doc_ids(), &tags)
            .unwrap();

        assert!(model.iterations() < 100);
        for t in tags.ids() {
            let mut total = 0.0;
            for w in ["cat", "dog", "bird", "fish"] {
                let p = model.prob(t, w);
                assert!(p > 0.0 && p < 1.0);
                total += p;
            }
            assert!(total < 1.0);
        }
    }

    #[test]
    fn test_predict_greedy() {
        let (corpus, tags) = split_corpus();
        let classifier = Mixture::new();
        let model = classifier
            .train(&corpus, &[Field::Title], &corpus.doc_ids(), &tags)
            .unwrap();

        let predicted = classifier
            .predict(&model, Field::Title, &WordCounts::from_tokens(["cat"]), &tags)
            .unwrap();
        assert_eq!(vec!["A"], tags.names(&predicted));

        let predicted = classifier
            .predict(
                &model,
                Field::Title,
                &WordCounts::from_tokens(["bird", "fish"]),
                &tags,
            )
            .unwrap();
        assert_eq!(vec!["B"], tags.names(&predicted));
    }

    #[test]
    fn test_predict_other_vocabulary() {
        let (corpus, tags) = split_corpus();
        let classifier = Mixture::new();
        let model = classifier
            .train(&corpus, &[Field::Title], &corpus.doc_ids(), &tags)
            .unwrap();
        let swapped = TagVocabulary::new(["B", "A"]).unwrap();

        let result = classifier.predict(
            &model,
            Field::Title,
            &WordCounts::from_tokens(["cat"]),
            &swapped,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_predict_empty_document_picks_first_tag() {
        let (corpus, tags) = split_corpus();
        let model = Mixture::new()
            .train_field(&corpus, Field::Title, &corpus.doc_ids(), &tags)
            .unwrap();

        assert_eq!(BTreeSet::from([0]), model.predict(&WordCounts::new(), true));
    }

    #[test]
    fn test_log_likelihood() {
        let (corpus, tags) = split_corpus();
        let model = Mixture::new()
            .train_field(&corpus, Field::Title, &corpus.doc_ids(), &tags)
            .unwrap();
        let words = [("cat", 2.0)];

        let lp = model.log_likelihood(&[0, 1], &words, false);
        let expected = 2.0 * ((3.0 / 9.0 + 1.0 / 4.0_f64).ln() - 2f64.ln());
        assert!((lp - expected).abs() < 1e-12);

        let lp = model.log_likelihood(&[0, 1], &words, true);
        assert!((lp - (expected + 2.0 * 0.5f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_train_without_tagged_documents() {
        let (corpus, _) = split_corpus();
        let tags = TagVocabulary::new(["Z"]).unwrap();

        let result = Mixture::new().train_field(&corpus, Field::Title, &corpus.doc_ids(), &tags);

        assert!(result.is_err());
    }
}
