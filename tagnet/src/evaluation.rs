//! Cross-validation harness.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

#[cfg(feature = "multithreading")]
use rayon::prelude::*;

use crate::classifier::Classifier;
use crate::corpus::{Corpus, Field};
use crate::errors::{Result, TagnetError};
use crate::tags::{TagId, TagVocabulary};

/// Splits `ids` into `k` contiguous bins of `len / k` items. The remainder goes to the last
/// bin.
///
/// # Errors
///
/// [`TagnetError::InvalidArgument`] will be returned if `k` is zero or larger than `ids.len()`.
pub fn kfold_bins<T>(ids: &[T], k: usize) -> Result<Vec<&[T]>> {
    if k == 0 || k > ids.len() {
        return Err(TagnetError::invalid_argument(
            "k",
            format!("must be in 1..={}, but got {k}", ids.len()),
        ));
    }
    let size = ids.len() / k;
    let mut bins = Vec::with_capacity(k);
    for i in 0..k - 1 {
        bins.push(&ids[i * size..(i + 1) * size]);
    }
    bins.push(&ids[(k - 1) * size..]);
    Ok(bins)
}

/// Confusion counts and scores of a single document.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DocumentScore {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl DocumentScore {
    pub fn new(actual: &BTreeSet<TagId>, predicted: &BTreeSet<TagId>) -> Self {
        let tp = actual.intersection(predicted).count();
        let fp = predicted.difference(actual).count();
        let fn_ = actual.difference(predicted).count();
        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            tp,
            fp,
            fn_,
            precision,
            recall,
            f1,
        }
    }
}

/// Summed confusion counts and macro-averaged scores over a document set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub n_docs: usize,
    pub n_tp: usize,
    pub n_fp: usize,
    pub n_fn: usize,
    pub mean_precision: f64,
    pub mean_recall: f64,
    pub mean_f1: f64,
}

impl FromIterator<DocumentScore> for Evaluation {
    fn from_iter<I: IntoIterator<Item = DocumentScore>>(iter: I) -> Self {
        let mut e = Self::default();
        for s in iter {
            e.n_docs += 1;
            e.n_tp += s.tp;
            e.n_fp += s.fp;
            e.n_fn += s.fn_;
            e.mean_precision += s.precision;
            e.mean_recall += s.recall;
            e.mean_f1 += s.f1;
        }
        if e.n_docs > 0 {
            let n = e.n_docs as f64;
            e.mean_precision /= n;
            e.mean_recall /= n;
            e.mean_f1 /= n;
        }
        e
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            " {} | {} | {} | {:.3} | {:.3} | {:.3} |",
            self.n_tp, self.n_fp, self.n_fn, self.mean_precision, self.mean_recall, self.mean_f1
        )
    }
}

fn score_document<C>(
    classifier: &C,
    model: &C::Model,
    corpus: &Corpus,
    fields: &[Field],
    id: &str,
    tags: &TagVocabulary,
) -> Result<DocumentScore>
where
    C: Classifier,
{
    let doc = corpus.document(id)?;
    let actual = tags.filter(doc.tags());
    let mut predicted = BTreeSet::new();
    for &field in fields {
        predicted.extend(classifier.predict(model, field, doc.field(field), tags)?);
    }
    Ok(DocumentScore::new(&actual, &predicted))
}

/// Predicts every document of `ids` and scores the union of the per-field predictions
/// against the document's vocabulary tags.
///
/// # Errors
///
/// [`TagnetError::InvalidArgument`] will be returned if `ids` or `fields` is empty. Prediction
/// errors are returned as is.
pub fn evaluate_documents<C>(
    classifier: &C,
    model: &C::Model,
    corpus: &Corpus,
    fields: &[Field],
    ids: &[&str],
    tags: &TagVocabulary,
) -> Result<Evaluation>
where
    C: Classifier + Sync,
{
    if ids.is_empty() {
        return Err(TagnetError::invalid_argument(
            "ids",
            "no documents to evaluate",
        ));
    }
    if fields.is_empty() {
        return Err(TagnetError::invalid_argument(
            "fields",
            "at least one field is required",
        ));
    }

    #[cfg(not(feature = "multithreading"))]
    let scores: Vec<DocumentScore> = ids
        .iter()
        .map(|id| score_document(classifier, model, corpus, fields, id, tags))
        .collect::<Result<_>>()?;

    #[cfg(feature = "multithreading")]
    let scores: Vec<DocumentScore> = ids
        .par_iter()
        .map(|id| score_document(classifier, model, corpus, fields, id, tags))
        .collect::<Result<_>>()?;

    Ok(scores.into_iter().collect())
}

/// Result of one fold.
#[derive(Clone, Debug, PartialEq)]
pub struct FoldReport {
    pub fold: usize,
    pub n_train: usize,
    pub n_test: usize,

    /// Scores on the training documents, if requested.
    pub train: Option<Evaluation>,

    /// Scores on the held-out documents, if requested.
    pub test: Option<Evaluation>,

    pub train_time: Duration,
    pub test_time: Option<Duration>,
}

/// K-fold cross validation.
///
/// With `k = 1` the model is trained and tested on the same documents.
///
/// # Examples
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use tagnet::{Corpus, Document, Field, KFold, NaiveBayes, WordCounts};
///
/// let mut corpus = Corpus::new();
/// for i in 0..6 {
///     let tag = if i % 2 == 0 { "even" } else { "odd" };
///     let title = WordCounts::from_tokens([tag, "number"]);
///     corpus.push_document(Document::new(i.to_string(), [tag], title, WordCounts::new())).unwrap();
/// }
/// let tags = corpus.tag_vocabulary().unwrap();
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let reports = KFold::new(3)
///     .run(&NaiveBayes, &corpus, &[Field::Title], &corpus.doc_ids(), &tags, &mut rng)
///     .unwrap();
///
/// assert_eq!(3, reports.len());
/// assert_eq!(2, reports[0].n_test);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct KFold {
    k: usize,
    stop_after: Option<usize>,
    train_test: bool,
    test: bool,
}

impl Default for KFold {
    fn default() -> Self {
        Self::new(4)
    }
}

impl KFold {
    pub const fn new(k: usize) -> Self {
        Self {
            k,
            stop_after: None,
            train_test: true,
            test: true,
        }
    }

    /// Runs only the first `n` folds.
    pub fn stop_after(mut self, n: Option<usize>) -> Self {
        self.stop_after = n;
        self
    }

    /// Whether each fold also scores its own training documents.
    pub fn train_test(mut self, flag: bool) -> Self {
        self.train_test = flag;
        self
    }

    /// Whether each fold scores its held-out documents.
    pub fn test(mut self, flag: bool) -> Self {
        self.test = flag;
        self
    }

    /// Shuffles `ids` with `rng`, then trains and scores each fold.
    ///
    /// # Errors
    ///
    /// [`TagnetError::InvalidArgument`] will be returned if `k` does not fit `ids`. Training
    /// and prediction errors are returned as is.
    pub fn run<C, R>(
        &self,
        classifier: &C,
        corpus: &Corpus,
        fields: &[Field],
        ids: &[&str],
        tags: &TagVocabulary,
        rng: &mut R,
    ) -> Result<Vec<FoldReport>>
    where
        C: Classifier + Sync,
        R: Rng + ?Sized,
    {
        let mut ids = ids.to_vec();
        ids.shuffle(rng);
        let bins = kfold_bins(&ids, self.k)?;
        let n_folds = self.stop_after.map_or(self.k, |n| n.min(self.k));

        let mut reports = Vec::with_capacity(n_folds);
        for (fold, &test_ids) in bins.iter().enumerate().take(n_folds) {
            let train_ids: Vec<&str> = if self.k > 1 {
                bins.iter()
                    .enumerate()
                    .filter(|&(i, _)| i != fold)
                    .flat_map(|(_, bin)| bin.iter().copied())
                    .collect()
            } else {
                test_ids.to_vec()
            };
            info!(
                "{}: fold {}/{}: {} training and {} test documents",
                classifier.name(),
                fold + 1,
                n_folds,
                train_ids.len(),
                test_ids.len()
            );

            let start = Instant::now();
            let model = classifier.train(corpus, fields, &train_ids, tags)?;
            let train_time = start.elapsed();
            debug!("fold {fold}: trained in {train_time:?}");

            let train = if self.train_test {
                Some(evaluate_documents(
                    classifier, &model, corpus, fields, &train_ids, tags,
                )?)
            } else {
                None
            };
            let (test, test_time) = if self.test {
                let start = Instant::now();
                let e = evaluate_documents(classifier, &model, corpus, fields, test_ids, tags)?;
                (Some(e), Some(start.elapsed()))
            } else {
                (None, None)
            };

            reports.push(FoldReport {
                fold,
                n_train: train_ids.len(),
                n_test: test_ids.len(),
                train,
                test,
                train_time,
                test_time,
            });
        }
        Ok(reports)
    }
}

/// Trains on every document of `train` and scores every document of `test`.
///
/// # Errors
///
/// Training and prediction errors are returned as is.
pub fn train_and_test<C>(
    classifier: &C,
    train: &Corpus,
    test: &Corpus,
    fields: &[Field],
    tags: &TagVocabulary,
) -> Result<FoldReport>
where
    C: Classifier + Sync,
{
    let train_ids = train.doc_ids();
    let test_ids = test.doc_ids();
    info!(
        "{}: {} training and {} test documents",
        classifier.name(),
        train_ids.len(),
        test_ids.len()
    );

    let start = Instant::now();
    let model = classifier.train(train, fields, &train_ids, tags)?;
    let train_time = start.elapsed();

    let start = Instant::now();
    let evaluation = evaluate_documents(classifier, &model, test, fields, &test_ids, tags)?;
    let test_time = start.elapsed();

    Ok(FoldReport {
        fold: 0,
        n_train: train_ids.len(),
        n_test: test_ids.len(),
        train: None,
        test: Some(evaluation),
        train_time,
        test_time: Some(test_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::corpus::{Document, WordCounts};
    use crate::naive_bayes::tests::pet_corpus;
    use crate::naive_bayes::NaiveBayes;

    fn parity_corpus(n: usize) -> Corpus {
        let mut corpus = Corpus::new();
        for i in 0..n {
            let tag = if i % 2 == 0 { "even" } else { "odd" };
            corpus
                .push_document(Document::new(
                    i.to_string(),
                    [tag],
                    WordCounts::from_tokens([tag, "number"]),
                    WordCounts::from_tokens(["body"]),
                ))
                .unwrap();
        }
        corpus
    }

    #[test]
    fn test_kfold_bins() {
        let ids: Vec<usize> = (0..8).collect();
        let sizes: Vec<usize> = kfold_bins(&ids, 4).unwrap().iter().map(|b| b.len()).collect();
        assert_eq!(vec![2, 2, 2, 2], sizes);

        let ids: Vec<usize> = (0..9).collect();
        let bins = kfold_bins(&ids, 4).unwrap();
        let sizes: Vec<usize> = bins.iter().map(|b| b.len()).collect();
        assert_eq!(vec![2, 2, 2, 3], sizes);
        assert_eq!(&[6, 7, 8], bins[3]);
    }

    #[test]
    fn test_kfold_bins_single() {
        let ids = ["a", "b", "c"];

        assert_eq!(vec![&ids[..]], kfold_bins(&ids, 1).unwrap());
    }

    #[test]
    fn test_kfold_bins_invalid() {
        let ids = ["a", "b", "c"];

        assert!(kfold_bins(&ids, 0).is_err());
        assert!(kfold_bins(&ids, 4).is_err());
        assert!(kfold_bins::<&str>(&[], 1).is_err());
    }

    #[test]
    fn test_document_score() {
        let score = DocumentScore::new(&BTreeSet::from([0, 1]), &BTreeSet::from([0, 2]));

        assert_eq!((1, 1, 1), (score.tp, score.fp, score.fn_));
        assert!((score.precision - 0.5).abs() < 1e-12);
        assert!((score.recall - 0.5).abs() < 1e-12);
        assert!((score.f1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_document_score_empty_prediction() {
        let score = DocumentScore::new(&BTreeSet::from([0]), &BTreeSet::new());

        assert_eq!((0, 0, 1), (score.tp, score.fp, score.fn_));
        assert_eq!(0.0, score.precision);
        assert_eq!(0.0, score.recall);
        assert_eq!(0.0, score.f1);
    }

    #[test]
    fn test_evaluation_macro_average() {
        let evaluation: Evaluation = [
            DocumentScore::new(&BTreeSet::from([0]), &BTreeSet::from([0])),
            DocumentScore::new(&BTreeSet::from([0]), &BTreeSet::from([1, 2, 3])),
        ]
        .into_iter()
        .collect();

        assert_eq!(2, evaluation.n_docs);
        assert_eq!((1, 3, 1), (evaluation.n_tp, evaluation.n_fp, evaluation.n_fn));
        // Pooled precision would be 1 / 4.
        assert!((evaluation.mean_precision - 0.5).abs() < 1e-12);
        assert!((evaluation.mean_recall - 0.5).abs() < 1e-12);
        assert!((evaluation.mean_f1 - 0.5).abs() < 1e-12);
        assert_eq!(" 1 | 3 | 1 | 0.500 | 0.500 | 0.500 |", evaluation.to_string());
    }

    #[test]
    fn test_evaluate_documents() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let ids = corpus.doc_ids();
        let model = NaiveBayes
            .train(&corpus, &[Field::Title], &ids, &tags)
            .unwrap();

        let evaluation =
            evaluate_documents(&NaiveBayes, &model, &corpus, &[Field::Title], &ids, &tags)
                .unwrap();

        assert_eq!(4, evaluation.n_docs);
        assert_eq!(6, evaluation.n_tp + evaluation.n_fn);
        for score in [
            evaluation.mean_precision,
            evaluation.mean_recall,
            evaluation.mean_f1,
        ] {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_evaluate_no_documents() {
        let corpus = pet_corpus();
        let tags = TagVocabulary::new(["A", "B"]).unwrap();
        let model = NaiveBayes
            .train(&corpus, &[Field::Title], &corpus.doc_ids(), &tags)
            .unwrap();

        let result = evaluate_documents(&NaiveBayes, &model, &corpus, &[Field::Title], &[], &tags);

        assert!(result.is_err());
    }

    #[test]
    fn test_kfold_run() {
        let corpus = parity_corpus(8);
        let tags = corpus.tag_vocabulary().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let reports = KFold::new(4)
            .run(
                &NaiveBayes,
                &corpus,
                &[Field::Title, Field::Body],
                &corpus.doc_ids(),
                &tags,
                &mut rng,
            )
            .unwrap();

        assert_eq!(4, reports.len());
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(i, report.fold);
            assert_eq!(6, report.n_train);
            assert_eq!(2, report.n_test);
            assert_eq!(6, report.train.unwrap().n_docs);
            assert_eq!(2, report.test.unwrap().n_docs);
            assert!(report.test_time.is_some());
        }
    }

    #[test]
    fn test_kfold_run_options() {
        let corpus = parity_corpus(8);
        let tags = corpus.tag_vocabulary().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let reports = KFold::new(4)
            .stop_after(Some(2))
            .train_test(false)
            .test(false)
            .run(
                &NaiveBayes,
                &corpus,
                &[Field::Title],
                &corpus.doc_ids(),
                &tags,
                &mut rng,
            )
            .unwrap();

        assert_eq!(2, reports.len());
        assert!(reports.iter().all(|r| r.train.is_none() && r.test.is_none()));
        assert!(reports.iter().all(|r| r.test_time.is_none()));
    }

    #[test]
    fn test_kfold_single_fold_trains_on_test_set() {
        let corpus = parity_corpus(5);
        let tags = corpus.tag_vocabulary().unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let reports = KFold::new(1)
            .run(
                &NaiveBayes,
                &corpus,
                &[Field::Title],
                &corpus.doc_ids(),
                &tags,
                &mut rng,
            )
            .unwrap();

        assert_eq!(1, reports.len());
        assert_eq!(5, reports[0].n_train);
        assert_eq!(5, reports[0].n_test);
        assert_eq!(reports[0].train, reports[0].test);
    }

    #[test]
    fn test_train_and_test() {
        let train = parity_corpus(6);
        let test = parity_corpus(3);
        let tags = train.tag_vocabulary().unwrap();

        let report = train_and_test(&NaiveBayes, &train, &test, &[Field::Title], &tags).unwrap();

        assert_eq!(6, report.n_train);
        assert_eq!(3, report.n_test);
        assert!(report.train.is_none());
        let evaluation = report.test.unwrap();
        assert_eq!(3, evaluation.n_docs);
        assert_eq!(0, evaluation.n_fn);
        assert!((evaluation.mean_recall - 1.0).abs() < 1e-12);
    }
}
