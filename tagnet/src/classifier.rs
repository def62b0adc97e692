use std::collections::BTreeSet;
use std::str::FromStr;

use crate::corpus::{Corpus, Field, WordCounts};
use crate::errors::{Result, TagnetError};
use crate::tags::{TagId, TagVocabulary};

/// Train/predict contract shared by every engine.
///
/// Trained models are immutable and may be shared between threads during prediction.
pub trait Classifier {
    type Model: Send + Sync;

    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Trains a model on `train_ids` for each of `fields`.
    ///
    /// # Errors
    ///
    /// Degenerate training data (no vocabulary, no tagged document, ...) is reported as
    /// [`TagnetError::DegenerateInput`].
    fn train(
        &self,
        corpus: &Corpus,
        fields: &[Field],
        train_ids: &[&str],
        tags: &TagVocabulary,
    ) -> Result<Self::Model>;

    /// Predicts a tag set for the words of one field.
    ///
    /// # Errors
    ///
    /// [`TagnetError::InvalidArgument`] will be returned if `field` was not trained.
    fn predict(
        &self,
        model: &Self::Model,
        field: Field,
        words: &WordCounts,
        tags: &TagVocabulary,
    ) -> Result<BTreeSet<TagId>>;
}

/// One model per trained field.
#[derive(Clone, Debug)]
pub struct FieldModels<M> {
    models: [Option<M>; 2],
}

impl<M> FieldModels<M> {
    /// Trains `f` once per field.
    pub fn train_each<F>(fields: &[Field], mut f: F) -> Result<Self>
    where
        F: FnMut(Field) -> Result<M>,
    {
        if fields.is_empty() {
            return Err(TagnetError::invalid_argument(
                "fields",
                "at least one field is required",
            ));
        }
        let mut models = [None, None];
        for &field in fields {
            if models[field as usize].is_none() {
                models[field as usize] = Some(f(field)?);
            }
        }
        Ok(Self { models })
    }

    /// Gets the model of `field`.
    ///
    /// # Errors
    ///
    /// [`TagnetError::InvalidArgument`] will be returned if `field` was not trained.
    pub fn get(&self, field: Field) -> Result<&M> {
        self.models[field as usize].as_ref().ok_or_else(|| {
            TagnetError::invalid_argument("field", format!("no model trained for `{field}`"))
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL
            .into_iter()
            .filter(|&f| self.models[f as usize].is_some())
    }
}

/// Rejects a vocabulary other than the one a model was trained on.
pub(crate) fn check_vocabulary(trained: &TagVocabulary, tags: &TagVocabulary) -> Result<()> {
    if trained == tags {
        Ok(())
    } else if trained.len() != tags.len() {
        Err(TagnetError::invalid_argument(
            "tags",
            format!(
                "the model was trained on {} tags, but {} were given",
                trained.len(),
                tags.len()
            ),
        ))
    } else {
        Err(TagnetError::invalid_argument(
            "tags",
            "the model was trained on a different tag vocabulary",
        ))
    }
}

/// Engine selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// Binary relevance multinomial Naive Bayes.
    NaiveBayes,

    /// Naive Bayes guided by the tag co-occurrence graph.
    GraphGuided,

    /// Parametric mixture model trained by EM.
    Mixture,
}

impl FromStr for Method {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nb" => Ok(Self::NaiveBayes),
            "ngnb" => Ok(Self::GraphGuided),
            "pmm" => Ok(Self::Mixture),
            _ => Err("Could not parse a method name: {nb, ngnb, pmm}"),
        }
    }
}
