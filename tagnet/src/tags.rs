use std::collections::BTreeSet;
use std::ops::Range;

use hashbrown::HashMap;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::errors::{Result, TagnetError};

/// Dense identifier of a tag within a [`TagVocabulary`].
pub type TagId = usize;

/// Ordered set of tags over which every model reasons.
///
/// Tags are interned to dense [`TagId`]s in insertion order. Tags outside the vocabulary are
/// ignored by all engines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagVocabulary {
    ids: HashMap<String, TagId>,
    tags: Vec<String>,
}

impl TagVocabulary {
    /// Creates a vocabulary from a tag sequence. Duplicates keep their first position.
    ///
    /// # Errors
    ///
    /// [`TagnetError::DegenerateInput`] will be returned if no tag is given.
    pub fn new<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids = HashMap::new();
        let mut names = vec![];
        for tag in tags {
            let tag = tag.as_ref();
            if !ids.contains_key(tag) {
                ids.insert(tag.to_string(), names.len());
                names.push(tag.to_string());
            }
        }
        if names.is_empty() {
            return Err(TagnetError::degenerate_input("the tag vocabulary is empty"));
        }
        Ok(Self { ids, tags: names })
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn id(&self, tag: &str) -> Option<TagId> {
        self.ids.get(tag).copied()
    }

    /// Gets the tag string of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn name(&self, id: TagId) -> &str {
        &self.tags[id]
    }

    pub fn ids(&self) -> Range<TagId> {
        0..self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Intersects `tags` with the vocabulary.
    pub fn filter<I, S>(&self, tags: I) -> BTreeSet<TagId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter()
            .filter_map(|tag| self.id(tag.as_ref()))
            .collect()
    }

    /// Resolves tag IDs back to tag strings.
    pub fn names<'a, I>(&'a self, ids: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a TagId>,
    {
        ids.into_iter().map(|&id| self.name(id)).collect()
    }

    /// Draws `n` tags at random. The drawn tags keep their relative order.
    ///
    /// # Errors
    ///
    /// [`TagnetError::InvalidArgument`] will be returned if `n` is zero or larger than the
    /// vocabulary.
    pub fn sample<R>(&self, n: usize, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        if n == 0 || n > self.len() {
            return Err(TagnetError::invalid_argument(
                "n",
                format!("must be in 1..={}", self.len()),
            ));
        }
        let mut picked: Vec<TagId> = self.ids().collect();
        picked.shuffle(rng);
        picked.truncate(n);
        picked.sort_unstable();
        Self::new(picked.into_iter().map(|id| self.name(id)))
    }
}
