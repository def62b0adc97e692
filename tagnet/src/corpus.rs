use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{Read, Write};
use std::ops::Deref;
use std::str::FromStr;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TagnetError};
use crate::tags::TagVocabulary;

/// Text field of a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title = 0,
    Body = 1,
}

impl Field {
    /// All fields in their canonical order.
    pub const ALL: [Self; 2] = [Self::Title, Self::Body];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "body" => Ok(Self::Body),
            _ => Err("Could not parse a field name"),
        }
    }
}

/// Word frequency counter of a single text field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordCounts(HashMap<String, u32>);

impl WordCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every occurrence of every token.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts = Self::new();
        for token in tokens {
            counts.add(token.as_ref(), 1);
        }
        counts
    }

    pub fn add(&mut self, word: &str, count: u32) {
        if let Some(c) = self.0.get_mut(word) {
            *c += count;
        } else {
            self.0.insert(word.to_string(), count);
        }
    }

    /// Gets the count of `word`, zero if absent.
    pub fn count(&self, word: &str) -> u32 {
        self.0.get(word).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.0.values().map(|&c| u64::from(c)).sum()
    }
}

impl Deref for WordCounts {
    type Target = HashMap<String, u32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromIterator<(S, u32)> for WordCounts
where
    S: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (word, count) in iter {
            counts.add(word.as_ref(), count);
        }
        counts
    }
}

/// A labelled document. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    tags: BTreeSet<String>,
    title: WordCounts,
    body: WordCounts,
}

impl Document {
    pub fn new<S, I, T>(id: S, tags: I, title: WordCounts, body: WordCounts) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            id: id.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            title,
            body,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn field(&self, field: Field) -> &WordCounts {
        match field {
            Field::Title => &self.title,
            Field::Body => &self.body,
        }
    }
}

/// In-memory document collection.
///
/// Besides the documents themselves, the corpus keeps the number of documents per tag and a
/// tag to document-ID index.
///
/// # Examples
///
/// ```
/// use tagnet::{Corpus, Document, WordCounts};
///
/// let mut corpus = Corpus::new();
/// corpus
///     .push_document(Document::new(
///         "1",
///         ["rust"],
///         WordCounts::from_tokens(["borrow", "checker"]),
///         WordCounts::new(),
///     ))
///     .unwrap();
///
/// assert_eq!(1, corpus.len());
/// assert_eq!(vec!["rust"], corpus.tag_vocabulary().unwrap().iter().collect::<Vec<_>>());
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<Document>,
    positions: HashMap<String, usize>,
    tag_counts: BTreeMap<String, usize>,
    tag_index: BTreeMap<String, Vec<String>>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document.
    ///
    /// # Errors
    ///
    /// [`TagnetError::InvalidArgument`] will be returned if a document with the same ID already
    /// exists.
    pub fn push_document(&mut self, document: Document) -> Result<()> {
        if self.positions.contains_key(document.id()) {
            return Err(TagnetError::invalid_argument(
                "document",
                format!("duplicate document ID `{}`", document.id()),
            ));
        }
        for tag in document.tags() {
            *self.tag_counts.entry(tag.clone()).or_insert(0) += 1;
            self.tag_index
                .entry(tag.clone())
                .or_insert_with(Vec::new)
                .push(document.id().to_string());
        }
        self.positions
            .insert(document.id().to_string(), self.documents.len());
        self.documents.push(document);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.positions.get(id).map(|&i| &self.documents[i])
    }

    /// Gets a document that must exist.
    ///
    /// # Errors
    ///
    /// [`TagnetError::InvalidArgument`] will be returned if `id` is unknown.
    pub fn document(&self, id: &str) -> Result<&Document> {
        self.get(id).ok_or_else(|| {
            TagnetError::invalid_argument("doc_id", format!("unknown document `{id}`"))
        })
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    /// IDs of all documents in insertion order.
    pub fn doc_ids(&self) -> Vec<&str> {
        self.documents.iter().map(Document::id).collect()
    }

    pub fn tag_counts(&self) -> &BTreeMap<String, usize> {
        &self.tag_counts
    }

    pub fn docs_with_tag(&self, tag: &str) -> &[String] {
        self.tag_index.get(tag).map_or(&[][..], Vec::as_slice)
    }

    /// Builds the vocabulary of every tag seen in the corpus, in sorted order.
    ///
    /// # Errors
    ///
    /// [`TagnetError::DegenerateInput`] will be returned if no document carries a tag.
    pub fn tag_vocabulary(&self) -> Result<TagVocabulary> {
        TagVocabulary::new(self.tag_counts.keys())
    }

    /// IDs of the documents carrying at least one tag of `tags`.
    pub fn restrict(&self, tags: &TagVocabulary) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|doc| doc.tags().iter().any(|t| tags.id(t).is_some()))
            .map(Document::id)
            .collect()
    }

    /// Counts documents by the number of vocabulary tags they carry. Documents without a
    /// vocabulary tag are left out.
    pub fn tag_length_histogram(&self, tags: &TagVocabulary) -> BTreeMap<usize, usize> {
        let mut hist = BTreeMap::new();
        for doc in &self.documents {
            let n = tags.filter(doc.tags()).len();
            if n > 0 {
                *hist.entry(n).or_insert(0) += 1;
            }
        }
        hist
    }

    /// Exports the corpus.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        bincode::serde::encode_into_std_write(self, wtr, bincode::config::standard())?;
        Ok(())
    }

    /// Creates a corpus from a reader.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        Ok(bincode::serde::decode_from_std_read(
            rdr,
            bincode::config::standard(),
        )?)
    }
}
