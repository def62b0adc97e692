#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Tagnet
//!
//! Tagnet predicts sets of tags for short documents made of a title and a body. Three
//! classifiers share the [`Classifier`] contract:
//!
//! - [`NaiveBayes`]: binary relevance multinomial Naive Bayes.
//! - [`GraphGuided`]: Naive Bayes whose best tag is grown into a tag set along the tag
//!   co-occurrence graph ([`TagNetwork`]).
//! - [`Mixture`]: a parametric mixture model trained by expectation-maximization.
//!
//! [`KFold`] and [`train_and_test`] score a classifier on a [`Corpus`].
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use tagnet::{Corpus, Field, KFold, NaiveBayes};
//!
//! let mut f = BufReader::new(File::open("corpus.bin").unwrap());
//! let corpus = Corpus::read(&mut f).unwrap();
//! let tags = corpus.tag_vocabulary().unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let reports = KFold::new(4)
//!     .run(&NaiveBayes, &corpus, &Field::ALL, &corpus.doc_ids(), &tags, &mut rng)
//!     .unwrap();
//! for report in reports {
//!     println!("{}: {}", report.fold, report.test.unwrap());
//! }
//! ```
//!
//! Per-document prediction runs in parallel with **crate feature** `multithreading`.

mod classifier;
mod corpus;
mod evaluation;
mod graph_guided;
mod mixture;
mod naive_bayes;
mod network;
mod tags;
mod utils;

pub mod errors;

pub use classifier::{Classifier, FieldModels, Method};
pub use corpus::{Corpus, Document, Field, WordCounts};
pub use evaluation::{
    evaluate_documents, kfold_bins, train_and_test, DocumentScore, Evaluation, FoldReport, KFold,
};
pub use graph_guided::{GraphGuided, GraphGuidedModel};
pub use mixture::{Mixture, MixtureModel};
pub use naive_bayes::{LogOdds, NaiveBayes, NaiveBayesModel};
pub use network::{TagEdge, TagNetwork, TagNode};
pub use tags::{TagId, TagVocabulary};
