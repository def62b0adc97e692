//! Naive Bayes guided by the tag co-occurrence graph.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use log::debug;

use crate::classifier::{Classifier, FieldModels};
use crate::corpus::{Corpus, Field, WordCounts};
use crate::errors::{Result, TagnetError};
use crate::naive_bayes::{LogOdds, NaiveBayesModel};
use crate::network::TagNetwork;
use crate::tags::{TagId, TagVocabulary};
use crate::utils;

/// Trained state of the graph-guided classifier.
#[derive(Clone, Debug)]
pub struct GraphGuidedModel {
    bayes: FieldModels<NaiveBayesModel>,
    network: TagNetwork,
}

impl GraphGuidedModel {
    pub fn bayes(&self) -> &FieldModels<NaiveBayesModel> {
        &self.bayes
    }

    pub fn network(&self) -> &TagNetwork {
        &self.network
    }
}

/// Multi-label classifier that grows the best Naive Bayes tag into a tag set.
///
/// Starting from the tag with the highest log-odds (the seed), every subset of the best
/// positive neighbors of the seed is scored by propagating damped log-odds along the
/// co-occurrence graph towards the seed. The best subset is kept if it beats the score of the
/// seed alone.
///
/// Equally scored subsets resolve to the first one enumerated. This order is deterministic but
/// carries no meaning.
#[derive(Clone, Copy, Debug)]
pub struct GraphGuided {
    search_limit: usize,
    damping: f64,
}

impl Default for GraphGuided {
    fn default() -> Self {
        Self {
            search_limit: 5,
            damping: 0.7,
        }
    }
}

impl GraphGuided {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of neighbors considered around the seed.
    ///
    /// The search scores `2^limit - 1` subsets per document.
    pub fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Sets the factor applied to the rarest co-occurrence ratio of a subgraph.
    pub fn damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Grows a tag set from precomputed log-odds.
    ///
    /// # Errors
    ///
    /// [`TagnetError::DegenerateInput`] will be returned if no tag has log-odds or if a
    /// candidate subgraph has no edge.
    pub fn search(&self, network: &TagNetwork, log_odds: &LogOdds) -> Result<BTreeSet<TagId>> {
        let (seed, lp_start) = log_odds
            .best()
            .ok_or_else(|| TagnetError::degenerate_input("no tag has log-odds"))?;
        let seed_count = network.node_count(seed);
        if seed_count == 0 {
            return Err(TagnetError::degenerate_input(format!(
                "seed tag {seed} never occurs in the training set"
            )));
        }

        // Seed alone, weighted by how often it was seen without other tags.
        let lp_current = network.self_loop_count(seed).map_or(-f64::MAX, |c| {
            lp_start * (c as f64 / seed_count as f64)
        });
        let mut current = BTreeSet::from([seed]);

        let mut good: Vec<(TagId, f64)> = network
            .neighbors(seed)
            .into_iter()
            .filter_map(|t| log_odds.get(t).map(|lo| (t, lo)))
            .filter(|&(_, lo)| lo >= 0.0)
            .collect();
        good.sort_by(|a, b| b.1.total_cmp(&a.1));
        good.truncate(self.search_limit);
        let candidates: Vec<TagId> = good.iter().map(|&(t, _)| t).collect();

        let mut scored = vec![];
        for combo in utils::subsets(&candidates) {
            let accrual = self.accrual(network, log_odds, seed, seed_count, &combo)?;
            scored.push((combo, accrual));
        }
        if let Some(((combo, _), accrual)) = utils::first_max_by(scored, |(_, a)| *a) {
            debug!("graph guided: seed={seed} alone={lp_current} best={accrual} {combo:?}");
            if accrual > lp_current {
                current.extend(combo);
            }
        }
        Ok(current)
    }

    /// Propagates damped log-odds from the farthest tags of the subgraph towards the seed and
    /// returns what reaches the seed.
    fn accrual(
        &self,
        network: &TagNetwork,
        log_odds: &LogOdds,
        seed: TagId,
        seed_count: usize,
        combo: &[TagId],
    ) -> Result<f64> {
        let tags: BTreeSet<TagId> = combo.iter().copied().chain([seed]).collect();
        let min_count = network.min_edge_count(&tags).ok_or_else(|| {
            TagnetError::degenerate_input(format!("the subgraph of {tags:?} has no edge"))
        })?;
        let damping = self.damping * (min_count as f64 / seed_count as f64);

        let dists = network.hop_distances(&tags, seed);
        let mut order = Vec::with_capacity(tags.len());
        for &t in &tags {
            let d = dists.get(&t).copied().ok_or_else(|| {
                TagnetError::degenerate_input(format!("tag {t} is unreachable from seed {seed}"))
            })?;
            order.push((t, d));
        }
        // Farthest first. The sort is stable, so ties keep the tag order.
        order.sort_by(|a, b| b.1.cmp(&a.1));

        let mut accruals: HashMap<TagId, f64> = HashMap::new();
        for &(t, d) in &order {
            let lp = log_odds.get(t).unwrap_or(0.0) * damping;
            let acc = accruals.entry(t).or_insert(0.0);
            *acc += lp;
            let acc = *acc;
            if d > 0 {
                let closer: Vec<TagId> = network
                    .neighbors(t)
                    .into_iter()
                    .filter(|n| tags.contains(n) && dists[n] < d)
                    .collect();
                let share = acc / closer.len() as f64;
                for n in closer {
                    *accruals.entry(n).or_insert(0.0) += share;
                }
            }
        }
        Ok(accruals.get(&seed).copied().unwrap_or(0.0))
    }
}

impl Classifier for GraphGuided {
    type Model = GraphGuidedModel;

    fn name(&self) -> &'static str {
        "ngnb"
    }

    fn train(
        &self,
        corpus: &Corpus,
        fields: &[Field],
        train_ids: &[&str],
        tags: &TagVocabulary,
    ) -> Result<Self::Model> {
        let bayes = FieldModels::train_each(fields, |field| {
            NaiveBayesModel::train(corpus, field, train_ids, tags)
        })?;
        let network = TagNetwork::build(corpus, train_ids, tags)?;
        Ok(GraphGuidedModel { bayes, network })
    }

    fn predict(
        &self,
        model: &Self::Model,
        field: Field,
        words: &WordCounts,
        tags: &TagVocabulary,
    ) -> Result<BTreeSet<TagId>> {
        let bayes = model.bayes.get(field)?;
        bayes.check_tags(tags)?;
        self.search(&model.network, &bayes.log_odds(words))
    }
}
