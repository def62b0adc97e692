//! Tag co-occurrence graph.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use hashbrown::HashMap;
use log::debug;
use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::corpus::Corpus;
use crate::errors::{Result, TagnetError};
use crate::tags::{TagId, TagVocabulary};
use crate::utils;

/// Percentile above which a node counts as a hub.
const HUB_PERCENTILE: f64 = 90.0;

/// Node weight: the number of training documents carrying the tag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TagNode {
    pub count: usize,
}

/// Edge weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TagEdge {
    /// Number of training documents carrying both tags. On a self-loop, the number of training
    /// documents carrying the tag alone.
    pub count: usize,

    /// `max_count - count / max_count * max_count + 1`; frequent pairs are close.
    pub distance: f64,
}

/// Undirected weighted graph over the tags of a training set.
///
/// Node `i` of the graph is the tag with ID `i`.
#[derive(Clone, Debug)]
pub struct TagNetwork {
    graph: UnGraph<TagNode, TagEdge>,
    max_node_count: usize,
    max_edge_count: usize,
    n_train_docs: usize,
    total_node_count: usize,
    total_edge_count: usize,
    hubs: BTreeSet<TagId>,
}

impl TagNetwork {
    /// Builds the graph from the tags of `train_ids`.
    ///
    /// # Errors
    ///
    /// [`TagnetError::DegenerateInput`] will be returned if no training document carries a tag
    /// of `tags`.
    pub fn build(corpus: &Corpus, train_ids: &[&str], tags: &TagVocabulary) -> Result<Self> {
        let mut node_counts = vec![0; tags.len()];
        // Keys are ordered pairs (a <= b), so each unordered pair has one entry.
        let mut edge_counts: BTreeMap<(TagId, TagId), usize> = BTreeMap::new();

        for &id in train_ids {
            let doc = corpus.document(id)?;
            let doc_tags: Vec<TagId> = tags.filter(doc.tags()).into_iter().collect();
            for &t in &doc_tags {
                node_counts[t] += 1;
            }
            match doc_tags.as_slice() {
                [] => debug!("tag network: document `{id}` has no vocabulary tag"),
                &[t] => *edge_counts.entry((t, t)).or_insert(0) += 1,
                _ => {
                    for (i, &a) in doc_tags.iter().enumerate() {
                        for &b in &doc_tags[i + 1..] {
                            *edge_counts.entry((a, b)).or_insert(0) += 1;
                        }
                    }
                }
            }
        }

        let max_node_count = node_counts.iter().copied().max().unwrap_or(0);
        let max_edge_count = edge_counts.values().copied().max().unwrap_or(0);
        if max_edge_count == 0 {
            return Err(TagnetError::degenerate_input(
                "no training document carries a vocabulary tag",
            ));
        }

        let mut graph = UnGraph::with_capacity(tags.len(), edge_counts.len());
        for &count in &node_counts {
            graph.add_node(TagNode { count });
        }
        let max = max_edge_count as f64;
        for (&(a, b), &count) in &edge_counts {
            let distance = max - (count as f64 / max) * max + 1.0;
            graph.add_edge(
                NodeIndex::new(a),
                NodeIndex::new(b),
                TagEdge { count, distance },
            );
        }

        let mut network = Self {
            graph,
            max_node_count,
            max_edge_count,
            n_train_docs: train_ids.len(),
            total_node_count: node_counts.iter().sum(),
            total_edge_count: edge_counts.values().sum(),
            hubs: BTreeSet::new(),
        };
        network.hubs = network.select_hubs();
        debug!(
            "tag network: nodes={} edges={} hubs={}",
            network.graph.node_count(),
            network.graph.edge_count(),
            network.hubs.len()
        );
        Ok(network)
    }

    pub fn n_tags(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node_count(&self, tag: TagId) -> usize {
        self.graph[NodeIndex::new(tag)].count
    }

    pub fn edge(&self, a: TagId, b: TagId) -> Option<&TagEdge> {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|e| &self.graph[e])
    }

    pub fn edge_count(&self, a: TagId, b: TagId) -> Option<usize> {
        self.edge(a, b).map(|e| e.count)
    }

    /// Number of training documents on which `tag` appeared alone.
    pub fn self_loop_count(&self, tag: TagId) -> Option<usize> {
        self.edge_count(tag, tag)
    }

    /// Iterates over all edges as `(a, b, edge)` with `a <= b`.
    pub fn edges(&self) -> impl Iterator<Item = (TagId, TagId, &TagEdge)> {
        self.graph.edge_references().map(|e| {
            let (a, b) = (e.source().index(), e.target().index());
            (a.min(b), a.max(b), e.weight())
        })
    }

    /// Iterates over the co-occurring tag pairs as `(a, b, count)` with `a < b`. Self-loops are
    /// left out.
    pub fn co_occurrences(&self) -> impl Iterator<Item = (TagId, TagId, usize)> + '_ {
        self.edges()
            .filter(|&(a, b, _)| a != b)
            .map(|(a, b, e)| (a, b, e.count))
    }

    /// Tags adjacent to `tag`, excluding `tag` itself.
    pub fn neighbors(&self, tag: TagId) -> BTreeSet<TagId> {
        self.graph
            .neighbors(NodeIndex::new(tag))
            .map(NodeIndex::index)
            .filter(|&n| n != tag)
            .collect()
    }

    pub fn max_node_count(&self) -> usize {
        self.max_node_count
    }

    pub fn max_edge_count(&self) -> usize {
        self.max_edge_count
    }

    pub fn n_train_docs(&self) -> usize {
        self.n_train_docs
    }

    /// Sum of all node counts.
    pub fn total_node_count(&self) -> usize {
        self.total_node_count
    }

    /// Sum of all edge counts, self-loops included.
    pub fn total_edge_count(&self) -> usize {
        self.total_edge_count
    }

    /// Tags at or above the 90th percentile of degree, closeness, or betweenness centrality.
    pub fn hubs(&self) -> &BTreeSet<TagId> {
        &self.hubs
    }

    /// Smallest edge count of the subgraph induced by `tags`, self-loops excluded.
    ///
    /// Returns `None` if the subgraph has no edge.
    pub fn min_edge_count(&self, tags: &BTreeSet<TagId>) -> Option<usize> {
        self.edges()
            .filter(|&(a, b, _)| a != b && tags.contains(&a) && tags.contains(&b))
            .map(|(_, _, e)| e.count)
            .min()
    }

    /// Hop distances from `source` to every tag of `tags` reachable inside the subgraph induced
    /// by `tags`.
    pub fn hop_distances(&self, tags: &BTreeSet<TagId>, source: TagId) -> HashMap<TagId, usize> {
        let mut dists = HashMap::new();
        if !tags.contains(&source) {
            return dists;
        }
        dists.insert(source, 0);
        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            let d = dists[&v];
            for w in self.neighbors(v) {
                if tags.contains(&w) && !dists.contains_key(&w) {
                    dists.insert(w, d + 1);
                    queue.push_back(w);
                }
            }
        }
        dists
    }

    fn select_hubs(&self) -> BTreeSet<TagId> {
        let mut hubs = BTreeSet::new();
        for scores in [self.degree(), self.closeness(), self.betweenness()] {
            if let Some(threshold) = utils::percentile(&scores, HUB_PERCENTILE) {
                hubs.extend(
                    scores
                        .iter()
                        .enumerate()
                        .filter(|&(_, &s)| s >= threshold)
                        .map(|(t, _)| t),
                );
            }
        }
        hubs
    }

    /// Degree of every node. A self-loop counts twice.
    pub fn degree(&self) -> Vec<f64> {
        let mut degree = vec![0.0; self.n_tags()];
        for e in self.graph.edge_references() {
            degree[e.source().index()] += 1.0;
            degree[e.target().index()] += 1.0;
        }
        degree
    }

    /// Closeness centrality over `distance`, scaled by the reachable fraction of the graph.
    pub fn closeness(&self) -> Vec<f64> {
        let n = self.n_tags();
        self.graph
            .node_indices()
            .map(|u| {
                let dists = dijkstra(&self.graph, u, None, |e| e.weight().distance);
                let total: f64 = dists.values().sum();
                let reachable = (dists.len() - 1) as f64;
                if total > 0.0 && n > 1 {
                    (reachable / total) * (reachable / (n - 1) as f64)
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Betweenness centrality over `distance` (Brandes' algorithm), normalized by
    /// `1 / ((n - 1) * (n - 2))`.
    pub fn betweenness(&self) -> Vec<f64> {
        let n = self.n_tags();
        let mut adjacency = vec![vec![]; n];
        for (a, b, e) in self.edges() {
            if a != b {
                adjacency[a].push((b, e.distance));
                adjacency[b].push((a, e.distance));
            }
        }

        let mut centrality = vec![0.0; n];
        for s in 0..n {
            let mut order = vec![];
            let mut preds: Vec<Vec<usize>> = vec![vec![]; n];
            let mut sigma = vec![0.0; n];
            let mut settled = vec![false; n];
            let mut seen: Vec<Option<f64>> = vec![None; n];
            let mut heap = BinaryHeap::new();
            let mut seq = 0;

            sigma[s] = 1.0;
            seen[s] = Some(0.0);
            heap.push(Visit { dist: 0.0, seq, node: s });
            while let Some(Visit { dist, node: v, .. }) = heap.pop() {
                if settled[v] {
                    continue;
                }
                settled[v] = true;
                order.push(v);
                for &(w, d) in &adjacency[v] {
                    let vw_dist = dist + d;
                    match seen[w] {
                        Some(sw) if settled[w] || vw_dist > sw => {}
                        Some(sw) if vw_dist == sw => {
                            sigma[w] += sigma[v];
                            preds[w].push(v);
                        }
                        _ => {
                            seen[w] = Some(vw_dist);
                            sigma[w] = sigma[v];
                            preds[w] = vec![v];
                            seq += 1;
                            heap.push(Visit {
                                dist: vw_dist,
                                seq,
                                node: w,
                            });
                        }
                    }
                }
            }

            let mut delta = vec![0.0; n];
            while let Some(w) = order.pop() {
                let coeff = (1.0 + delta[w]) / sigma[w];
                for &v in &preds[w] {
                    delta[v] += sigma[v] * coeff;
                }
                if w != s {
                    centrality[w] += delta[w];
                }
            }
        }

        if n > 2 {
            let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
            for c in &mut centrality {
                *c *= scale;
            }
        }
        centrality
    }
}

/// Priority queue entry of the shortest path search. The smallest distance pops first, and
/// earlier pushes win ties.
#[derive(Clone, Copy, Debug)]
struct Visit {
    dist: f64,
    seq: usize,
    node: usize,
}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Visit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Visit {}
