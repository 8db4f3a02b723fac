//! Layered small-world graph: storage, insertion and per-layer search.
//!
//! Vertices are inserted one at a time in row order with levels drawn from a
//! seeded RNG, so a given seed always yields the same graph. Upper layers keep
//! at most `max_connections` links per vertex and layer zero twice that.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashSet},
};

use rand::{Rng, SeedableRng, distributions::Standard, rngs::SmallRng};

use crate::{
    features::FeatureMatrix,
    search::{GraphIndexParams, Neighbour},
};

use super::Space;

#[derive(Clone, Debug)]
struct Node {
    links: Vec<Vec<usize>>,
}

impl Node {
    fn new(level: usize) -> Self {
        Self {
            links: vec![Vec::new(); level + 1],
        }
    }

    fn links(&self, level: usize) -> &[usize] {
        self.links.get(level).map_or(&[][..], Vec::as_slice)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct EntryPoint {
    pub(super) node: usize,
    pub(super) level: usize,
}

#[derive(Debug)]
struct SearchState {
    visited: HashSet<usize>,
    candidates: BinaryHeap<Reverse<Neighbour>>,
    best: BinaryHeap<Neighbour>,
}

impl SearchState {
    fn new(entry: Neighbour) -> Self {
        Self {
            visited: HashSet::from([entry.id]),
            candidates: BinaryHeap::from([Reverse(entry)]),
            best: BinaryHeap::from([entry]),
        }
    }

    fn should_terminate(&self, ef: usize, candidate: &Neighbour) -> bool {
        self.best.len() >= ef && self.best.peek().is_some_and(|furthest| candidate > furthest)
    }

    fn try_enqueue(&mut self, candidate: Neighbour, ef: usize) {
        if self.best.len() >= ef && self.best.peek().is_some_and(|furthest| candidate > *furthest) {
            return;
        }
        self.candidates.push(Reverse(candidate));
        self.best.push(candidate);
        while self.best.len() > ef {
            self.best.pop();
        }
    }

    fn finalise(self) -> Vec<Neighbour> {
        self.best.into_sorted_vec()
    }
}

#[derive(Debug)]
pub(super) struct LayeredGraph<'a> {
    features: &'a FeatureMatrix,
    space: Space,
    nodes: Vec<Node>,
    entry: Option<EntryPoint>,
}

impl<'a> LayeredGraph<'a> {
    pub(super) fn build(features: &'a FeatureMatrix, space: Space, params: &GraphIndexParams) -> Self {
        let mut graph = Self {
            features,
            space,
            nodes: Vec::with_capacity(features.len()),
            entry: None,
        };
        let mut rng = SmallRng::seed_from_u64(params.seed());
        for id in 0..features.len() {
            let level = sample_level(&mut rng, params);
            graph.insert(id, level, params);
        }
        graph
    }

    pub(super) fn entry(&self) -> Option<EntryPoint> {
        self.entry
    }

    pub(super) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(super) fn distance(&self, query: &[f64], node: usize) -> f64 {
        self.space.distance(query, self.features.row(node))
    }

    fn insert(&mut self, id: usize, level: usize, params: &GraphIndexParams) {
        self.nodes.push(Node::new(level));
        let Some(entry) = self.entry else {
            self.entry = Some(EntryPoint { node: id, level });
            return;
        };
        let features = self.features;
        let query = features.row(id);
        let mut current = entry.node;
        for layer in (level + 1..=entry.level).rev() {
            current = self.greedy_search_layer(query, current, layer);
        }
        for layer in (0..=level.min(entry.level)).rev() {
            let candidates = self.search_layer(query, current, layer, params.ef_construction());
            let selected: Vec<usize> = candidates
                .iter()
                .take(params.max_connections())
                .map(|neighbour| neighbour.id)
                .collect();
            let capacity = layer_capacity(layer, params);
            for &neighbour in &selected {
                self.link(neighbour, id, layer, capacity);
            }
            self.nodes[id].links[layer] = selected;
            if let Some(closest) = candidates.first() {
                current = closest.id;
            }
        }
        if level > entry.level {
            self.entry = Some(EntryPoint { node: id, level });
        }
    }

    /// Adds `new` to the links of `node`, keeping the closest `capacity`.
    fn link(&mut self, node: usize, new: usize, layer: usize, capacity: usize) {
        let links = &mut self.nodes[node].links[layer];
        if links.contains(&new) {
            return;
        }
        links.push(new);
        if links.len() <= capacity {
            return;
        }
        let features = self.features;
        let origin = features.row(node);
        let mut ranked: Vec<Neighbour> = self.nodes[node].links[layer]
            .iter()
            .map(|&id| Neighbour {
                id,
                distance: self.space.distance(origin, features.row(id)),
            })
            .collect();
        ranked.sort_unstable();
        ranked.truncate(capacity);
        self.nodes[node].links[layer] = ranked.into_iter().map(|neighbour| neighbour.id).collect();
    }

    /// Walks greedily towards `query` on one layer, returning the local
    /// optimum.
    pub(super) fn greedy_search_layer(&self, query: &[f64], entry: usize, layer: usize) -> usize {
        let mut current = Neighbour {
            id: entry,
            distance: self.distance(query, entry),
        };
        loop {
            let best = self.nodes[current.id]
                .links(layer)
                .iter()
                .map(|&id| Neighbour {
                    id,
                    distance: self.distance(query, id),
                })
                .min();
            match best {
                Some(next) if next < current => current = next,
                _ => return current.id,
            }
        }
    }

    /// Best-first search on one layer, returning up to `ef` vertices sorted
    /// by `(distance, id)`.
    pub(super) fn search_layer(
        &self,
        query: &[f64],
        entry: usize,
        layer: usize,
        ef: usize,
    ) -> Vec<Neighbour> {
        let mut state = SearchState::new(Neighbour {
            id: entry,
            distance: self.distance(query, entry),
        });
        while let Some(Reverse(candidate)) = state.candidates.pop() {
            if state.should_terminate(ef, &candidate) {
                break;
            }
            for &id in self.nodes[candidate.id].links(layer) {
                if state.visited.insert(id) {
                    let distance = self.distance(query, id);
                    state.try_enqueue(Neighbour { id, distance }, ef);
                }
            }
        }
        state.finalise()
    }

    #[cfg(test)]
    fn links(&self, node: usize, layer: usize) -> &[usize] {
        self.nodes[node].links(layer)
    }
}

fn layer_capacity(layer: usize, params: &GraphIndexParams) -> usize {
    if layer == 0 {
        params.max_connections() * 2
    } else {
        params.max_connections()
    }
}

fn sample_level(rng: &mut SmallRng, params: &GraphIndexParams) -> usize {
    let mut level = 0_usize;
    while level < params.max_level() {
        let draw: f64 = rng.sample(Standard);
        if params.should_stop(draw) {
            break;
        }
        level += 1;
    }
    level
}
