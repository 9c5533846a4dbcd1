/*!
Longest path layouts over an acyclic [`OverlapGraph`].
All of the layouts are computed with a single dynamic program over the topological order:
`best[v]` is the weight of the heaviest path that ends at `v`, sources start at 0, and ties always favor the smallest node index.
*/

use itertools::Itertools;

use crate::error::OlcResult;
use crate::overlap_graph::{EdgeAttributes, OverlapGraph};

/// Controls how edges contribute to a path weight
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PathWeighting {
    /// Each edge is worth its overlap length
    OverlapLength,
    /// Each edge is worth 1, i.e. the longest path by number of reads
    EdgeCount
}

impl PathWeighting {
    /// Returns the weight of an edge under this weighting
    pub fn edge_weight(&self, attributes: &EdgeAttributes) -> u64 {
        match self {
            PathWeighting::OverlapLength => attributes.overlap_length() as u64,
            PathWeighting::EdgeCount => 1
        }
    }

    /// Index of the cache slot for this weighting
    pub(crate) fn slot(&self) -> usize {
        match self {
            PathWeighting::OverlapLength => 0,
            PathWeighting::EdgeCount => 1
        }
    }
}

/// A path through the graph and its total weight
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Layout {
    /// Node indices from the first read to the last
    path: Vec<usize>,
    /// Sum of the edge weights along the path
    total_weight: u64
}

impl Layout {
    pub fn new(path: Vec<usize>, total_weight: u64) -> Layout {
        Layout { path, total_weight }
    }

    /// The read names along the path
    pub fn names<'a>(&self, graph: &'a OverlapGraph) -> Vec<&'a str> {
        self.path.iter()
            .map(|&i| graph.read(i).name())
            .collect()
    }

    /// Consecutive (source, target) pairs along the path
    pub fn edges(&self) -> impl Iterator<Item = (&usize, &usize)> + '_ {
        self.path.iter().tuple_windows()
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    // Getters
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }
}

/// Result of the dynamic program
struct PathScores {
    /// Heaviest path weight ending at each node
    best: Vec<u64>,
    /// Predecessor on that path, `None` for path starts
    back: Vec<Option<usize>>
}

/// Runs the longest path DP, skipping excluded nodes entirely.
fn score_paths(graph: &OverlapGraph, order: &[usize], weighting: PathWeighting, excluded: &[bool]) -> PathScores {
    let n = graph.node_count();
    let mut best = vec![0; n];
    let mut back: Vec<Option<usize>> = vec![None; n];
    for &v in order.iter().filter(|&&v| !excluded[v]) {
        // predecessors are sorted, so a strict comparison keeps the smallest index on ties
        for &u in graph.predecessors(v).iter().filter(|&&u| !excluded[u]) {
            let attributes = graph.edge(u, v).expect("predecessor lists match the edge map");
            let candidate = best[u] + weighting.edge_weight(attributes);
            if back[v].is_none() || candidate > best[v] {
                best[v] = candidate;
                back[v] = Some(u);
            }
        }
    }
    PathScores { best, back }
}

/// Picks the terminal node and walks the back-pointers
fn trace_best(scores: &PathScores, excluded: &[bool]) -> Layout {
    let mut terminal: Option<usize> = None;
    for v in (0..scores.best.len()).filter(|&v| !excluded[v]) {
        if terminal.map_or(true, |t| scores.best[v] > scores.best[t]) {
            terminal = Some(v);
        }
    }

    let Some(terminal) = terminal else {
        return Layout::default();
    };
    let mut path = vec![terminal];
    let mut current = terminal;
    while let Some(prev) = scores.back[current] {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    Layout::new(path, scores.best[terminal])
}

/// Computes the longest path of the graph.
/// A non-empty graph always has at least a one-node layout.
/// # Errors
/// * `CyclicGraph` if the graph contains a cycle
pub fn longest_path(graph: &OverlapGraph, weighting: PathWeighting) -> OlcResult<Layout> {
    let order = graph.topological_order()?;
    let excluded = vec![false; graph.node_count()];
    let scores = score_paths(graph, &order, weighting, &excluded);
    Ok(trace_best(&scores, &excluded))
}

/// Repeatedly takes the longest path over the nodes that are not used yet, stopping once only single nodes remain.
/// # Errors
/// * `CyclicGraph` if the graph contains a cycle
pub fn path_cover(graph: &OverlapGraph, weighting: PathWeighting) -> OlcResult<Vec<Layout>> {
    let order = graph.topological_order()?;
    let mut used = vec![false; graph.node_count()];
    let mut paths = vec![];
    loop {
        let scores = score_paths(graph, &order, weighting, &used);
        let layout = trace_best(&scores, &used);
        if layout.len() < 2 {
            break;
        }
        for &v in layout.path() {
            used[v] = true;
        }
        paths.push(layout);
    }
    Ok(paths)
}

/// Lazy iterator over every path whose weight equals the maximum.
/// Paths are grouped by their last node in ascending order, and each one is yielded from start to end.
pub struct LongestPaths<'a> {
    graph: &'a OverlapGraph,
    weighting: PathWeighting,
    /// Heaviest path weight ending at each node
    best: Vec<u64>,
    /// Remaining nodes where a maximum-weight path ends
    terminals: std::vec::IntoIter<usize>,
    /// Partial path from the terminal backwards, with the next option to try at each node.
    /// Option 0 is "start the path here", option `k > 0` is the predecessor at offset `k - 1`.
    stack: Vec<(usize, usize)>
}

impl<'a> LongestPaths<'a> {
    /// # Errors
    /// * `CyclicGraph` if the graph contains a cycle
    pub fn new(graph: &'a OverlapGraph, weighting: PathWeighting) -> OlcResult<LongestPaths<'a>> {
        let order = graph.topological_order()?;
        let excluded = vec![false; graph.node_count()];
        let best = score_paths(graph, &order, weighting, &excluded).best;
        let max_weight = best.iter().copied().max().unwrap_or(0);
        let terminals: Vec<usize> = (0..best.len())
            .filter(|&v| best[v] == max_weight)
            .collect();
        Ok(LongestPaths {
            graph,
            weighting,
            best,
            terminals: terminals.into_iter(),
            stack: vec![]
        })
    }
}

impl<'a> Iterator for LongestPaths<'a> {
    type Item = Layout;

    fn next(&mut self) -> Option<Layout> {
        loop {
            let Some(&(node, option)) = self.stack.last() else {
                let terminal = self.terminals.next()?;
                self.stack.push((terminal, 0));
                continue;
            };
            let depth = self.stack.len() - 1;
            self.stack[depth].1 += 1;

            if option == 0 {
                if self.best[node] == 0 {
                    let path: Vec<usize> = self.stack.iter().rev().map(|&(v, _o)| v).collect();
                    let total_weight = self.best[self.stack[0].0];
                    return Some(Layout::new(path, total_weight));
                }
                continue;
            }

            let predecessors = self.graph.predecessors(node);
            if option > predecessors.len() {
                self.stack.pop();
                continue;
            }
            let pred = predecessors[option - 1];
            let attributes = self.graph.edge(pred, node).expect("predecessor lists match the edge map");
            // only follow predecessors that sit on a heaviest path into this node
            if self.best[pred] + self.weighting.edge_weight(attributes) == self.best[node] {
                self.stack.push((pred, 0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};

    use crate::error::OlcError;
    use crate::overlap_graph::EdgeAttributes;
    use crate::read::Read;

    fn graph_from_edges(num_nodes: usize, edges: &[(usize, usize, usize)]) -> OverlapGraph {
        let mut graph = OverlapGraph::new();
        for i in 0..num_nodes {
            graph.add_read(Read::new(format!("n{i}"), 100)).unwrap();
        }
        for &(s, t, w) in edges.iter() {
            graph.add_edge(s, t, EdgeAttributes::with_length(w)).unwrap();
        }
        graph
    }

    /// Enumerates every path by brute force and returns (max weight, all paths with that weight)
    fn brute_force(graph: &OverlapGraph, weighting: PathWeighting) -> (u64, Vec<Vec<usize>>) {
        let mut all: Vec<(u64, Vec<usize>)> = vec![];
        let mut stack: Vec<(Vec<usize>, u64)> = (0..graph.node_count()).map(|v| (vec![v], 0)).collect();
        while let Some((path, weight)) = stack.pop() {
            let last = *path.last().unwrap();
            for &succ in graph.successors(last) {
                let mut extended = path.clone();
                extended.push(succ);
                let w = weight + weighting.edge_weight(graph.edge(last, succ).unwrap());
                stack.push((extended, w));
            }
            all.push((weight, path));
        }
        let max_weight = all.iter().map(|(w, _p)| *w).max().unwrap_or(0);
        let mut best: Vec<Vec<usize>> = all.into_iter()
            .filter(|(w, _p)| *w == max_weight)
            .map(|(_w, p)| p)
            .collect();
        best.sort();
        (max_weight, best)
    }

    /// Random DAG where edges always go from the smaller to the larger index
    fn random_dag(num_nodes: usize, edge_prob: f64, seed: u64) -> OverlapGraph {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut edges = vec![];
        for s in 0..num_nodes {
            for t in (s + 1)..num_nodes {
                if rng.gen_bool(edge_prob) {
                    edges.push((s, t, rng.gen_range(1..20)));
                }
            }
        }
        graph_from_edges(num_nodes, &edges)
    }

    #[test]
    fn test_simple_chain() {
        let graph = graph_from_edges(4, &[(0, 1, 5), (1, 2, 5), (2, 3, 5), (0, 3, 12)]);
        let layout = longest_path(&graph, PathWeighting::OverlapLength).unwrap();
        assert_eq!(layout.path(), &[0, 1, 2, 3]);
        assert_eq!(layout.total_weight(), 15);
        assert_eq!(layout.edges().collect::<Vec<_>>(), vec![(&0, &1), (&1, &2), (&2, &3)]);

        let layout = longest_path(&graph, PathWeighting::EdgeCount).unwrap();
        assert_eq!(layout.total_weight(), 3);
    }

    #[test]
    fn test_tie_breaks() {
        // two equal paths into node 3, the smaller predecessor wins
        let graph = graph_from_edges(4, &[(0, 2, 5), (1, 2, 5), (2, 3, 5)]);
        let layout = longest_path(&graph, PathWeighting::OverlapLength).unwrap();
        assert_eq!(layout.path(), &[0, 2, 3]);

        // two separate components with the same weight, the smaller terminal wins
        let graph = graph_from_edges(4, &[(2, 3, 7), (0, 1, 7)]);
        let layout = longest_path(&graph, PathWeighting::OverlapLength).unwrap();
        assert_eq!(layout.path(), &[0, 1]);
    }

    #[test]
    fn test_no_edges() {
        let graph = graph_from_edges(3, &[]);
        let layout = longest_path(&graph, PathWeighting::OverlapLength).unwrap();
        assert_eq!(layout.path(), &[0]);
        assert_eq!(layout.total_weight(), 0);
        assert!(path_cover(&graph, PathWeighting::OverlapLength).unwrap().is_empty());
        assert_eq!(LongestPaths::new(&graph, PathWeighting::OverlapLength).unwrap().count(), 3);
    }

    #[test]
    fn test_cyclic() {
        let graph = graph_from_edges(3, &[(0, 1, 1), (1, 2, 1), (2, 0, 1)]);
        assert_eq!(longest_path(&graph, PathWeighting::OverlapLength), Err(OlcError::CyclicGraph));
        assert!(LongestPaths::new(&graph, PathWeighting::EdgeCount).is_err());
        assert!(path_cover(&graph, PathWeighting::EdgeCount).is_err());
    }

    #[test]
    fn test_all_longest_paths() {
        // diamond with equal arms plus a second component of equal weight
        let graph = graph_from_edges(6, &[(0, 1, 3), (0, 2, 3), (1, 3, 3), (2, 3, 3), (4, 5, 6)]);
        let paths: Vec<Vec<usize>> = LongestPaths::new(&graph, PathWeighting::OverlapLength).unwrap()
            .map(|l| {
                assert_eq!(l.total_weight(), 6);
                l.path().to_vec()
            })
            .collect();
        assert_eq!(paths, vec![vec![0, 1, 3], vec![0, 2, 3], vec![4, 5]]);
    }

    #[test]
    fn test_path_cover() {
        let graph = graph_from_edges(6, &[(0, 1, 10), (1, 2, 10), (3, 1, 5), (3, 4, 2), (4, 5, 2)]);
        let cover = path_cover(&graph, PathWeighting::OverlapLength).unwrap();
        let paths: Vec<&[usize]> = cover.iter().map(|l| l.path()).collect();
        assert_eq!(paths, vec![&[0, 1, 2][..], &[3, 4, 5][..]]);
        assert_eq!(cover[1].total_weight(), 4);
    }

    #[test]
    fn test_brute_force_agreement() {
        for seed in 0..30 {
            let num_nodes = 3 + (seed as usize % 8);
            let graph = random_dag(num_nodes, 0.35, seed);
            for weighting in [PathWeighting::OverlapLength, PathWeighting::EdgeCount] {
                let (max_weight, mut expected) = brute_force(&graph, weighting);
                let layout = longest_path(&graph, weighting).unwrap();
                assert_eq!(layout.total_weight(), max_weight);
                assert!(expected.contains(&layout.path().to_vec()));

                let mut found: Vec<Vec<usize>> = LongestPaths::new(&graph, weighting).unwrap()
                    .map(|l| l.path().to_vec())
                    .collect();
                found.sort();
                expected.sort();
                assert_eq!(found, expected);
            }
        }
    }
}
