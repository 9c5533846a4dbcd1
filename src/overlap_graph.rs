/*!
The directed overlap graph over reads.
Edges point from the read that starts first to the read that starts second, and carry the alignment evidence as [`EdgeAttributes`].
The graph may contain cycles after construction; [`OverlapGraph::break_cycles`] removes a feedback arc set and the layout is the longest path of the result.

# Example usage
```rust
use olc_layout::cycle_breaker::CycleBreaker;
use olc_layout::overlap_graph::{EdgeAttributes, GraphState, OverlapGraph};
use olc_layout::read::Read;

let mut graph = OverlapGraph::new();
for name in ["R1", "R2", "R3"] {
    graph.add_read(Read::new(name, 1000)).unwrap();
}
graph.add_edge_by_name("R1", "R2", EdgeAttributes::with_length(600)).unwrap();
graph.add_edge_by_name("R2", "R3", EdgeAttributes::with_length(600)).unwrap();
graph.add_edge_by_name("R3", "R1", EdgeAttributes::with_length(50)).unwrap();
assert!(!graph.is_acyclic());

let removed = graph.break_cycles(&CycleBreaker::Heuristic).unwrap();
assert_eq!(removed.len(), 1);
assert_eq!(graph.state(), GraphState::Acyclic);

let layout = graph.layout().unwrap();
assert_eq!(layout.names(&graph), vec!["R1", "R2", "R3"]);
assert_eq!(layout.total_weight(), 1200);
```
*/

use log::debug;
use rustc_hash::FxHashMap as HashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::OnceLock;

use crate::cycle_breaker::FeedbackArcSet;
use crate::error::{OlcError, OlcResult};
use crate::graph_diff::{diff_graphs, render_diff, GraphDiff, WeightsFrom};
use crate::graph_layout::{longest_path, path_cover, Layout, LongestPaths, PathWeighting};
use crate::read::Read;

/// The evidence attached to a single overlap edge
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeAttributes {
    /// Number of overlapping bases, this is the edge weight
    overlap_length: usize,
    /// Start of the target in the coordinates of the source
    shift: i64,
    /// Alignment score of the overlap
    score: f64,
    /// Fraction of aligned columns that are matches
    identity: f64,
    /// True if both reads come from the same strand
    strand_consistent: bool
}

impl EdgeAttributes {
    pub fn new(overlap_length: usize, shift: i64, score: f64, identity: f64, strand_consistent: bool) -> EdgeAttributes {
        EdgeAttributes {
            overlap_length,
            shift,
            score,
            identity,
            strand_consistent
        }
    }

    /// Attributes for an exact overlap where only the length is known
    pub fn with_length(overlap_length: usize) -> EdgeAttributes {
        EdgeAttributes::new(overlap_length, 0, overlap_length as f64, 1.0, true)
    }

    // Getters
    pub fn overlap_length(&self) -> usize {
        self.overlap_length
    }

    pub fn shift(&self) -> i64 {
        self.shift
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn identity(&self) -> f64 {
        self.identity
    }

    pub fn strand_consistent(&self) -> bool {
        self.strand_consistent
    }
}

/// Lifecycle of a graph; adding an edge always returns it to `Built`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GraphState {
    /// Edges were added, the graph may contain cycles
    Built,
    /// Cycle breaking has run and the graph is a DAG
    Acyclic
}

/// An edge that was removed during cycle breaking
#[derive(Clone, Debug, PartialEq)]
pub struct RemovedEdge {
    pub source: usize,
    pub target: usize,
    pub attributes: EdgeAttributes
}

/// Plain form of a graph for persistence, edges reference reads by name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphParts {
    pub reads: Vec<Read>,
    pub edges: Vec<(String, String, EdgeAttributes)>
}

/// Directed overlap graph with at most one edge per ordered pair and no two-cycles
#[derive(Clone, Debug, Default)]
pub struct OverlapGraph {
    /// Node data, the index is the node id
    reads: Vec<Read>,
    /// Lookup from read name to node id
    name_index: HashMap<String, usize>,
    /// Sorted successor lists
    out_edges: Vec<Vec<usize>>,
    /// Sorted predecessor lists
    in_edges: Vec<Vec<usize>>,
    /// Edge evidence keyed by (source, target)
    attributes: HashMap<(usize, usize), EdgeAttributes>,
    /// Current lifecycle state
    state: GraphState,
    /// Cached layouts, one slot per weighting
    layout_cache: [OnceLock<Layout>; 2]
}

impl Default for GraphState {
    fn default() -> Self {
        GraphState::Built
    }
}

impl OverlapGraph {
    pub fn new() -> OverlapGraph {
        Default::default()
    }

    /// Adds a read as a new node and returns its index.
    /// Re-adding an identical read returns the existing index.
    /// # Errors
    /// * if a different read with the same name is already present
    pub fn add_read(&mut self, read: Read) -> OlcResult<usize> {
        if let Some(&index) = self.name_index.get(read.name()) {
            if self.reads[index] == read {
                return Ok(index);
            }
            return Err(OlcError::DuplicateRead(read.name().to_string()));
        }

        let index = self.reads.len();
        self.name_index.insert(read.name().to_string(), index);
        self.reads.push(read);
        self.out_edges.push(vec![]);
        self.in_edges.push(vec![]);
        self.invalidate();
        Ok(index)
    }

    /// Adds a directed overlap edge from `source` to `target`.
    /// Re-adding an identical edge is a no-op and leaves the state unchanged.
    /// # Errors
    /// * `UnknownNode` if either index is not in the graph
    /// * `SelfLoop` if `source == target`
    /// * `ConflictingDirection` if the reverse edge is already present
    /// * `DuplicateEdge` if the edge exists with different attributes
    pub fn add_edge(&mut self, source: usize, target: usize, attributes: EdgeAttributes) -> OlcResult<()> {
        self.check_node(source)?;
        self.check_node(target)?;
        if source == target {
            return Err(OlcError::SelfLoop(self.reads[source].name().to_string()));
        }
        if self.attributes.contains_key(&(target, source)) {
            return Err(OlcError::ConflictingDirection {
                source: self.reads[source].name().to_string(),
                target: self.reads[target].name().to_string()
            });
        }
        if let Some(existing) = self.attributes.get(&(source, target)) {
            if *existing != attributes {
                return Err(OlcError::DuplicateEdge {
                    source: self.reads[source].name().to_string(),
                    target: self.reads[target].name().to_string()
                });
            }
            return Ok(());
        }

        insert_sorted(&mut self.out_edges[source], target);
        insert_sorted(&mut self.in_edges[target], source);
        self.attributes.insert((source, target), attributes);
        self.state = GraphState::Built;
        self.invalidate();
        Ok(())
    }

    /// Same as [`OverlapGraph::add_edge`], but the reads are looked up by name.
    /// # Errors
    /// * `UnknownRead` if either name is not in the graph, otherwise the same as `add_edge`
    pub fn add_edge_by_name(&mut self, source: &str, target: &str, attributes: EdgeAttributes) -> OlcResult<()> {
        let s = self.node_index(source).ok_or_else(|| OlcError::UnknownRead(source.to_string()))?;
        let t = self.node_index(target).ok_or_else(|| OlcError::UnknownRead(target.to_string()))?;
        self.add_edge(s, t, attributes)
    }

    /// Removes an edge and returns its attributes, if it was present
    pub(crate) fn remove_edge(&mut self, source: usize, target: usize) -> Option<EdgeAttributes> {
        let attributes = self.attributes.remove(&(source, target))?;
        if let Ok(pos) = self.out_edges[source].binary_search(&target) {
            self.out_edges[source].remove(pos);
        }
        if let Ok(pos) = self.in_edges[target].binary_search(&source) {
            self.in_edges[target].remove(pos);
        }
        self.invalidate();
        Some(attributes)
    }

    /// Returns the nodes in topological order.
    /// Among the available nodes the smallest index always goes first, so the order is unique.
    /// # Errors
    /// * `CyclicGraph` if the graph contains a cycle
    pub fn topological_order(&self) -> OlcResult<Vec<usize>> {
        let mut in_degree: Vec<usize> = self.in_edges.iter().map(|p| p.len()).collect();
        let mut heap: BinaryHeap<Reverse<usize>> = in_degree.iter().enumerate()
            .filter(|(_i, &d)| d == 0)
            .map(|(i, _d)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.node_count());
        while let Some(Reverse(node)) = heap.pop() {
            order.push(node);
            for &succ in self.out_edges[node].iter() {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    heap.push(Reverse(succ));
                }
            }
        }

        if order.len() == self.node_count() {
            Ok(order)
        } else {
            Err(OlcError::CyclicGraph)
        }
    }

    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_ok()
    }

    /// Removes a feedback arc set chosen by `breaker` so that the graph becomes acyclic.
    /// Returns the removed edges sorted by (source, target); an acyclic graph loses nothing.
    /// # Arguments
    /// * `breaker` - the strategy that picks the edges, typically a [`crate::cycle_breaker::CycleBreaker`]
    /// # Errors
    /// * if the strategy fails, e.g. `InfeasibleExactBreak`
    /// * `CyclicGraph` if the strategy returned a set that leaves a cycle; the graph is left unchanged in that case
    pub fn break_cycles<F: FeedbackArcSet + ?Sized>(&mut self, breaker: &F) -> OlcResult<Vec<RemovedEdge>> {
        if self.is_acyclic() {
            self.state = GraphState::Acyclic;
            return Ok(vec![]);
        }

        let mut arc_set = breaker.feedback_arc_set(self)?;
        arc_set.sort_unstable();
        arc_set.dedup();
        debug!("{} feedback arc set has {} edges", breaker.name(), arc_set.len());

        let mut removed = Vec::with_capacity(arc_set.len());
        for (source, target) in arc_set.into_iter() {
            if let Some(edge_text) = self.edge_to_string(source, target) {
                debug!("Removing {edge_text}");
            }
            if let Some(attributes) = self.remove_edge(source, target) {
                removed.push(RemovedEdge { source, target, attributes });
            }
        }

        if !self.is_acyclic() {
            for edge in removed.into_iter() {
                self.add_edge(edge.source, edge.target, edge.attributes)?;
            }
            return Err(OlcError::CyclicGraph);
        }
        self.state = GraphState::Acyclic;
        Ok(removed)
    }

    /// The longest path by overlap length.
    /// # Errors
    /// * `CyclicGraph` if the graph contains a cycle
    pub fn layout(&self) -> OlcResult<&Layout> {
        self.layout_with(PathWeighting::OverlapLength)
    }

    /// The longest path under the given weighting; cached until the next mutation.
    /// # Errors
    /// * `CyclicGraph` if the graph contains a cycle
    pub fn layout_with(&self, weighting: PathWeighting) -> OlcResult<&Layout> {
        let slot = &self.layout_cache[weighting.slot()];
        if let Some(layout) = slot.get() {
            return Ok(layout);
        }
        let layout = longest_path(self, weighting)?;
        Ok(slot.get_or_init(|| layout))
    }

    /// Lazily enumerates every path with the maximum weight.
    /// # Errors
    /// * `CyclicGraph` if the graph contains a cycle
    pub fn all_longest_paths(&self, weighting: PathWeighting) -> OlcResult<LongestPaths<'_>> {
        LongestPaths::new(self, weighting)
    }

    /// Splits the graph into vertex-disjoint paths by repeatedly taking the longest path over the unused nodes.
    /// # Errors
    /// * `CyclicGraph` if the graph contains a cycle
    pub fn path_cover(&self, weighting: PathWeighting) -> OlcResult<Vec<Layout>> {
        path_cover(self, weighting)
    }

    /// Builds a graph with all of the reads but only the edges of the layout.
    /// # Arguments
    /// * `full` - if true, keep the edges of the whole path cover instead of just the longest path
    /// # Errors
    /// * `CyclicGraph` if the graph contains a cycle
    pub fn layout_subgraph(&self, full: bool) -> OlcResult<OverlapGraph> {
        let paths = if full {
            self.path_cover(PathWeighting::OverlapLength)?
        } else {
            vec![self.layout()?.clone()]
        };

        let mut subgraph = OverlapGraph::new();
        for read in self.reads.iter() {
            subgraph.add_read(read.clone())?;
        }
        for path in paths.iter() {
            for (&s, &t) in path.edges() {
                let attributes = self.attributes[&(s, t)].clone();
                subgraph.add_edge(s, t, attributes)?;
            }
        }
        Ok(subgraph)
    }

    /// Compares this graph against `other`, usually the ground truth
    pub fn diff(&self, other: &OverlapGraph) -> GraphDiff {
        diff_graphs(self, other)
    }

    /// Renders the diff against `other` as text.
    /// # Arguments
    /// * `other` - the graph to compare against
    /// * `summary_only` - if true, only the summary line is produced
    /// * `weights_from` - which graph provides the attributes printed for shared edges
    pub fn diff_text(&self, other: &OverlapGraph, summary_only: bool, weights_from: WeightsFrom) -> String {
        let diff = self.diff(other);
        render_diff(self, other, &diff, summary_only, weights_from)
    }

    /// Rebuilds a graph from its parts.
    /// # Errors
    /// * if any read or edge is rejected, see `add_read` and `add_edge_by_name`
    pub fn from_parts(parts: GraphParts) -> OlcResult<OverlapGraph> {
        let mut graph = OverlapGraph::new();
        for read in parts.reads.into_iter() {
            graph.add_read(read)?;
        }
        for (source, target, attributes) in parts.edges.into_iter() {
            graph.add_edge_by_name(&source, &target, attributes)?;
        }
        Ok(graph)
    }

    /// Splits the graph into reads and named edges
    pub fn to_parts(&self) -> GraphParts {
        let edges = self.edges()
            .map(|(s, t, attributes)| {
                (self.reads[s].name().to_string(), self.reads[t].name().to_string(), attributes.clone())
            })
            .collect();
        GraphParts {
            reads: self.reads.clone(),
            edges
        }
    }

    /// Fixed-width description of an edge, `None` if the edge is absent
    pub fn edge_to_string(&self, source: usize, target: usize) -> Option<String> {
        let attributes = self.attributes.get(&(source, target))?;
        Some(format!(
            "{:>16} -> {:<16} len={:>7} shift={:>7} score={:>9.1} identity={:.3}{}",
            self.reads[source].name(),
            self.reads[target].name(),
            attributes.overlap_length,
            attributes.shift,
            attributes.score,
            attributes.identity,
            if attributes.strand_consistent { "" } else { " strand-mismatch" }
        ))
    }

    /// All edges sorted by (source, target)
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &EdgeAttributes)> + '_ {
        self.out_edges.iter().enumerate()
            .flat_map(move |(s, succs)| {
                succs.iter().map(move |&t| (s, t, &self.attributes[&(s, t)]))
            })
    }

    fn check_node(&self, index: usize) -> OlcResult<()> {
        if index < self.reads.len() {
            Ok(())
        } else {
            Err(OlcError::UnknownNode(index))
        }
    }

    fn invalidate(&mut self) {
        self.layout_cache = Default::default();
    }

    // Getters
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    pub fn read(&self, index: usize) -> &Read {
        &self.reads[index]
    }

    pub fn reads(&self) -> &[Read] {
        &self.reads
    }

    pub fn node_count(&self) -> usize {
        self.reads.len()
    }

    pub fn edge_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn edge(&self, source: usize, target: usize) -> Option<&EdgeAttributes> {
        self.attributes.get(&(source, target))
    }

    pub fn has_edge(&self, source: usize, target: usize) -> bool {
        self.attributes.contains_key(&(source, target))
    }

    pub fn successors(&self, index: usize) -> &[usize] {
        &self.out_edges[index]
    }

    pub fn predecessors(&self, index: usize) -> &[usize] {
        &self.in_edges[index]
    }

    pub fn state(&self) -> GraphState {
        self.state
    }
}

fn insert_sorted(values: &mut Vec<usize>, value: usize) {
    if let Err(pos) = values.binary_search(&value) {
        values.insert(pos, value);
    }
}
