use std::collections::BTreeSet;

use crate::overlap_graph::OverlapGraph;

/// Selects which graph provides the printed attributes of an edge present in both
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WeightsFrom {
    Ours,
    Theirs
}

/// Directed structural comparison of two graphs, keyed by read names.
/// "Ours" is usually the assembled graph and "theirs" the ground truth.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphDiff {
    /// Edges present in both graphs
    pub true_positives: Vec<(String, String)>,
    /// Edges only present in theirs
    pub false_negatives: Vec<(String, String)>,
    /// Edges only present in ours
    pub false_positives: Vec<(String, String)>,
    /// Edges of theirs where ours has the opposite direction; these are also counted as FN and FP
    pub reversed: Vec<(String, String)>
}

impl GraphDiff {
    /// Fraction of our edges that are correct, 1.0 if we have no edges
    pub fn precision(&self) -> f64 {
        let total = self.true_positives.len() + self.false_positives.len();
        if total == 0 {
            1.0
        } else {
            self.true_positives.len() as f64 / total as f64
        }
    }

    /// Fraction of their edges that we found, 1.0 if they have no edges
    pub fn recall(&self) -> f64 {
        let total = self.true_positives.len() + self.false_negatives.len();
        if total == 0 {
            1.0
        } else {
            self.true_positives.len() as f64 / total as f64
        }
    }

    /// True if both graphs have exactly the same edges
    pub fn is_identical(&self) -> bool {
        self.false_negatives.is_empty() && self.false_positives.is_empty()
    }

    /// One line summary with the counts and rates
    pub fn summary(&self) -> String {
        format!(
            "TP={} FN={} FP={} reversed={} precision={:.3} recall={:.3}",
            self.true_positives.len(),
            self.false_negatives.len(),
            self.false_positives.len(),
            self.reversed.len(),
            self.precision(),
            self.recall()
        )
    }
}

fn named_edges(graph: &OverlapGraph) -> BTreeSet<(String, String)> {
    graph.edges()
        .map(|(s, t, _a)| (graph.read(s).name().to_string(), graph.read(t).name().to_string()))
        .collect()
}

/// Compares `ours` against `theirs`; all lists are sorted by name
pub fn diff_graphs(ours: &OverlapGraph, theirs: &OverlapGraph) -> GraphDiff {
    let our_edges = named_edges(ours);
    let their_edges = named_edges(theirs);

    let true_positives = our_edges.intersection(&their_edges).cloned().collect();
    let false_negatives = their_edges.difference(&our_edges).cloned().collect();
    let false_positives = our_edges.difference(&their_edges).cloned().collect();
    let reversed = their_edges.iter()
        .filter(|(s, t)| our_edges.contains(&(t.clone(), s.clone())))
        .cloned()
        .collect();

    GraphDiff {
        true_positives,
        false_negatives,
        false_positives,
        reversed
    }
}

/// Renders a diff as text: the summary line and, unless `summary_only`, one line per edge in name order.
/// Lines start with `-` for edges only in ours, `+` for edges only in theirs, and a space for shared edges.
pub fn render_diff(ours: &OverlapGraph, theirs: &OverlapGraph, diff: &GraphDiff, summary_only: bool, weights_from: WeightsFrom) -> String {
    let mut lines = vec![diff.summary()];
    if summary_only {
        return lines.join("\n");
    }

    let mut tagged: Vec<(&(String, String), char)> = vec![];
    tagged.extend(diff.true_positives.iter().map(|e| (e, ' ')));
    tagged.extend(diff.false_positives.iter().map(|e| (e, '-')));
    tagged.extend(diff.false_negatives.iter().map(|e| (e, '+')));
    tagged.sort();

    for ((source, target), tag) in tagged.into_iter() {
        let graph = match (tag, weights_from) {
            ('-', _) => ours,
            ('+', _) => theirs,
            (_, WeightsFrom::Ours) => ours,
            (_, WeightsFrom::Theirs) => theirs
        };
        let edge_text = graph.node_index(source)
            .zip(graph.node_index(target))
            .and_then(|(s, t)| graph.edge_to_string(s, t))
            .unwrap_or_else(|| format!("{source} -> {target}"));
        lines.push(format!("{tag} {edge_text}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::overlap_graph::EdgeAttributes;
    use crate::read::Read;

    fn named_graph(names: &[&str], edges: &[(&str, &str, usize)]) -> OverlapGraph {
        let mut graph = OverlapGraph::new();
        for &name in names.iter() {
            graph.add_read(Read::new(name, 1000)).unwrap();
        }
        for &(s, t, w) in edges.iter() {
            graph.add_edge_by_name(s, t, EdgeAttributes::with_length(w)).unwrap();
        }
        graph
    }

    fn pair(s: &str, t: &str) -> (String, String) {
        (s.to_string(), t.to_string())
    }

    #[test]
    fn test_diff_counts() {
        let truth = named_graph(&["a", "b", "c", "d"], &[("a", "b", 500), ("b", "c", 500), ("c", "d", 500)]);
        // reversed c/d, missing b -> c, extra a -> c
        let ours = named_graph(&["a", "b", "c", "d"], &[("a", "b", 480), ("d", "c", 500), ("a", "c", 40)]);

        let diff = ours.diff(&truth);
        assert_eq!(diff.true_positives, vec![pair("a", "b")]);
        assert_eq!(diff.false_negatives, vec![pair("b", "c"), pair("c", "d")]);
        assert_eq!(diff.false_positives, vec![pair("a", "c"), pair("d", "c")]);
        assert_eq!(diff.reversed, vec![pair("c", "d")]);
        assert!((diff.precision() - 1.0 / 3.0).abs() < 1e-9);
        assert!((diff.recall() - 1.0 / 3.0).abs() < 1e-9);
        assert!(!diff.is_identical());
    }

    #[test]
    fn test_diff_text() {
        let truth = named_graph(&["a", "b", "c"], &[("a", "b", 500), ("b", "c", 500)]);
        let ours = named_graph(&["a", "b", "c"], &[("a", "b", 480), ("a", "c", 40)]);

        let text = ours.diff_text(&truth, false, WeightsFrom::Theirs);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("TP=1 FN=1 FP=1 reversed=0"));
        assert!(lines[1].starts_with("  "));
        assert!(lines[1].contains("len=    500"));
        assert!(lines[2].starts_with("- "));
        assert!(lines[2].contains("a -> c"));
        assert!(lines[3].starts_with("+ "));
        assert!(lines[3].contains("b -> c"));

        let text = ours.diff_text(&truth, false, WeightsFrom::Ours);
        assert!(text.lines().nth(1).unwrap().contains("len=    480"));

        let summary = ours.diff_text(&truth, true, WeightsFrom::Ours);
        assert_eq!(summary.lines().count(), 1);
    }

    #[test]
    fn test_identical() {
        let graph = named_graph(&["a", "b"], &[("a", "b", 500)]);
        let diff = graph.diff(&graph);
        assert!(diff.is_identical());
        assert_eq!(diff.precision(), 1.0);
        assert_eq!(diff.recall(), 1.0);
        assert_eq!(graph.diff_text(&graph, true, WeightsFrom::Ours), "TP=1 FN=0 FP=0 reversed=0 precision=1.000 recall=1.000");

        let empty = OverlapGraph::new();
        let diff = empty.diff(&empty);
        assert_eq!(diff.precision(), 1.0);
    }
}
