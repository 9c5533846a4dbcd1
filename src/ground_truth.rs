use std::cmp::Ordering;

use crate::error::{OlcError, OlcResult};
use crate::overlap_graph::{EdgeAttributes, OverlapGraph};
use crate::read::Read;

/// Builds the ground truth overlap graph from reads with known positions.
/// Reads are added in name order. Every pair whose intervals overlap by at least `min_overlap` bases gets one edge:
/// from the earlier start, from the shorter read when the starts are equal, and no edge at all for identical intervals.
/// # Arguments
/// * `reads` - reads with a known start position
/// * `min_overlap` - shortest overlap that is recorded as an edge
/// # Errors
/// * `MissingPosition` if any read has no start position
/// * `DuplicateRead` if two different reads share a name
/// # Example
/// ```rust
/// use olc_layout::ground_truth::ground_truth_graph;
/// use olc_layout::read::{Read, Strand};
///
/// let reads = vec![
///     Read::with_position("r0", 1000, 0, Strand::Forward),
///     Read::with_position("r1", 1000, 600, Strand::Forward),
///     Read::with_position("r2", 1000, 1200, Strand::Forward),
/// ];
/// let graph = ground_truth_graph(&reads, 100).unwrap();
/// assert_eq!(graph.edge_count(), 2);
/// assert_eq!(graph.layout().unwrap().total_weight(), 800);
/// ```
pub fn ground_truth_graph(reads: &[Read], min_overlap: usize) -> OlcResult<OverlapGraph> {
    let mut positioned: Vec<(&Read, usize)> = Vec::with_capacity(reads.len());
    for read in reads.iter() {
        let start = read.start().ok_or_else(|| OlcError::MissingPosition(read.name().to_string()))?;
        positioned.push((read, start));
    }
    positioned.sort_by(|a, b| a.0.name().cmp(b.0.name()));

    let mut graph = OverlapGraph::new();
    let mut nodes = Vec::with_capacity(positioned.len());
    for &(read, _start) in positioned.iter() {
        nodes.push(graph.add_read(read.clone())?);
    }

    // sweep in start order so only reads that can still overlap are compared
    let mut by_start: Vec<usize> = (0..positioned.len()).collect();
    by_start.sort_by_key(|&i| (positioned[i].1, positioned[i].0.length(), i));
    for (offset, &i) in by_start.iter().enumerate() {
        let (read_i, start_i) = positioned[i];
        let end_i = start_i + read_i.length();
        for &j in by_start[(offset + 1)..].iter() {
            let (read_j, start_j) = positioned[j];
            if start_j >= end_i {
                break;
            }
            let end_j = start_j + read_j.length();
            let overlap = end_i.min(end_j) - start_j;
            if overlap < min_overlap.max(1) {
                continue;
            }

            let (source, target) = match start_i.cmp(&start_j) {
                Ordering::Less => (i, j),
                Ordering::Equal => match read_i.length().cmp(&read_j.length()) {
                    Ordering::Less => (i, j),
                    Ordering::Greater => (j, i),
                    // identical intervals give no direction
                    Ordering::Equal => continue
                },
                Ordering::Greater => (j, i)
            };
            let (source_read, source_start) = positioned[source];
            let (target_read, target_start) = positioned[target];
            let attributes = EdgeAttributes::new(
                overlap,
                target_start as i64 - source_start as i64,
                overlap as f64,
                1.0,
                source_read.strand() == target_read.strand()
            );
            graph.add_edge(nodes[source], nodes[target], attributes)?;
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::read::Strand;

    #[test]
    fn test_chain() {
        let reads = vec![
            Read::with_position("c", 1000, 1200, Strand::Forward),
            Read::with_position("a", 1000, 0, Strand::Forward),
            Read::with_position("b", 1000, 600, Strand::Reverse),
        ];
        let graph = ground_truth_graph(&reads, 100).unwrap();
        assert_eq!(graph.node_count(), 3);
        // name order
        assert_eq!(graph.read(0).name(), "a");

        let a_b = graph.edge(0, 1).unwrap();
        assert_eq!(a_b.overlap_length(), 400);
        assert_eq!(a_b.shift(), 600);
        assert!(!a_b.strand_consistent());
        assert_eq!(graph.edge(1, 2).unwrap().overlap_length(), 400);
        assert!(!graph.has_edge(0, 2));
        assert_eq!(graph.layout().unwrap().names(&graph), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_min_overlap_and_touching() {
        let reads = vec![
            Read::with_position("a", 100, 0, Strand::Forward),
            Read::with_position("b", 100, 100, Strand::Forward),
            Read::with_position("c", 100, 150, Strand::Forward),
        ];
        // a and b only touch, b and c overlap by 50
        let graph = ground_truth_graph(&reads, 0).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge(1, 2));

        let graph = ground_truth_graph(&reads, 60).unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_equal_starts() {
        let reads = vec![
            Read::with_position("long", 200, 10, Strand::Forward),
            Read::with_position("short", 100, 10, Strand::Forward),
            Read::with_position("twin", 200, 10, Strand::Forward),
        ];
        let graph = ground_truth_graph(&reads, 1).unwrap();
        let long = graph.node_index("long").unwrap();
        let short = graph.node_index("short").unwrap();
        let twin = graph.node_index("twin").unwrap();
        assert!(graph.has_edge(short, long));
        assert!(graph.has_edge(short, twin));
        // identical intervals
        assert!(!graph.has_edge(long, twin));
        assert!(!graph.has_edge(twin, long));
        assert_eq!(graph.edge(short, long).unwrap().overlap_length(), 100);
    }

    #[test]
    fn test_contained() {
        let reads = vec![
            Read::with_position("outer", 1000, 0, Strand::Forward),
            Read::with_position("inner", 200, 300, Strand::Forward),
        ];
        let graph = ground_truth_graph(&reads, 1).unwrap();
        let edge = graph.edge(graph.node_index("outer").unwrap(), graph.node_index("inner").unwrap()).unwrap();
        assert_eq!(edge.overlap_length(), 200);
        assert_eq!(edge.shift(), 300);
    }

    #[test]
    fn test_missing_position() {
        let reads = vec![
            Read::with_position("a", 100, 0, Strand::Forward),
            Read::new("b", 100),
        ];
        assert_eq!(ground_truth_graph(&reads, 1).unwrap_err(), OlcError::MissingPosition("b".to_string()));
    }
}
