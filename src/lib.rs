/*!
# olc_layout
This library provides the overlap-graph engine of an overlap-layout-consensus assembler.
It finds overlaps between whole reads, orders the reads along the longest path of the overlap graph, and compares graphs against a known truth.

Key benefits:
* Seed-and-extend overlap detection with a banded affine-gap aligner, optionally across threads
* Two cycle breaking strategies: an exact minimum-weight feedback arc set for small tangles, and a fast weighted heuristic
* Deterministic results that do not depend on read input order

Performance notes:
* The exact cycle breaker enumerates cycles, so it is bounded by its config and will report an error instead of running away
* Highly repetitive k-mers are ignored during seeding, see `max_kmer_occurrences`

# Example usage
```rust
use olc_layout::cycle_breaker::CycleBreaker;
use olc_layout::example_gen::{generate_genome, tile_reads};
use olc_layout::ground_truth::ground_truth_graph;
use olc_layout::olc_config::OverlapConfigBuilder;
use olc_layout::overlap_detector::OverlapDetector;

// simulated reads with known positions
let genome = generate_genome(5000, 0);
let reads = tile_reads(&genome, 1000, 700, 0.0, 0);

// detect overlaps and lay out the reads
let config = OverlapConfigBuilder::default()
    .min_overlap_length(200)
    .build()
    .unwrap();
let detector = OverlapDetector::with_config(config).unwrap();
let mut graph = detector.build_graph(&reads).unwrap();
graph.break_cycles(&CycleBreaker::Heuristic).unwrap();
let layout = graph.layout().unwrap();
assert_eq!(layout.path().len(), reads.reads().len());

// compare against the truth
let truth = ground_truth_graph(reads.reads(), 200).unwrap();
let diff = graph.diff(&truth);
assert!(diff.is_identical());
```
*/

/// Banded pairwise overlap alignment
pub mod sequence_alignment;
/// Exact and heuristic feedback arc set strategies
pub mod cycle_breaker;
/// 0-1 covering problems and a branch and bound solver
pub mod cover_solver;
/// Graph-level error types
pub mod error;
/// Utility for generating examples
pub mod example_gen;
/// Structural comparison between two overlap graphs
pub mod graph_diff;
/// Longest path layouts over an acyclic overlap graph
pub mod graph_layout;
/// Builds the overlap graph implied by known read positions
pub mod ground_truth;
/// Configuration for overlap detection and cycle breaking
pub mod olc_config;
/// Finds and orients overlaps between reads
pub mod overlap_detector;
/// Main functionality for the overlap graph
pub mod overlap_graph;
/// Reads and read stores
pub mod read;
/// K-mer seeding and candidate pair nomination
pub mod seed_index;
