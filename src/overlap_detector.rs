/*!
Seed-and-extend overlap detection.
Reads are ranked by name and indexed with a [`SeedIndex`].
Pairs whose seed shifts do not pile up on one diagonal are dropped, and every remaining pair is confirmed with a banded [`OverlapAligner`].
Accepted overlaps are oriented by the sign of the realized shift so that the edge goes from the read that starts first.

# Example usage
```rust
use olc_layout::example_gen::{generate_genome, tile_reads};
use olc_layout::olc_config::OverlapConfigBuilder;
use olc_layout::overlap_detector::OverlapDetector;

let genome = generate_genome(3000, 0);
let reads = tile_reads(&genome, 1000, 500, 0.0, 0);
let config = OverlapConfigBuilder::default()
    .min_overlap_length(300)
    .build()
    .unwrap();
let detector = OverlapDetector::with_config(config).unwrap();
let graph = detector.build_graph(&reads).unwrap();
assert_eq!(graph.node_count(), 5);
assert_eq!(graph.edge_count(), 4);
```
*/

use log::{debug, trace};
use rayon::prelude::*;
use rustc_hash::FxHashSet as HashSet;
use simple_error::bail;
use std::cmp::Ordering;

use crate::olc_config::OverlapConfig;
use crate::overlap_graph::{EdgeAttributes, OverlapGraph};
use crate::read::SequenceStore;
use crate::seed_index::{Candidate, SeedIndex};
use crate::sequence_alignment::{OverlapAligner, OverlapAlignment};

/// An accepted overlap between two reads of a store, already oriented
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedOverlap {
    /// Store index of the read that comes first
    pub source: usize,
    /// Store index of the read that comes second
    pub target: usize,
    /// The edge attributes derived from the alignment
    pub attributes: EdgeAttributes
}

/// Core utility that turns a read store into oriented overlap edges.
#[derive(Clone, Debug)]
pub struct OverlapDetector {
    /// The config for this detection run
    config: OverlapConfig,
    /// Aligner carrying the acceptance thresholds
    aligner: OverlapAligner
}

/// Maps the name-ranked indices used internally back to store indices
struct RankedReads {
    /// `order[rank]` is the store index of the read with that rank
    order: Vec<usize>
}

impl RankedReads {
    fn new<S: SequenceStore + ?Sized>(store: &S) -> RankedReads {
        let mut order: Vec<usize> = (0..store.len()).collect();
        order.sort_by(|&i, &j| store.read(i).name().cmp(store.read(j).name()).then(i.cmp(&j)));
        RankedReads { order }
    }
}

/// View of a store in name-ranked order, so seeding does not depend on the input order
struct RankedStore<'a, S: ?Sized> {
    store: &'a S,
    ranked: &'a RankedReads
}

impl<'a, S: SequenceStore + ?Sized> SequenceStore for RankedStore<'a, S> {
    fn len(&self) -> usize {
        self.store.len()
    }

    fn read(&self, index: usize) -> &crate::read::Read {
        self.store.read(self.ranked.order[index])
    }

    fn sequence(&self, index: usize) -> &[u8] {
        self.store.sequence(self.ranked.order[index])
    }
}

impl OverlapDetector {
    /// Creates a new detector and performs sanity checks on the config.
    /// # Arguments
    /// * `config` - the detection settings
    /// # Errors
    /// * if the band radius is 0, the minimum overlap length is 0, or the word length is out of range
    pub fn with_config(config: OverlapConfig) -> Result<OverlapDetector, Box<dyn std::error::Error>> {
        if config.band_radius == 0 {
            bail!("Band radius must be greater than 0");
        }
        if config.min_overlap_length == 0 {
            bail!("Minimum overlap length must be greater than 0");
        }
        if config.wordlen == 0 || config.wordlen > 32 {
            bail!("Word length must be in 1..=32, got {}", config.wordlen);
        }
        let aligner = OverlapAligner::with_config(&config);
        Ok(OverlapDetector {
            config,
            aligner
        })
    }

    /// Runs detection on a single thread and returns the accepted overlaps, sorted by source and target name.
    /// # Arguments
    /// * `store` - the reads to compare
    /// # Errors
    /// * if indexing or alignment receives invalid input
    pub fn detect<S: SequenceStore + ?Sized>(&self, store: &S) -> Result<Vec<DetectedOverlap>, Box<dyn std::error::Error>> {
        let ranked = RankedReads::new(store);
        let ranked_store = RankedStore { store, ranked: &ranked };
        let index = SeedIndex::build(&ranked_store, self.config.wordlen, self.config.max_kmer_occurrences)?;

        let mut evaluated: Vec<(Candidate, Option<OverlapAlignment>)> = vec![];
        for candidate in self.nominate(&ranked_store, &index) {
            let alignment = self.evaluate(&ranked_store, &candidate)?;
            evaluated.push((candidate, alignment));
        }
        self.collect_overlaps(&ranked_store, &ranked, evaluated)
    }

    /// Same as [`OverlapDetector::detect`], but aligns the candidate pairs on the rayon thread pool.
    /// The accepted set is identical to the single-threaded version.
    /// # Errors
    /// * if indexing or alignment receives invalid input
    pub fn detect_parallel<S: SequenceStore + Sync + ?Sized>(&self, store: &S) -> Result<Vec<DetectedOverlap>, Box<dyn std::error::Error>> {
        let ranked = RankedReads::new(store);
        let ranked_store = RankedStore { store, ranked: &ranked };
        let index = SeedIndex::build(&ranked_store, self.config.wordlen, self.config.max_kmer_occurrences)?;

        let candidates: Vec<Candidate> = self.nominate(&ranked_store, &index).collect();
        // boxed errors are not Send, so carry the message across threads
        let evaluated: Vec<(Candidate, Option<OverlapAlignment>)> = candidates.into_par_iter()
            .map(|candidate| {
                self.evaluate(&ranked_store, &candidate)
                    .map(|alignment| (candidate, alignment))
                    .map_err(|e| e.to_string())
            })
            .collect::<Result<Vec<_>, String>>()?;
        self.collect_overlaps(&ranked_store, &ranked, evaluated)
    }

    /// Runs detection and inserts every read and accepted overlap into a new graph.
    /// Reads are added in name order, so node indices are stable across input orders.
    /// # Errors
    /// * if detection fails or the graph rejects an edge
    pub fn build_graph<S: SequenceStore + ?Sized>(&self, store: &S) -> Result<OverlapGraph, Box<dyn std::error::Error>> {
        let overlaps = self.detect(store)?;
        overlaps_to_graph(store, &overlaps)
    }

    /// Candidate pairs from the index that pass the shift peak check, in ascending pair order.
    fn nominate<'a, S: SequenceStore + ?Sized>(&'a self, store: &'a S, index: &'a SeedIndex) -> impl Iterator<Item = Candidate> + 'a {
        index.candidates(self.config.min_seeds, self.config.shift_window)
            .filter(move |candidate| {
                let passed = candidate.shift_peak_ratio >= self.config.min_shift_peak_ratio;
                if !passed {
                    trace!(
                        "{} vs {}: seed shifts are scattered (peak ratio {:.2}), skipping alignment",
                        store.read(candidate.a).name(), store.read(candidate.b).name(), candidate.shift_peak_ratio
                    );
                }
                passed
            })
    }

    /// Aligns a single candidate; `Ok(None)` means no overlap was found.
    fn evaluate<S: SequenceStore + ?Sized>(&self, store: &S, candidate: &Candidate) -> Result<Option<OverlapAlignment>, Box<dyn std::error::Error>> {
        let alignment = self.aligner.align(
            store.sequence(candidate.a),
            store.sequence(candidate.b),
            candidate.shift
        )?;
        trace!(
            "{} vs {} (shift {}, {} seeds): {}",
            store.read(candidate.a).name(), store.read(candidate.b).name(),
            candidate.shift, candidate.seed_count,
            if alignment.is_some() { "+" } else { "-" }
        );
        Ok(alignment)
    }

    /// Orients the alignments that passed, applies the margin check, and rejects pairs already confirmed in the other direction.
    /// `evaluated` must be in candidate order, which makes the result independent of how the alignments were computed.
    /// The seed index yields each unordered pair once, so a conflicting direction only shows up if `evaluated` repeats a pair.
    fn collect_overlaps<S: SequenceStore + ?Sized>(&self, store: &RankedStore<S>, ranked: &RankedReads, evaluated: Vec<(Candidate, Option<OverlapAlignment>)>) -> Result<Vec<DetectedOverlap>, Box<dyn std::error::Error>> {
        let num_candidates = evaluated.len();
        let mut no_overlap: usize = 0;
        let mut unreliable: usize = 0;
        let mut ambiguous: usize = 0;
        let mut conflicting: usize = 0;
        let mut confirmed: HashSet<(usize, usize)> = Default::default();
        let mut ret: Vec<(usize, usize, DetectedOverlap)> = vec![];

        for (candidate, opt_alignment) in evaluated.into_iter() {
            let alignment = match opt_alignment {
                Some(aln) => aln,
                None => {
                    no_overlap += 1;
                    continue;
                }
            };

            let a_len = store.sequence(candidate.a).len();
            let b_len = store.sequence(candidate.b).len();
            if !self.has_reliable_margins(&alignment, a_len, b_len) {
                unreliable += 1;
                continue;
            }

            let a_first = match orient(&alignment, a_len, b_len) {
                Some(a_first) => a_first,
                None => {
                    ambiguous += 1;
                    continue;
                }
            };
            let (source, target) = if a_first { (candidate.a, candidate.b) } else { (candidate.b, candidate.a) };
            if source == target {
                continue;
            }
            if confirmed.contains(&(target, source)) {
                conflicting += 1;
                continue;
            }
            if !confirmed.insert((source, target)) {
                continue;
            }

            let shift = if a_first { alignment.realized_shift() } else { -alignment.realized_shift() };
            let attributes = EdgeAttributes::new(
                alignment.overlap_length(),
                shift,
                alignment.score(),
                alignment.identity(),
                true
            );
            ret.push((source, target, DetectedOverlap {
                source: ranked.order[source],
                target: ranked.order[target],
                attributes
            }));
        }

        // ranks follow name order, so sorting by rank sorts by name
        ret.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        debug!(
            "Evaluated {num_candidates} candidate pairs: {} overlaps, {no_overlap} without overlap, {unreliable} with unreliable margins, {ambiguous} without direction, {conflicting} conflicting",
            ret.len()
        );
        Ok(ret.into_iter().map(|(_s, _t, overlap)| overlap).collect())
    }

    /// Returns true if both the start and end margins are wide enough to trust the direction
    fn has_reliable_margins(&self, alignment: &OverlapAlignment, a_len: usize, b_len: usize) -> bool {
        if self.config.min_margin == 0 {
            return true;
        }
        let left_margin = alignment.realized_shift().unsigned_abs() as usize;
        let b_end_in_a = alignment.realized_shift() + b_len as i64;
        let right_margin = (a_len as i64 - b_end_in_a).unsigned_abs() as usize;
        left_margin >= self.config.min_margin && right_margin >= self.config.min_margin
    }

    pub fn config(&self) -> &OverlapConfig {
        &self.config
    }
}

/// Returns true if the edge should go from read A to read B, or None if there is no direction.
/// A positive realized shift means B starts downstream of A.
/// For a zero shift the shorter read comes first; equal lengths at a zero shift have no direction.
fn orient(alignment: &OverlapAlignment, a_len: usize, b_len: usize) -> Option<bool> {
    match alignment.realized_shift().cmp(&0) {
        Ordering::Greater => Some(true),
        Ordering::Less => Some(false),
        Ordering::Equal => match a_len.cmp(&b_len) {
            Ordering::Less => Some(true),
            Ordering::Greater => Some(false),
            Ordering::Equal => None
        }
    }
}

/// Builds a graph from a store and a set of detected overlaps; reads are added in name order.
/// # Errors
/// * if the graph rejects any of the overlaps
pub fn overlaps_to_graph<S: SequenceStore + ?Sized>(store: &S, overlaps: &[DetectedOverlap]) -> Result<OverlapGraph, Box<dyn std::error::Error>> {
    let ranked = RankedReads::new(store);
    let mut graph = OverlapGraph::new();
    let mut node_of = vec![usize::MAX; store.len()];
    for &store_index in ranked.order.iter() {
        node_of[store_index] = graph.add_read(store.read(store_index).clone())?;
    }
    for overlap in overlaps.iter() {
        graph.add_edge(node_of[overlap.source], node_of[overlap.target], overlap.attributes.clone())?;
    }
    Ok(graph)
}
