/*!
K-mer seed index used to nominate candidate overlapping read pairs without an all-pairs comparison.
Every k-mer over the `ACGT` alphabet is 2-bit packed into a `u64`; k-mers containing any other symbol are skipped.
K-mers that are too frequent across the read set are treated as repeats and ignored.
*/

use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashMap as HashMap;
use simple_error::bail;

use crate::read::SequenceStore;

/// A single k-mer occurrence
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct KmerHit {
    read: usize,
    position: usize
}

/// An exact match between two reads; consecutive k-mer hits on the same diagonal are merged.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Seed {
    /// Position in read A
    pub a_pos: usize,
    /// Position in read B
    pub b_pos: usize,
    /// Length of the exact match
    pub length: usize
}

impl Seed {
    /// The diagonal of the seed, i.e. the start of B in the coordinates of A
    pub fn shift(&self) -> i64 {
        self.a_pos as i64 - self.b_pos as i64
    }
}

/// A read pair worth aligning along with the estimated shift
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Index of read A, always less than `b`
    pub a: usize,
    /// Index of read B
    pub b: usize,
    /// Estimated start of B in the coordinates of A
    pub shift: i64,
    /// Number of merged seeds shared by the pair
    pub seed_count: usize,
    /// Total bases covered by the seeds near the estimated shift
    pub seed_coverage: usize,
    /// Coverage of the best shift window relative to the mean window coverage over every possible shift.
    /// Seeds from a true overlap pile up on one diagonal and give a large ratio, scattered seeds give a small one.
    pub shift_peak_ratio: f64
}

/// Returns the 2-bit code for a nucleotide, or None for anything else
fn encode_base(symbol: u8) -> Option<u64> {
    match symbol {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None
    }
}

/// Index from packed k-mers to their occurrences, with the per-pair seeds pre-computed.
#[derive(Debug)]
pub struct SeedIndex {
    /// The k-mer length
    wordlen: usize,
    /// The number of reads that were indexed
    num_reads: usize,
    /// Sequence length of every indexed read
    read_lengths: Vec<usize>,
    /// For each read pair `(a, b)` with `a < b`, the merged seeds sorted by position
    pair_seeds: HashMap<(usize, usize), Vec<Seed>>,
    /// Number of distinct k-mers dropped because they were repetitive
    repeat_kmers: usize
}

impl SeedIndex {
    /// Builds the index over every read in a store.
    /// # Arguments
    /// * `store` - the reads to index
    /// * `wordlen` - the k-mer length, must be in 1..=32
    /// * `max_kmer_occurrences` - k-mers occurring more often than this are ignored
    /// # Errors
    /// * if `wordlen` is out of range
    pub fn build<S: SequenceStore + ?Sized>(store: &S, wordlen: usize, max_kmer_occurrences: usize) -> Result<SeedIndex, Box<dyn std::error::Error>> {
        if wordlen == 0 || wordlen > 32 {
            bail!("Word length must be in 1..=32, got {wordlen}");
        }

        let mask: u64 = if wordlen == 32 { u64::MAX } else { (1 << (2 * wordlen)) - 1 };
        let mut kmer_hits: HashMap<u64, Vec<KmerHit>> = Default::default();
        for read in 0..store.len() {
            // rolling encoding; `valid` counts how many trailing symbols are in the alphabet
            let mut packed: u64 = 0;
            let mut valid: usize = 0;
            for (position, &symbol) in store.sequence(read).iter().enumerate() {
                match encode_base(symbol) {
                    Some(code) => {
                        packed = ((packed << 2) | code) & mask;
                        valid += 1;
                    },
                    None => {
                        packed = 0;
                        valid = 0;
                    }
                }
                if valid >= wordlen {
                    kmer_hits.entry(packed).or_default().push(KmerHit {
                        read,
                        position: position + 1 - wordlen
                    });
                }
            }
        }

        // collect raw hits per pair, ignoring repeats
        let mut repeat_kmers = 0;
        let mut raw_seeds: HashMap<(usize, usize), Vec<(usize, usize)>> = Default::default();
        for hits in kmer_hits.values() {
            if hits.len() > max_kmer_occurrences {
                repeat_kmers += 1;
                continue;
            }
            for (h1, h2) in hits.iter().tuple_combinations() {
                if h1.read == h2.read {
                    continue;
                }
                let (first, second) = if h1.read < h2.read { (h1, h2) } else { (h2, h1) };
                raw_seeds.entry((first.read, second.read)).or_default()
                    .push((first.position, second.position));
            }
        }

        let pair_seeds: HashMap<(usize, usize), Vec<Seed>> = raw_seeds.into_iter()
            .map(|(pair, hits)| (pair, merge_hits(hits, wordlen)))
            .collect();

        debug!(
            "Indexed {} reads: {} k-mers, {} repetitive, {} read pairs with seeds",
            store.len(), kmer_hits.len(), repeat_kmers, pair_seeds.len()
        );

        Ok(SeedIndex {
            wordlen,
            num_reads: store.len(),
            read_lengths: (0..store.len()).map(|r| store.sequence(r).len()).collect(),
            pair_seeds,
            repeat_kmers
        })
    }

    /// Returns the merged seeds shared by two reads, in the orientation of the arguments.
    /// # Arguments
    /// * `a` - the first read index
    /// * `b` - the second read index
    pub fn seeds(&self, a: usize, b: usize) -> Vec<Seed> {
        if a == b {
            return vec![];
        }
        let key = (a.min(b), a.max(b));
        let seeds = match self.pair_seeds.get(&key) {
            Some(s) => s,
            None => return vec![]
        };
        if a < b {
            seeds.clone()
        } else {
            seeds.iter()
                .map(|s| Seed { a_pos: s.b_pos, b_pos: s.a_pos, length: s.length })
                .sorted()
                .collect()
        }
    }

    /// Lazily produces every candidate pair in ascending `(a, b)` order.
    /// # Arguments
    /// * `min_seeds` - the minimum number of merged seeds for a pair to be nominated
    /// * `shift_window` - width of the rolling window used to find the mode of the shift distribution
    pub fn candidates(&self, min_seeds: usize, shift_window: usize) -> impl Iterator<Item = Candidate> + '_ {
        self.pair_seeds.keys()
            .copied()
            .sorted()
            .filter_map(move |(a, b)| {
                let seeds = &self.pair_seeds[&(a, b)];
                if seeds.len() < min_seeds.max(1) {
                    return None;
                }
                // B can start anywhere from -(|B| - 1) to |A| - 1
                let num_shifts = (self.read_lengths[a] + self.read_lengths[b]).saturating_sub(1);
                let (shift, seed_coverage, shift_peak_ratio) = estimate_shift(seeds, shift_window, num_shifts);
                Some(Candidate {
                    a,
                    b,
                    shift,
                    seed_count: seeds.len(),
                    seed_coverage,
                    shift_peak_ratio
                })
            })
    }

    // Getters
    pub fn wordlen(&self) -> usize {
        self.wordlen
    }

    pub fn num_reads(&self) -> usize {
        self.num_reads
    }

    pub fn num_pairs(&self) -> usize {
        self.pair_seeds.len()
    }

    pub fn repeat_kmers(&self) -> usize {
        self.repeat_kmers
    }
}

/// Merges k-mer hits that are consecutive on the same diagonal into longer seeds.
/// # Arguments
/// * `hits` - raw `(a_pos, b_pos)` k-mer hits for a single pair
/// * `wordlen` - the k-mer length
fn merge_hits(mut hits: Vec<(usize, usize)>, wordlen: usize) -> Vec<Seed> {
    // group by diagonal, then by position along the diagonal
    hits.sort_by_key(|&(a_pos, b_pos)| (a_pos as i64 - b_pos as i64, a_pos));
    hits.dedup();

    let mut seeds: Vec<Seed> = vec![];
    for (a_pos, b_pos) in hits.into_iter() {
        if let Some(last) = seeds.last_mut() {
            let same_diagonal = last.shift() == a_pos as i64 - b_pos as i64;
            if same_diagonal && a_pos <= last.a_pos + last.length {
                // overlapping or adjacent k-mer, extend the current seed
                last.length = last.length.max(a_pos + wordlen - last.a_pos);
                continue;
            }
        }
        seeds.push(Seed { a_pos, b_pos, length: wordlen });
    }
    seeds.sort();
    seeds
}

/// Finds the shift window with the most seed coverage.
/// Returns the median shift inside it, its coverage, and the ratio of that coverage to the mean window coverage.
/// Ties are resolved towards the smallest shift.
/// # Arguments
/// * `seeds` - the seeds for a pair, must be non-empty
/// * `shift_window` - the width of the rolling window
/// * `num_shifts` - the number of possible shifts for the pair
fn estimate_shift(seeds: &[Seed], shift_window: usize, num_shifts: usize) -> (i64, usize, f64) {
    let by_shift: Vec<(i64, usize)> = seeds.iter()
        .map(|s| (s.shift(), s.length))
        .sorted()
        .collect();

    // two pointers over the sorted shifts, window is [shift, shift + width)
    let width = shift_window.max(1) as i64;
    let mut best_coverage = 0;
    let mut best_range = (0, 0);
    let mut right = 0;
    let mut coverage = 0;
    for left in 0..by_shift.len() {
        while right < by_shift.len() && by_shift[right].0 < by_shift[left].0 + width {
            coverage += by_shift[right].1;
            right += 1;
        }
        if coverage > best_coverage {
            best_coverage = coverage;
            best_range = (left, right);
        }
        coverage -= by_shift[left].1;
    }

    let window = &by_shift[best_range.0..best_range.1];
    let median = window[(window.len() - 1) / 2].0;

    // mean rolling-window coverage if the same seeds were spread over every shift
    let total_coverage: usize = by_shift.iter().map(|&(_s, l)| l).sum();
    let num_shifts = num_shifts.max(1);
    let mean_coverage = total_coverage as f64 * width.min(num_shifts as i64) as f64 / num_shifts as f64;
    let peak_ratio = if mean_coverage > 0.0 { best_coverage as f64 / mean_coverage } else { 0.0 };
    (median, best_coverage, peak_ratio)
}
