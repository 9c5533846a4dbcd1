/*!
Banded pair-wise overlap alignment.
Conceptually, if this is a 2D grid, sequence `a` goes from top to bottom (rows, `i`) and sequence `b` goes from left to right (columns, `j`).
A diagonal is identified by `i - j`; the estimated `shift` is the diagonal where `b` starts inside `a`.
Only cells with `|(i - j) - shift| <= band_radius` are computed.

An overlap alignment may start anywhere on the first row or column (free leading gaps) and end anywhere on the last row or column (free trailing gaps).
This captures both suffix-prefix overlaps and containment.

# Example usage
```rust
use olc_layout::olc_config::ScoringScheme;
use olc_layout::sequence_alignment::banded_overlap_alignment;

let a = b"TTTTACGTACGGA";
let b =     b"ACGTACGGACCC";
let alignment = banded_overlap_alignment(a, b, 4, 2, &ScoringScheme::default())
    .unwrap()
    .unwrap();
assert_eq!(alignment.realized_shift(), 4);
assert_eq!(alignment.overlap_length(), 9);
assert_eq!(alignment.identity(), 1.0);
```
*/

use log::trace;
use simple_error::bail;

use crate::olc_config::{OverlapConfig, ScoringScheme};

/// Contains the result of a banded overlap alignment
#[derive(Clone, Debug, PartialEq)]
pub struct OverlapAlignment {
    /// The alignment score
    score: f64,
    /// First aligned position in `a`
    a_start: usize,
    /// One past the last aligned position in `a`
    a_end: usize,
    /// First aligned position in `b`
    b_start: usize,
    /// One past the last aligned position in `b`
    b_end: usize,
    /// Number of identical aligned columns
    matches: usize,
    /// Number of aligned columns, including gaps
    columns: usize
}

impl OverlapAlignment {
    /// Length of the overlap, which is the shorter of the two aligned spans
    pub fn overlap_length(&self) -> usize {
        (self.a_end - self.a_start).min(self.b_end - self.b_start)
    }

    /// Fraction of aligned columns that are matches
    pub fn identity(&self) -> f64 {
        if self.columns == 0 {
            0.0
        } else {
            self.matches as f64 / self.columns as f64
        }
    }

    /// The start of `b` in the coordinates of `a`; one of the two starts is always 0
    pub fn realized_shift(&self) -> i64 {
        self.a_start as i64 - self.b_start as i64
    }

    // Getters
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn a_start(&self) -> usize {
        self.a_start
    }

    pub fn a_end(&self) -> usize {
        self.a_end
    }

    pub fn b_start(&self) -> usize {
        self.b_start
    }

    pub fn b_end(&self) -> usize {
        self.b_end
    }

    pub fn matches(&self) -> usize {
        self.matches
    }

    pub fn columns(&self) -> usize {
        self.columns
    }
}

/// A single DP state; the start and the counters travel with the score so no traceback matrix is needed
#[derive(Clone, Copy, Debug)]
struct Cell {
    score: f64,
    start_i: usize,
    start_j: usize,
    matches: usize,
    columns: usize
}

impl Cell {
    const EMPTY: Cell = Cell {
        score: f64::NEG_INFINITY,
        start_i: 0,
        start_j: 0,
        matches: 0,
        columns: 0
    };

    fn origin(i: usize, j: usize) -> Cell {
        Cell {
            score: 0.0,
            start_i: i,
            start_j: j,
            matches: 0,
            columns: 0
        }
    }

    fn is_reachable(&self) -> bool {
        self.score > f64::NEG_INFINITY
    }

    /// Extends this cell by one column
    fn step(&self, delta: f64, is_match: bool) -> Cell {
        Cell {
            score: self.score + delta,
            matches: self.matches + usize::from(is_match),
            columns: self.columns + 1,
            ..*self
        }
    }
}

/// Returns the better of two cells, keeping `first` on ties
fn prefer(first: Cell, second: Cell) -> Cell {
    if second.score > first.score {
        second
    } else {
        first
    }
}

/// One band row for the three affine states: `h` is the best overall, `e` ends in a gap in `b`, `f` ends in a gap in `a`
#[derive(Clone, Debug)]
struct BandRow {
    h: Vec<Cell>,
    e: Vec<Cell>,
    f: Vec<Cell>
}

impl BandRow {
    fn new(width: usize) -> BandRow {
        BandRow {
            h: vec![Cell::EMPTY; width],
            e: vec![Cell::EMPTY; width],
            f: vec![Cell::EMPTY; width]
        }
    }

    fn clear(&mut self) {
        self.h.fill(Cell::EMPTY);
        self.e.fill(Cell::EMPTY);
        self.f.fill(Cell::EMPTY);
    }
}

/// Computes the best banded overlap alignment between `a` and `b` around the diagonal `shift`.
/// Returns `Ok(None)` if no band cell connects a start boundary to an end boundary.
/// # Arguments
/// * `a` - the first sequence, rows of the grid
/// * `b` - the second sequence, columns of the grid
/// * `shift` - the estimated start of `b` in the coordinates of `a`, may be negative
/// * `band_radius` - number of diagonals on either side of `shift` to explore
/// * `scoring` - the scoring scheme
/// # Errors
/// * if `band_radius` is 0 or either sequence is empty
pub fn banded_overlap_alignment(a: &[u8], b: &[u8], shift: i64, band_radius: usize, scoring: &ScoringScheme) -> Result<Option<OverlapAlignment>, Box<dyn std::error::Error>> {
    if band_radius == 0 {
        bail!("Band radius must be greater than 0");
    }
    if a.is_empty() || b.is_empty() {
        bail!("Cannot align empty sequences");
    }

    let n = a.len() as i64;
    let m = b.len() as i64;
    let radius = band_radius as i64;
    let width = 2 * band_radius + 1;

    // rows that intersect the band at all
    let first_row = (shift - radius).max(0);
    let last_row = (m + shift + radius).min(n);
    if first_row > last_row {
        return Ok(None);
    }

    let gap_first = scoring.gap_open + scoring.gap_extend;
    let mut previous = BandRow::new(width);
    let mut current = BandRow::new(width);
    let mut best_end: Option<Cell> = None;
    let mut best_end_pos = (0, 0);

    for i in first_row..=last_row {
        current.clear();

        // the left-most column in the band for this row
        let band_left = i - shift - radius;
        let j_lo = band_left.max(0);
        let j_hi = (i - shift + radius).min(m);

        for j in j_lo..=j_hi {
            let k = (j - band_left) as usize;
            let (iu, ju) = (i as usize, j as usize);

            if i == 0 || j == 0 {
                // free leading gaps, the alignment may start here
                current.h[k] = Cell::origin(iu, ju);
                continue;
            }

            let (sa, sb) = (a[iu - 1], b[ju - 1]);
            let is_match = scoring.is_match(sa, sb);

            // diagonal move, (i-1, j-1) sits at the same band index in the previous row
            let diagonal = if previous.h[k].is_reachable() {
                previous.h[k].step(scoring.substitution(sa, sb), is_match)
            } else {
                Cell::EMPTY
            };

            // vertical move consumes a[i-1]; (i-1, j) is one band index to the right in the previous row
            let e_cell = if k + 1 < width {
                let open = previous.h[k + 1];
                let extend = previous.e[k + 1];
                let from_open = if open.is_reachable() { open.step(gap_first, false) } else { Cell::EMPTY };
                let from_extend = if extend.is_reachable() { extend.step(scoring.gap_extend, false) } else { Cell::EMPTY };
                prefer(from_open, from_extend)
            } else {
                Cell::EMPTY
            };

            // horizontal move consumes b[j-1]; (i, j-1) is one band index to the left in this row
            let f_cell = if k > 0 {
                let open = current.h[k - 1];
                let extend = current.f[k - 1];
                let from_open = if open.is_reachable() { open.step(gap_first, false) } else { Cell::EMPTY };
                let from_extend = if extend.is_reachable() { extend.step(scoring.gap_extend, false) } else { Cell::EMPTY };
                prefer(from_open, from_extend)
            } else {
                Cell::EMPTY
            };

            current.e[k] = e_cell;
            current.f[k] = f_cell;
            // ties prefer the diagonal, then the gap in `b`, then the gap in `a`
            current.h[k] = prefer(prefer(diagonal, e_cell), f_cell);
        }

        // the last row is scanned by column first, then the last column by row
        if i == n {
            for j in j_lo..=j_hi {
                let cell = current.h[(j - band_left) as usize];
                if cell.is_reachable() && cell.columns > 0 && best_end.map_or(true, |b| cell.score > b.score) {
                    best_end = Some(cell);
                    best_end_pos = (i as usize, j as usize);
                }
            }
        }
        if j_lo <= m && m <= j_hi && i < n {
            let cell = current.h[(m - band_left) as usize];
            if cell.is_reachable() && cell.columns > 0 && best_end.map_or(true, |b| cell.score > b.score) {
                best_end = Some(cell);
                best_end_pos = (i as usize, m as usize);
            }
        }

        std::mem::swap(&mut previous, &mut current);
    }

    let Some(end) = best_end else {
        trace!("No band cell reaches an end boundary for shift {shift}");
        return Ok(None);
    };

    let alignment = OverlapAlignment {
        score: end.score,
        a_start: end.start_i,
        a_end: best_end_pos.0,
        b_start: end.start_j,
        b_end: best_end_pos.1,
        matches: end.matches,
        columns: end.columns
    };
    trace!("Banded alignment for shift {shift}: {alignment:?}");
    Ok(Some(alignment))
}

/// Wraps the banded alignment with the acceptance thresholds from an [`OverlapConfig`].
#[derive(Clone, Debug)]
pub struct OverlapAligner {
    /// The scoring scheme
    scoring: ScoringScheme,
    /// Band radius around the estimated shift
    band_radius: usize,
    /// Minimum accepted overlap length
    min_overlap_length: usize,
    /// Minimum accepted alignment score
    min_overlap_score: f64,
    /// Minimum accepted identity
    min_identity: f64
}

impl OverlapAligner {
    /// Creates a new aligner from the relevant overlap settings
    pub fn with_config(config: &OverlapConfig) -> OverlapAligner {
        OverlapAligner {
            scoring: config.scoring,
            band_radius: config.band_radius,
            min_overlap_length: config.min_overlap_length,
            min_overlap_score: config.min_overlap_score,
            min_identity: config.min_identity
        }
    }

    /// Aligns the pair and returns the alignment only if it passes every threshold.
    /// `Ok(None)` means no overlap was found, which is the common outcome when scanning candidates.
    /// # Errors
    /// * if the inputs are invalid, see [`banded_overlap_alignment`]
    pub fn align(&self, a: &[u8], b: &[u8], shift: i64) -> Result<Option<OverlapAlignment>, Box<dyn std::error::Error>> {
        let alignment = match banded_overlap_alignment(a, b, shift, self.band_radius, &self.scoring)? {
            Some(aln) => aln,
            None => return Ok(None)
        };

        if alignment.score() < self.min_overlap_score ||
            alignment.overlap_length() < self.min_overlap_length ||
            alignment.identity() < self.min_identity {
            trace!(
                "Rejected overlap: score={}, length={}, identity={:.3}",
                alignment.score(), alignment.overlap_length(), alignment.identity()
            );
            Ok(None)
        } else {
            Ok(Some(alignment))
        }
    }

    pub fn band_radius(&self) -> usize {
        self.band_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};

    use crate::olc_config::OverlapConfigBuilder;

    fn random_sequence(rng: &mut rand::rngs::StdRng, length: usize) -> Vec<u8> {
        (0..length).map(|_i| b"ACGT"[rng.gen_range(0..4)]).collect()
    }

    #[test]
    fn test_exact_suffix_prefix() {
        let a = b"GGGGACGTACGT";
        let b = b"ACGTACGTCCCC";
        let aln = banded_overlap_alignment(a, b, 4, 3, &ScoringScheme::default()).unwrap().unwrap();
        assert_eq!(aln.a_start(), 4);
        assert_eq!(aln.a_end(), 12);
        assert_eq!(aln.b_start(), 0);
        assert_eq!(aln.b_end(), 8);
        assert_eq!(aln.score(), 8.0);
        assert_eq!(aln.overlap_length(), 8);
        assert_eq!(aln.realized_shift(), 4);
    }

    #[test]
    fn test_negative_shift() {
        // `b` starts before `a`, so the overlap is a suffix of `b` and a prefix of `a`
        let a = b"ACGTACGTCCCC";
        let b = b"GGGGACGTACGT";
        let aln = banded_overlap_alignment(a, b, -4, 3, &ScoringScheme::default()).unwrap().unwrap();
        assert_eq!(aln.a_start(), 0);
        assert_eq!(aln.b_start(), 4);
        assert_eq!(aln.realized_shift(), -4);
        assert_eq!(aln.overlap_length(), 8);
    }

    #[test]
    fn test_containment() {
        let a = b"TTTTTACGTTGCAGGGGG";
        let b = b"ACGTTGCA";
        let aln = banded_overlap_alignment(a, b, 5, 2, &ScoringScheme::default()).unwrap().unwrap();
        assert_eq!(aln.a_start(), 5);
        assert_eq!(aln.a_end(), 13);
        assert_eq!((aln.b_start(), aln.b_end()), (0, 8));
        assert_eq!(aln.identity(), 1.0);
    }

    #[test]
    fn test_single_mismatch_and_indel() {
        let a = b"TTTTTTACGTACGTACGTACG";
        let b =       b"ACGTACCTACGTACGGGGG";
        let aln = banded_overlap_alignment(a, b, 6, 3, &ScoringScheme::default()).unwrap().unwrap();
        assert_eq!(aln.matches(), 14);
        assert_eq!(aln.columns(), 15);
        assert_eq!(aln.score(), 13.0);

        // deletion of one base in `b`
        let b =       b"ACGTACTACGTACGGGGG";
        let aln = banded_overlap_alignment(a, b, 6, 3, &ScoringScheme::default()).unwrap().unwrap();
        assert_eq!(aln.matches(), 14);
        assert_eq!(aln.columns(), 15);
        assert_eq!(aln.score(), 14.0 - 3.0);
    }

    #[test]
    fn test_band_outside_grid() {
        let a = b"ACGT";
        let b = b"ACGT";
        assert_eq!(banded_overlap_alignment(a, b, 100, 5, &ScoringScheme::default()).unwrap(), None);
    }

    #[test]
    fn test_invalid_inputs() {
        let scoring = ScoringScheme::default();
        assert!(banded_overlap_alignment(b"ACGT", b"ACGT", 0, 0, &scoring).is_err());
        assert!(banded_overlap_alignment(b"", b"ACGT", 0, 5, &scoring).is_err());
        assert!(banded_overlap_alignment(b"ACGT", b"", 0, 5, &scoring).is_err());
    }

    #[test]
    fn test_shared_region_500() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let shared = random_sequence(&mut rng, 500);
        let mut a = random_sequence(&mut rng, 300);
        a.extend_from_slice(&shared);
        let mut b = shared.clone();
        b.extend(random_sequence(&mut rng, 300));

        let config = OverlapConfigBuilder::default()
            .min_overlap_length(400)
            .band_radius(20)
            .build().unwrap();
        let aligner = OverlapAligner::with_config(&config);
        let aln = aligner.align(&a, &b, 300).unwrap().unwrap();
        assert!(aln.overlap_length() >= 500);
        assert_eq!(aln.realized_shift(), 300);
        assert_eq!(aln.score(), 500.0);

        // now two unrelated sequences of the same lengths
        let c = random_sequence(&mut rng, 800);
        let d = random_sequence(&mut rng, 800);
        assert_eq!(aligner.align(&c, &d, 300).unwrap(), None);
    }

    #[test]
    fn test_longer_overlaps_score_higher() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let genome = random_sequence(&mut rng, 1000);
        let a = &genome[0..600];
        let short_b = &genome[500..1000];
        let long_b = &genome[300..800];
        let scoring = ScoringScheme::default();
        let short_aln = banded_overlap_alignment(a, short_b, 500, 10, &scoring).unwrap().unwrap();
        let long_aln = banded_overlap_alignment(a, long_b, 300, 10, &scoring).unwrap().unwrap();
        assert_eq!(short_aln.overlap_length(), 100);
        assert_eq!(long_aln.overlap_length(), 300);
        assert!(long_aln.score() > short_aln.score());
    }

    #[test]
    fn test_wildcards() {
        let a = b"CCCCACGTNCGT";
        let b = b"ACGTACNTGG";
        let scoring = ScoringScheme { wildcard: Some(b'N'), ..Default::default() };
        let aln = banded_overlap_alignment(a, b, 4, 2, &scoring).unwrap().unwrap();
        assert_eq!(aln.identity(), 1.0);
        assert_eq!(aln.overlap_length(), 8);
    }
}
