/*!
Contains configuration information for overlap detection and cycle breaking.
Typical usage is to the use the builder to construct the config, e.g.
```
use olc_layout::olc_config::{OverlapConfig, OverlapConfigBuilder};
let config: OverlapConfig = OverlapConfigBuilder::default()
    .min_overlap_length(500)
    .wordlen(15)
    .build()
    .unwrap();
assert_eq!(config.band_radius, 20);
```
The minimum overlap length has no default, so it must always be provided:
```
use olc_layout::olc_config::OverlapConfigBuilder;
assert!(OverlapConfigBuilder::default().build().is_err());
```
*/

/// Scoring for the banded overlap alignment.
/// Match is expected to be positive and the remaining values negative, otherwise longer overlaps will not score higher.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringScheme {
    /// Score added for an identical pair of symbols
    pub match_score: f64,
    /// Score added for a substitution
    pub mismatch_score: f64,
    /// Score added once when a gap is opened
    pub gap_open: f64,
    /// Score added for every gap position, including the first
    pub gap_extend: f64,
    /// Enables an optional wildcard character that will match anything
    pub wildcard: Option<u8>
}

impl Default for ScoringScheme {
    fn default() -> Self {
        Self {
            match_score: 1.0,
            mismatch_score: -1.0,
            gap_open: -2.0,
            gap_extend: -1.0,
            wildcard: None
        }
    }
}

impl ScoringScheme {
    /// Returns the substitution score for a pair of symbols
    pub fn substitution(&self, a: u8, b: u8) -> f64 {
        if self.is_match(a, b) {
            self.match_score
        } else {
            self.mismatch_score
        }
    }

    /// Returns true if the two symbols are equal or one of them is the wildcard
    pub fn is_match(&self, a: u8, b: u8) -> bool {
        a == b || self.wildcard.map_or(false, |w| a == w || b == w)
    }
}

/**
Contains configuration information for the seed-and-extend overlap detection.
`min_overlap_length` is required; everything else has a default.
```
use olc_layout::olc_config::{OverlapConfig, OverlapConfigBuilder, ScoringScheme};
let config: OverlapConfig = OverlapConfigBuilder::default()
    .min_overlap_length(100)
    .scoring(ScoringScheme { wildcard: Some(b'N'), ..Default::default() })
    .build()
    .unwrap();
assert_eq!(config.min_overlap_length, 100);
```
*/
#[derive(derive_builder::Builder, Clone, Debug)]
pub struct OverlapConfig {
    /// Shortest overlap (in aligned bases) that is accepted; anything shorter is assembly noise
    pub min_overlap_length: usize,
    /// K-mer length used for seeding, must be in 1..=32
    #[builder(default = "12")]
    pub wordlen: usize,
    /// K-mers seen more often than this across all reads are considered repeats and ignored
    #[builder(default = "64")]
    pub max_kmer_occurrences: usize,
    /// Minimum number of merged seeds for a pair to be nominated; an error-free overlap is a single seed
    #[builder(default = "1")]
    pub min_seeds: usize,
    /// Width of the rolling window used to find the mode of the seed shift distribution
    #[builder(default = "20")]
    pub shift_window: usize,
    /// Minimum ratio between the best shift window coverage and the mean window coverage; pairs below it are dropped before alignment, 0 disables the check
    #[builder(default = "0.0")]
    pub min_shift_peak_ratio: f64,
    /// Band radius around the estimated diagonal
    #[builder(default = "20")]
    pub band_radius: usize,
    /// Alignment scoring
    #[builder(default)]
    pub scoring: ScoringScheme,
    /// Minimum alignment score for an overlap to be reported
    #[builder(default = "0.0")]
    pub min_overlap_score: f64,
    /// Minimum fraction of aligned columns that are matches
    #[builder(default = "0.75")]
    pub min_identity: f64,
    /// Minimum distance between the read starts (and ends) for the overlap direction to be reliable; 0 disables the check
    #[builder(default = "0")]
    pub min_margin: usize
}

/**
Bounds for the exact feedback arc set computation.
When any bound is exceeded the exact method reports an error instead of silently switching to the heuristic.
```
use olc_layout::olc_config::{ExactFasConfig, ExactFasConfigBuilder};
let config: ExactFasConfig = ExactFasConfigBuilder::default()
    .max_cycles(500)
    .build()
    .unwrap();
assert_eq!(config.max_cycles, 500);
```
*/
#[derive(derive_builder::Builder, Clone, Debug, PartialEq)]
#[builder(default)]
pub struct ExactFasConfig {
    /// Maximum number of edges that lie on some cycle
    pub max_edges: usize,
    /// Maximum number of elementary cycles that will be enumerated
    pub max_cycles: usize,
    /// Maximum number of branch-and-bound nodes explored by the solver
    pub max_search_nodes: u64
}

impl Default for ExactFasConfig {
    fn default() -> Self {
        Self {
            // cycle enumeration is exponential, so keep this small
            max_edges: 200,
            max_cycles: 10_000,
            max_search_nodes: 1_000_000
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_defaults() {
        let config = OverlapConfigBuilder::default()
            .min_overlap_length(250)
            .build().unwrap();
        assert_eq!(config.min_overlap_length, 250);
        assert_eq!(config.wordlen, 12);
        assert_eq!(config.band_radius, 20);
        assert_eq!(config.scoring, ScoringScheme::default());
        assert_eq!(config.min_margin, 0);
        assert_eq!(config.min_shift_peak_ratio, 0.0);
    }

    #[test]
    fn test_required_min_overlap() {
        let result = OverlapConfigBuilder::default()
            .wordlen(10)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_wildcard_match() {
        let scoring = ScoringScheme { wildcard: Some(b'N'), ..Default::default() };
        assert!(scoring.is_match(b'A', b'A'));
        assert!(scoring.is_match(b'N', b'C'));
        assert!(scoring.is_match(b'G', b'N'));
        assert!(!scoring.is_match(b'G', b'T'));
        assert_eq!(scoring.substitution(b'G', b'T'), -1.0);
    }
}
