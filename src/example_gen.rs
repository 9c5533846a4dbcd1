use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::read::{Read, ReadSet, Strand};

const BASES: &[u8; 4] = b"ACGT";

/// Creates a random genome over ACGT
/// # Arguments
/// * `genome_len` - the length of the genome
/// * `seed` - seed for the random generator, the same seed always gives the same genome
pub fn generate_genome(genome_len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base_distribution = Uniform::new(0, BASES.len());
    (0..genome_len)
        .map(|_i| BASES[rng.sample(base_distribution)])
        .collect()
}

/// Copies a sequence while adding errors
/// # Arguments
/// * `sequence` - the error-free sequence
/// * `error_rate` - overall error rate, assumes mismatch, insertion, and deletion are equally likely sub-components of this error rate
/// * `rng` - the random generator to draw from
pub fn add_errors(sequence: &[u8], error_rate: f64, rng: &mut StdRng) -> Vec<u8> {
    assert!((0.0..=1.0).contains(&error_rate));
    let base_distribution = Uniform::new(0, BASES.len());
    let basem1_distribution = Uniform::new(1, BASES.len());
    let error_distribution = Uniform::new(0.0, 1.0);
    let error_type_distribution = Uniform::new(0, 3);

    let mut seq = Vec::with_capacity(sequence.len());
    let mut index = 0;
    while index < sequence.len() {
        let c = sequence[index];
        let is_error = rng.sample(error_distribution) < error_rate;
        if is_error {
            match rng.sample(error_type_distribution) {
                0 => {
                    // substitution
                    let base_index = BASES.iter().position(|&b| b == c).unwrap_or(0);
                    let alt_index = (base_index + rng.sample(basem1_distribution)) % BASES.len();
                    seq.push(BASES[alt_index]);
                    index += 1;
                },
                1 => {
                    // deletion
                    index += 1;
                },
                2 => {
                    // insertion
                    seq.push(BASES[rng.sample(base_distribution)]);
                },
                _ => panic!("no impl")
            }
        } else {
            seq.push(c);
            index += 1;
        }
    }
    seq
}

/// Cuts reads from the genome at a fixed step, so each read overlaps the next by `read_len - step` bases.
/// Reads are named `read_0000`, `read_0001`, ... in genome order and carry their true start.
/// # Arguments
/// * `genome` - the source sequence
/// * `read_len` - the length of each read before errors
/// * `step` - the distance between consecutive read starts
/// * `error_rate` - see [`add_errors`]
/// * `seed` - seed for the error generator
pub fn tile_reads(genome: &[u8], read_len: usize, step: usize, error_rate: f64, seed: u64) -> ReadSet {
    assert!(read_len > 0 && step > 0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut reads = ReadSet::new();
    let mut start = 0;
    while start + read_len <= genome.len() {
        let sequence = add_errors(&genome[start..(start + read_len)], error_rate, &mut rng);
        let read = Read::with_position(format!("read_{:04}", reads.reads().len()), sequence.len(), start, Strand::Forward);
        reads.push_read(read, sequence);
        start += step;
    }
    reads
}

/// Samples reads at uniformly random start positions.
/// Reads are named in sampling order, not genome order.
/// # Arguments
/// * `genome` - the source sequence, must be at least `read_len` long
/// * `num_reads` - the number of reads to sample
/// * `read_len` - the length of each read before errors
/// * `error_rate` - see [`add_errors`]
/// * `seed` - seed for the positions and errors
pub fn sample_reads(genome: &[u8], num_reads: usize, read_len: usize, error_rate: f64, seed: u64) -> ReadSet {
    assert!(read_len > 0 && read_len <= genome.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let start_distribution = Uniform::new_inclusive(0, genome.len() - read_len);
    let mut reads = ReadSet::new();
    for i in 0..num_reads {
        let start = rng.sample(start_distribution);
        let sequence = add_errors(&genome[start..(start + read_len)], error_rate, &mut rng);
        let read = Read::with_position(format!("read_{i:04}"), sequence.len(), start, Strand::Forward);
        reads.push_read(read, sequence);
    }
    reads
}
