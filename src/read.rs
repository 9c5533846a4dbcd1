/// Orientation of a read relative to the genome it was sampled from
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Strand {
    Forward,
    Reverse
}

/// A sequencing read as seen by the overlap graph.
/// The start position and strand are only known when the read was simulated (ground truth).
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Read {
    /// Unique read identifier
    name: String,
    /// Length of the read sequence
    length: usize,
    /// Known genomic start position, if any
    start: Option<usize>,
    /// Known strand, if any
    strand: Option<Strand>
}

impl Read {
    /// Creates a read without any positional information
    pub fn new(name: impl Into<String>, length: usize) -> Read {
        Read {
            name: name.into(),
            length,
            start: None,
            strand: None
        }
    }

    /// Creates a read with a known genomic start position and strand
    pub fn with_position(name: impl Into<String>, length: usize, start: usize, strand: Strand) -> Read {
        Read {
            name: name.into(),
            length,
            start: Some(start),
            strand: Some(strand)
        }
    }

    /// Returns the genomic end position (exclusive) if the start is known
    pub fn end(&self) -> Option<usize> {
        self.start.map(|s| s + self.length)
    }

    // Getters
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn start(&self) -> Option<usize> {
        self.start
    }

    pub fn strand(&self) -> Option<Strand> {
        self.strand
    }
}

/// Read-only lookup of reads and their sequences by index.
pub trait SequenceStore {
    /// Number of reads in the store
    fn len(&self) -> usize;

    /// The read metadata at `index`
    fn read(&self, index: usize) -> &Read;

    /// The sequence bytes at `index`
    fn sequence(&self, index: usize) -> &[u8];

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Simple in-memory [`SequenceStore`]
#[derive(Clone, Debug, Default)]
pub struct ReadSet {
    reads: Vec<Read>,
    sequences: Vec<Vec<u8>>
}

impl ReadSet {
    pub fn new() -> ReadSet {
        Default::default()
    }

    /// Adds a new read; the length is taken from the sequence.
    /// # Arguments
    /// * `name` - the read identifier
    /// * `sequence` - the read sequence
    pub fn push(&mut self, name: impl Into<String>, sequence: Vec<u8>) {
        let read = Read::new(name, sequence.len());
        self.push_read(read, sequence);
    }

    /// Adds a read with existing metadata, typically one with a known position.
    /// # Panics
    /// * if the read length does not match the sequence length
    pub fn push_read(&mut self, read: Read, sequence: Vec<u8>) {
        assert_eq!(read.length(), sequence.len());
        self.reads.push(read);
        self.sequences.push(sequence);
    }

    pub fn reads(&self) -> &[Read] {
        &self.reads
    }

    pub fn sequences(&self) -> &[Vec<u8>] {
        &self.sequences
    }
}

impl SequenceStore for ReadSet {
    fn len(&self) -> usize {
        self.reads.len()
    }

    fn read(&self, index: usize) -> &Read {
        &self.reads[index]
    }

    fn sequence(&self, index: usize) -> &[u8] {
        &self.sequences[index]
    }
}
