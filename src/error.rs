use std::{error, fmt};

/// Result type for the graph-level operations
pub type OlcResult<T> = Result<T, OlcError>;

/// Errors surfaced by the overlap graph and the cycle breaking strategies.
/// A rejected alignment is not an error; the aligner reports it as `Ok(None)`.
#[derive(Clone, Debug, PartialEq)]
pub enum OlcError {
    /// An edge already exists for the ordered pair with different attributes
    DuplicateEdge { source: String, target: String },
    /// The reverse edge already exists; a confirmed overlap has a single direction
    ConflictingDirection { source: String, target: String },
    /// Edges from a read to itself are not allowed
    SelfLoop(String),
    /// A node index that is not part of the graph
    UnknownNode(usize),
    /// A read name that is not part of the graph
    UnknownRead(String),
    /// A read with the same name but different content is already in the graph
    DuplicateRead(String),
    /// Layout was requested while the graph still contains a cycle
    CyclicGraph,
    /// The exact feedback arc set method exceeded one of its configured bounds
    InfeasibleExactBreak(String),
    /// Ground truth construction requires a known start position
    MissingPosition(String)
}

impl fmt::Display for OlcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use OlcError as OE;
        match self {
            OE::DuplicateEdge { source, target } => {
                write!(f, "Edge {source} -> {target} already exists with different attributes")
            }
            OE::ConflictingDirection { source, target } => {
                write!(f, "Cannot add {source} -> {target}, the reverse edge already exists")
            }
            OE::SelfLoop(name) => write!(f, "Self-loop on {name} is not allowed"),
            OE::UnknownNode(index) => write!(f, "Node index {index} is not in the graph"),
            OE::UnknownRead(name) => write!(f, "Read {name} is not in the graph"),
            OE::DuplicateRead(name) => {
                write!(f, "A different read named {name} is already in the graph")
            }
            OE::CyclicGraph => {
                write!(f, "Graph contains a cycle, break cycles before requesting a layout")
            }
            OE::InfeasibleExactBreak(reason) => {
                write!(f, "Exact feedback arc set is infeasible: {reason}")
            }
            OE::MissingPosition(name) => {
                write!(f, "Read {name} does not have a known start position")
            }
        }
    }
}

impl error::Error for OlcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = OlcError::DuplicateEdge { source: "r1".to_string(), target: "r2".to_string() };
        assert_eq!(err.to_string(), "Edge r1 -> r2 already exists with different attributes");
        assert_eq!(OlcError::UnknownNode(7).to_string(), "Node index 7 is not in the graph");

        // make sure it converts into the boxed form used elsewhere
        let boxed: Box<dyn std::error::Error> = OlcError::CyclicGraph.into();
        assert!(boxed.to_string().contains("cycle"));
    }
}
