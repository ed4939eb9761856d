//! Central constants for status tags, limits and diagnostic text
//!
//! Single source of truth for the literal values shared by the aggregator, the fan-in
//! coordinator and the diagnostic message builder.

/// Status tags carried by [`crate::status::OperationStatus`]
pub mod status_tag {
    /// Normal completion of an smget request
    pub const END: &str = "END";

    /// Non-unique smget whose merged result repeats a secondary key
    pub const DUPLICATED: &str = "DUPLICATED";

    /// Fan-in dispatch with no recorded status
    pub const UNDEFINED: &str = "UNDEFINED";

    /// Sub-operation aborted by its dispatcher
    pub const CANCELED: &str = "CANCELED";
}

/// Upper bound for the number of elements a single smget may return
pub const MAX_SMGET_LIMIT: usize = 1000;

/// Diagnostic message fragments
pub mod diagnostic {
    /// Placeholder for an operation or node that could not be resolved
    pub const UNKNOWN: &str = "<unknown>";

    /// Annotation for a node that never finished connecting
    pub const NOT_CONNECTED_YET: &str = " (Not connected yet)";

    /// Separator introducing a single failing node
    pub const FAILING_NODE: &str = " - failing node: ";

    /// Separator introducing several failing nodes
    pub const FAILING_NODES: &str = " - failing nodes: ";
}
