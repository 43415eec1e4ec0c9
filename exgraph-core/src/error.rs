use crate::{arena::Expr, dtype::DType, shape::Shape};
use thiserror::Error;

/// Errors returned by graph construction and execution.
///
/// All variants except [`GraphError::OutOfMemory`] are fatal for the current
/// build cycle, the graph state should be cleared before reuse.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Backward needs exactly one root node
    #[error("There are {count} root nodes for backward pass, expected exactly one:\n{roots}")]
    RootCount {
        /// Number of roots found
        count: usize,
        /// Description of each root node
        roots: String,
    },
    /// Forward evaluation found a child without value
    #[error("De-allocated child {child} of parent {parent}")]
    NullValue {
        /// Description of the child
        child: String,
        /// Description of the parent reading it
        parent: String,
    },
    /// Backward of a node without gradient buffer
    #[error("Gradient of {node} was not allocated")]
    NullGradient {
        /// Description of the node
        node: String,
    },
    /// Parameter requested again with different shape
    #[error("Requested shape {requested} for existing parameter '{name}' does not match original shape {original}")]
    ParamShapeMismatch {
        /// Parameter name
        name: String,
        /// Requested shape
        requested: Shape,
        /// Shape of the existing parameter
        original: Shape,
    },
    /// Graph was reloaded and closed for new parameters
    #[error("Graph was reloaded and parameter '{name}' is newly created")]
    ReloadedGraph {
        /// Parameter name
        name: String,
    },
    /// Shape rank is above the supported maximum
    #[error("Rank {rank} exceeds maximum tensor rank {max}")]
    RankExceeded {
        /// Requested rank
        rank: usize,
        /// Maximum rank
        max: usize,
    },
    /// Shape which can not hold a value
    #[error("Invalid shape {0}")]
    InvalidShape(Shape),
    /// Operands of an operation have incompatible shapes
    #[error("Incompatible shapes for {op}: {lhs} and {rhs}")]
    ShapeMismatch {
        /// Operation kind
        op: &'static str,
        /// Left operand shape
        lhs: Shape,
        /// Right operand shape
        rhs: Shape,
    },
    /// Axis out of range
    #[error("Invalid axis {axis} for shape {shape}")]
    InvalidAxis {
        /// Requested axis
        axis: usize,
        /// Shape of operand
        shape: Shape,
    },
    /// Unexpected dtype found
    #[error("InvalidDType: Expected {expected} but found {found}")]
    InvalidDType {
        /// Expected dtype
        expected: DType,
        /// Found dtype
        found: DType,
    },
    /// Wrong number of operands
    #[error("Operation {op} does not take {found} operands")]
    Arity {
        /// Operation kind
        op: &'static str,
        /// Number of operands passed
        found: usize,
    },
    /// Handle does not point to a live node of this graph
    #[error("Expression {0} does not belong to this graph")]
    InvalidExpr(Expr),
    /// Length of host data does not match the buffer
    #[error("Data length {len} does not match element count {numel}")]
    DataLength {
        /// Length of provided data
        len: usize,
        /// Element count of buffer
        numel: usize,
    },
    /// I32 item data is not an exact non-negative integer
    #[error("Item '{name}' holds {value}, which is not a valid index")]
    InvalidIndex {
        /// Item name
        name: String,
        /// Offending value
        value: f32,
    },
    /// Allocation would exceed the probing budget, recoverable
    #[error("Allocation of {requested} bytes exceeds budget of {budget} bytes, {allocated} bytes in use")]
    OutOfMemory {
        /// Requested bytes
        requested: usize,
        /// Bytes in use
        allocated: usize,
        /// Budget in bytes
        budget: usize,
    },
    /// NaN or Inf found while strict abort is configured
    #[error("Detected NaN ({nan}) or Inf ({inf}) in {pass} pass of {node}")]
    NumericHealth {
        /// NaN found
        nan: bool,
        /// Inf found
        inf: bool,
        /// forward or backward
        pass: &'static str,
        /// Description of the node
        node: String,
    },
    /// Error returned by backend
    #[error("Backend {0}")]
    Backend(String),
    /// Error parsing some data
    #[error("Parse {0}")]
    Parse(String),
    /// Error from file operations
    #[error("IO {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Is this the recoverable allocation failure of probing mode?
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, GraphError::OutOfMemory { .. })
    }

    /// Backend error with caller location
    #[track_caller]
    pub fn backend(e: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        let mut e: String = e.into();
        use std::fmt::Write;
        let _ = write!(e, ", {}:{}:{}", location.file(), location.line(), location.column());
        Self::Backend(e)
    }
}
