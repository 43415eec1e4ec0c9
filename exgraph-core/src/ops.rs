use crate::{
    arena::Expr,
    backend::Backend,
    error::GraphError,
    graph::Graph,
    node::Op,
};

/// Elementwise addition
pub fn add<B: Backend>(graph: &mut Graph<B>, x: Expr, y: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Add, vec![x, y])
}

/// Elementwise subtraction
pub fn sub<B: Backend>(graph: &mut Graph<B>, x: Expr, y: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Sub, vec![x, y])
}

/// Elementwise multiplication
pub fn mul<B: Backend>(graph: &mut Graph<B>, x: Expr, y: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Mul, vec![x, y])
}

/// Elementwise division
pub fn div<B: Backend>(graph: &mut Graph<B>, x: Expr, y: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Div, vec![x, y])
}

/// Negation
pub fn neg<B: Backend>(graph: &mut Graph<B>, x: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Neg, vec![x])
}

/// Exponential
pub fn exp<B: Backend>(graph: &mut Graph<B>, x: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Exp, vec![x])
}

/// Natural logarithm
pub fn log<B: Backend>(graph: &mut Graph<B>, x: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Ln, vec![x])
}

/// Hyperbolic tangent
pub fn tanh<B: Backend>(graph: &mut Graph<B>, x: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Tanh, vec![x])
}

/// Rectified linear unit
pub fn relu<B: Backend>(graph: &mut Graph<B>, x: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::ReLU, vec![x])
}

/// Logistic sigmoid
pub fn sigmoid<B: Backend>(graph: &mut Graph<B>, x: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Sigmoid, vec![x])
}

/// Multiply by constant factor
pub fn scale<B: Backend>(graph: &mut Graph<B>, x: Expr, factor: f32) -> Result<Expr, GraphError> {
    graph.apply(Op::Scale(factor), vec![x])
}

/// Sum along axis, reduced axis is kept with size one
pub fn sum<B: Backend>(graph: &mut Graph<B>, x: Expr, axis: usize) -> Result<Expr, GraphError> {
    graph.apply(Op::Sum(axis), vec![x])
}

/// Sum of all elements
pub fn sum_all<B: Backend>(graph: &mut Graph<B>, x: Expr) -> Result<Expr, GraphError> {
    let rank = graph.shape(x)?.rank();
    (0..rank).try_fold(x, |x, axis| sum(graph, x, axis))
}

/// Mean of all elements
pub fn mean_all<B: Backend>(graph: &mut Graph<B>, x: Expr) -> Result<Expr, GraphError> {
    let numel = graph.shape(x)?.numel();
    let total = sum_all(graph, x)?;
    scale(graph, total, 1.0 / numel as f32)
}

/// Matrix product
pub fn dot<B: Backend>(graph: &mut Graph<B>, a: Expr, b: Expr) -> Result<Expr, GraphError> {
    dot_t(graph, a, b, false, false)
}

/// Matrix product with optionally transposed operands
pub fn dot_t<B: Backend>(graph: &mut Graph<B>, a: Expr, b: Expr, trans_a: bool, trans_b: bool) -> Result<Expr, GraphError> {
    graph.apply(Op::Dot { trans_a, trans_b }, vec![a, b])
}

/// Rows of matrix x selected by I32 index vector
pub fn rows<B: Backend>(graph: &mut Graph<B>, x: Expr, indices: Expr) -> Result<Expr, GraphError> {
    graph.apply(Op::Rows, vec![x, indices])
}

/// Squared error summed over all elements
pub fn square_error<B: Backend>(graph: &mut Graph<B>, x: Expr, target: Expr) -> Result<Expr, GraphError> {
    let diff = sub(graph, x, target)?;
    let sq = mul(graph, diff, diff)?;
    sum_all(graph, sq)
}
