use crate::{
    arena::{Arena, Expr},
    backend::{Allocator, BOp, Backend, Kernel, Memory, UOp},
    dtype::DType,
    error::GraphError,
    init::Init,
    shape::Shape,
};
use core::fmt::Formatter;
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// Operation kind of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    /// Named parameter, initialized once and kept across build cycles
    Param,
    /// Constant leaf produced by its initializer
    Constant,
    /// Neg unary op
    Neg,
    /// ReLU unary op
    ReLU,
    /// Exp unary op
    Exp,
    /// Natural logarithm unary op
    Ln,
    /// Hyperbolic tangent unary op
    Tanh,
    /// Logistic sigmoid unary op
    Sigmoid,
    /// Multiplication by constant factor
    Scale(f32),
    /// Addition binary op
    Add,
    /// Subtraction binary op
    Sub,
    /// Multiplication binary op
    Mul,
    /// Division binary op
    Div,
    /// Sum along axis, the axis is kept with size one
    Sum(usize),
    /// Matrix product of rank two operands
    Dot {
        /// Transpose first operand
        trans_a: bool,
        /// Transpose second operand
        trans_b: bool,
    },
    /// Select rows of a matrix by I32 index vector
    Rows,
}

impl Op {
    /// Name used in diagnostics and graphviz output
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Op::Param => "param",
            Op::Constant => "const",
            Op::Neg => "-",
            Op::ReLU => "ReLU",
            Op::Exp => "exp",
            Op::Ln => "log",
            Op::Tanh => "tanh",
            Op::Sigmoid => "sigmoid",
            Op::Scale(_) => "scale",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "x",
            Op::Div => "/",
            Op::Sum(_) => "sum",
            Op::Dot { .. } => "dot",
            Op::Rows => "rows",
        }
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Op::Scale(s) => s.to_bits().hash(state),
            Op::Sum(axis) => axis.hash(state),
            Op::Dot { trans_a, trans_b } => {
                trans_a.hash(state);
                trans_b.hash(state);
            }
            _ => {}
        }
    }

    fn infer_shape(&self, operands: &[&Node]) -> Result<Shape, GraphError> {
        let expect = |node: &Node, dtype: DType| {
            if node.dtype == dtype {
                Ok(())
            } else {
                Err(GraphError::InvalidDType {
                    expected: dtype,
                    found: node.dtype,
                })
            }
        };
        match (self, operands) {
            (Op::Neg | Op::ReLU | Op::Exp | Op::Ln | Op::Tanh | Op::Sigmoid | Op::Scale(_), [x]) => {
                expect(x, DType::F32)?;
                Ok(x.shape.clone())
            }
            (Op::Add | Op::Sub | Op::Mul | Op::Div, [x, y]) => {
                expect(x, DType::F32)?;
                expect(y, DType::F32)?;
                if x.shape != y.shape {
                    return Err(GraphError::ShapeMismatch {
                        op: self.name(),
                        lhs: x.shape.clone(),
                        rhs: y.shape.clone(),
                    });
                }
                Ok(x.shape.clone())
            }
            (Op::Sum(axis), [x]) => {
                expect(x, DType::F32)?;
                if *axis >= x.shape.rank() {
                    return Err(GraphError::InvalidAxis {
                        axis: *axis,
                        shape: x.shape.clone(),
                    });
                }
                Ok(x.shape.reduce(*axis))
            }
            (Op::Dot { trans_a, trans_b }, [a, b]) => {
                expect(a, DType::F32)?;
                expect(b, DType::F32)?;
                let mismatch = || GraphError::ShapeMismatch {
                    op: "dot",
                    lhs: a.shape.clone(),
                    rhs: b.shape.clone(),
                };
                if a.shape.rank() != 2 || b.shape.rank() != 2 {
                    return Err(mismatch());
                }
                let sa = if *trans_a { a.shape.transpose() } else { a.shape.clone() };
                let sb = if *trans_b { b.shape.transpose() } else { b.shape.clone() };
                if sa[1] != sb[0] {
                    return Err(mismatch());
                }
                Ok([sa[0], sb[1]].into())
            }
            (Op::Rows, [x, indices]) => {
                expect(x, DType::F32)?;
                expect(indices, DType::I32)?;
                if x.shape.rank() != 2 || indices.shape.rank() != 1 {
                    return Err(GraphError::ShapeMismatch {
                        op: "rows",
                        lhs: x.shape.clone(),
                        rhs: indices.shape.clone(),
                    });
                }
                Ok([indices.shape[0], x.shape[1]].into())
            }
            _ => Err(GraphError::Arity {
                op: self.name(),
                found: operands.len(),
            }),
        }
    }
}

/// Node of the expression graph.
///
/// Nodes own their value and gradient buffers. Children are handles
/// into the graph's arena, shared by any number of parents.
pub struct Node {
    op: Op,
    shape: Shape,
    dtype: DType,
    children: Vec<Expr>,
    hash: u64,
    init: Option<Init>,
    initialized: bool,
    name: Option<String>,
    memoize: bool,
    pub(crate) id: Option<usize>,
    pub(crate) value: Option<Memory>,
    pub(crate) grad: Option<Memory>,
    pub(crate) trainable: bool,
    pub(crate) checkpoint: bool,
    pub(crate) debug: Option<String>,
    pub(crate) subtape: Vec<Expr>,
}

impl Node {
    fn new(op: Op, shape: Shape, dtype: DType, children: Vec<Expr>, init: Option<Init>, name: Option<String>) -> Node {
        let mut node = Node {
            op,
            shape,
            dtype,
            children,
            hash: 0,
            init,
            initialized: false,
            name,
            memoize: false,
            id: None,
            value: None,
            grad: None,
            trainable: false,
            checkpoint: false,
            debug: None,
            subtape: Vec::new(),
        };
        node.hash = node.compute_hash();
        node
    }

    /// New parameter node
    pub fn param(name: impl Into<String>, shape: Shape, init: Init, trainable: bool) -> Result<Node, GraphError> {
        check_leaf(&shape, &init)?;
        let dtype = init.dtype();
        let mut node = Node::new(Op::Param, shape, dtype, Vec::new(), Some(init), Some(name.into()));
        node.trainable = trainable;
        Ok(node)
    }

    /// New constant node, deduplicated within the current build cycle only
    pub fn constant(shape: Shape, init: Init) -> Result<Node, GraphError> {
        check_leaf(&shape, &init)?;
        let dtype = init.dtype();
        Ok(Node::new(Op::Constant, shape, dtype, Vec::new(), Some(init), None))
    }

    /// New constant node kept across build cycles. Operations over memoized
    /// nodes only are memoized too. Random initializers are never memoized.
    pub fn memoized(shape: Shape, init: Init) -> Result<Node, GraphError> {
        let mut node = Node::constant(shape, init)?;
        node.memoize = node.init.as_ref().is_some_and(Init::is_deterministic);
        Ok(node)
    }

    /// New operation node over children stored in nodes
    pub fn new_op(op: Op, children: Vec<Expr>, nodes: &Arena<Node>) -> Result<Node, GraphError> {
        let operands = children
            .iter()
            .map(|x| nodes.get(*x).ok_or(GraphError::InvalidExpr(*x)))
            .collect::<Result<Vec<&Node>, GraphError>>()?;
        let shape = op.infer_shape(&operands)?;
        shape.check()?;
        let trainable = operands.iter().any(|x| x.trainable);
        let memoize = operands.iter().all(|x| x.memoize);
        let mut node = Node::new(op, shape, DType::F32, children, None, None);
        node.trainable = trainable;
        node.memoize = memoize;
        Ok(node)
    }

    fn compute_hash(&self) -> u64 {
        let mut state = DefaultHasher::new();
        self.op.hash_into(&mut state);
        self.shape.hash(&mut state);
        self.dtype.hash(&mut state);
        self.children.hash(&mut state);
        if let Some(init) = &self.init {
            init.hash_into(&mut state);
        }
        self.name.hash(&mut state);
        state.finish()
    }

    /// Structural hash of operation kind, shape and children
    #[must_use]
    pub const fn hash(&self) -> u64 {
        self.hash
    }

    /// Deep structural comparison used to break hash ties
    #[must_use]
    pub fn equal(&self, other: &Node) -> bool {
        self.op == other.op
            && self.shape == other.shape
            && self.dtype == other.dtype
            && self.children == other.children
            && self.name == other.name
            && match (&self.init, &other.init) {
                (Some(x), Some(y)) => x.equal(y),
                (None, None) => true,
                _ => false,
            }
    }

    /// Operation kind
    #[must_use]
    pub const fn op(&self) -> &Op {
        &self.op
    }

    /// Shape of value
    #[must_use]
    pub const fn shape(&self) -> &Shape {
        &self.shape
    }

    /// DType of value
    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    /// Ordered children
    #[must_use]
    pub fn children(&self) -> &[Expr] {
        &self.children
    }

    /// Name of parameter nodes
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Id within the current build cycle
    #[must_use]
    pub const fn id(&self) -> Option<usize> {
        self.id
    }

    /// Does the node take part in backward pass?
    #[must_use]
    pub const fn is_trainable(&self) -> bool {
        self.trainable
    }

    /// Is the node a recomputation boundary?
    #[must_use]
    pub const fn is_checkpoint(&self) -> bool {
        self.checkpoint
    }

    /// Is the node eligible for long-term memoization?
    #[must_use]
    pub const fn is_memoized(&self) -> bool {
        self.memoize
    }

    /// Is the node a parameter?
    #[must_use]
    pub const fn is_param(&self) -> bool {
        matches!(self.op, Op::Param)
    }

    /// Is the node a parameter or constant?
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.op, Op::Param | Op::Constant)
    }

    /// Nodes recomputed right before this node's backward
    #[must_use]
    pub fn subtape(&self) -> &[Expr] {
        &self.subtape
    }

    /// Value buffer, `None` until allocated
    #[must_use]
    pub const fn value(&self) -> Option<&Memory> {
        self.value.as_ref()
    }

    /// Gradient buffer, `None` until allocated
    #[must_use]
    pub const fn grad(&self) -> Option<&Memory> {
        self.grad.as_ref()
    }

    pub(crate) fn set_init(&mut self, init: Init) {
        self.init = Some(init);
        self.initialized = false;
    }

    /// Allocate value buffer, no-op if it is already allocated
    pub fn allocate(&mut self, allocator: &mut impl Allocator) -> Result<(), GraphError> {
        if self.value.is_none() {
            self.value = Some(allocator.alloc(self.shape.numel(), self.dtype)?);
        }
        Ok(())
    }

    /// Run initializer of leaf nodes, once
    pub fn init(&mut self, backend: &mut impl Backend) -> Result<(), GraphError> {
        if self.initialized {
            return Ok(());
        }
        if let Some(init) = &self.init {
            let memory = self.value.as_ref().ok_or_else(|| GraphError::NullValue {
                child: self.to_string(),
                parent: self.to_string(),
            })?;
            init.apply(backend, memory, &self.shape)?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Allocate gradient and set it to zero, once per backward pass
    pub fn set_zero_adjoint(&mut self, backend: &mut impl Backend) -> Result<(), GraphError> {
        if self.grad.is_none() {
            let grad = backend.alloc(self.shape.numel(), DType::F32)?;
            backend.fill(&grad, 0.0)?;
            self.grad = Some(grad);
        }
        Ok(())
    }

    /// Seed gradient of root node with ones
    pub fn init_dependent(&mut self, backend: &mut impl Backend) -> Result<(), GraphError> {
        if self.grad.is_none() {
            self.grad = Some(backend.alloc(self.shape.numel(), DType::F32)?);
        }
        if let Some(grad) = &self.grad {
            backend.fill(grad, 1.0)?;
        }
        Ok(())
    }

    /// Release value and gradient buffers. Parameters keep theirs,
    /// constants are initialized again once reallocated.
    pub fn free(&mut self, allocator: &mut impl Allocator) {
        if self.is_param() {
            return;
        }
        if let Some(value) = self.value.take() {
            allocator.free(value);
        }
        if let Some(grad) = self.grad.take() {
            allocator.free(grad);
        }
        self.initialized = false;
    }

    /// Release all buffers, including parameter's
    /// Release value of a node whose evaluation failed
    pub(crate) fn discard_value(&mut self, allocator: &mut impl Allocator) {
        if self.is_param() {
            return;
        }
        if let Some(value) = self.value.take() {
            allocator.free(value);
        }
        self.initialized = false;
    }

    pub(crate) fn release(&mut self, allocator: &mut impl Allocator) {
        if let Some(value) = self.value.take() {
            allocator.free(value);
        }
        if let Some(grad) = self.grad.take() {
            allocator.free(grad);
        }
        self.initialized = false;
    }

    fn own_value(&self) -> Result<&Memory, GraphError> {
        self.value.as_ref().ok_or_else(|| GraphError::NullValue {
            child: self.to_string(),
            parent: self.to_string(),
        })
    }

    fn operands<'a>(&self, nodes: &'a Arena<Node>) -> Result<Vec<&'a Node>, GraphError> {
        self.children
            .iter()
            .map(|x| nodes.get(*x).ok_or(GraphError::InvalidExpr(*x)))
            .collect()
    }

    fn child_value<'a>(&self, child: &'a Node) -> Result<&'a Memory, GraphError> {
        child.value.as_ref().ok_or_else(|| GraphError::NullValue {
            child: child.to_string(),
            parent: self.to_string(),
        })
    }

    /// Compute value from children's values
    pub fn forward(&self, nodes: &Arena<Node>, backend: &mut impl Backend) -> Result<(), GraphError> {
        if self.is_leaf() {
            return Ok(());
        }
        let out = self.own_value()?;
        let operands = self.operands(nodes)?;
        let args = operands
            .iter()
            .map(|x| self.child_value(x))
            .collect::<Result<Vec<&Memory>, GraphError>>()?;
        let unary = |uop| Kernel::Unary(uop);
        match self.op {
            Op::Param | Op::Constant => Ok(()),
            Op::Neg => backend.elementwise(unary(UOp::Neg), out, &args),
            Op::ReLU => backend.elementwise(unary(UOp::ReLU), out, &args),
            Op::Exp => backend.elementwise(unary(UOp::Exp), out, &args),
            Op::Ln => backend.elementwise(unary(UOp::Ln), out, &args),
            Op::Tanh => backend.elementwise(unary(UOp::Tanh), out, &args),
            Op::Sigmoid => backend.elementwise(unary(UOp::Sigmoid), out, &args),
            Op::Scale(s) => backend.elementwise(Kernel::Scale(s), out, &args),
            Op::Add => backend.elementwise(Kernel::Binary(BOp::Add), out, &args),
            Op::Sub => backend.elementwise(Kernel::Binary(BOp::Sub), out, &args),
            Op::Mul => backend.elementwise(Kernel::Binary(BOp::Mul), out, &args),
            Op::Div => backend.elementwise(Kernel::Binary(BOp::Div), out, &args),
            Op::Sum(axis) => backend.sum(out, args[0], &operands[0].shape, axis),
            Op::Dot { trans_a, trans_b } => backend.dot(
                out,
                args[0],
                &operands[0].shape,
                trans_a,
                args[1],
                &operands[1].shape,
                trans_b,
                0.0,
            ),
            Op::Rows => backend.rows(out, args[0], &operands[0].shape, args[1]),
        }
    }

    /// Accumulate gradient contributions into trainable children's gradients
    pub fn backward(&self, nodes: &Arena<Node>, backend: &mut impl Backend) -> Result<(), GraphError> {
        if self.is_leaf() {
            return Ok(());
        }
        let g = self.grad.as_ref().ok_or_else(|| GraphError::NullGradient { node: self.to_string() })?;
        let operands = self.operands(nodes)?;
        // children that are not trainable have no gradient
        let adj: Vec<Option<&Memory>> = operands.iter().map(|x| x.grad.as_ref()).collect();
        let val = |i: usize| self.child_value(operands[i]);
        match self.op {
            Op::Param | Op::Constant => {}
            Op::Add => {
                for ga in adj.iter().flatten() {
                    backend.elementwise(Kernel::AccScaled(1.0), ga, &[g])?;
                }
            }
            Op::Sub => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccScaled(1.0), ga, &[g])?;
                }
                if let Some(gb) = adj[1] {
                    backend.elementwise(Kernel::AccScaled(-1.0), gb, &[g])?;
                }
            }
            Op::Mul => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccMul, ga, &[g, val(1)?])?;
                }
                if let Some(gb) = adj[1] {
                    backend.elementwise(Kernel::AccMul, gb, &[g, val(0)?])?;
                }
            }
            Op::Div => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccDiv, ga, &[g, val(1)?])?;
                }
                if let Some(gb) = adj[1] {
                    backend.elementwise(Kernel::AccDivGrad, gb, &[g, val(0)?, val(1)?])?;
                }
            }
            Op::Neg => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccScaled(-1.0), ga, &[g])?;
                }
            }
            Op::Scale(s) => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccScaled(s), ga, &[g])?;
                }
            }
            Op::Exp => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccMul, ga, &[g, self.own_value()?])?;
                }
            }
            Op::Ln => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccDiv, ga, &[g, val(0)?])?;
                }
            }
            Op::Tanh => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccTanhGrad, ga, &[g, self.own_value()?])?;
                }
            }
            Op::Sigmoid => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccSigmoidGrad, ga, &[g, self.own_value()?])?;
                }
            }
            Op::ReLU => {
                if let Some(ga) = adj[0] {
                    backend.elementwise(Kernel::AccReLUGrad, ga, &[g, val(0)?])?;
                }
            }
            Op::Sum(_) => {
                if let Some(ga) = adj[0] {
                    backend.acc_broadcast(ga, &operands[0].shape, g, &self.shape)?;
                }
            }
            Op::Dot { trans_a, trans_b } => {
                let (a, sa) = (val(0)?, &operands[0].shape);
                let (b, sb) = (val(1)?, &operands[1].shape);
                let gs = &self.shape;
                if let Some(ga) = adj[0] {
                    match (trans_a, trans_b) {
                        (false, false) => backend.dot(ga, g, gs, false, b, sb, true, 1.0)?,
                        (true, false) => backend.dot(ga, b, sb, false, g, gs, true, 1.0)?,
                        (false, true) => backend.dot(ga, g, gs, false, b, sb, false, 1.0)?,
                        (true, true) => backend.dot(ga, b, sb, true, g, gs, true, 1.0)?,
                    }
                }
                if let Some(gb) = adj[1] {
                    match (trans_a, trans_b) {
                        (false, false) => backend.dot(gb, a, sa, true, g, gs, false, 1.0)?,
                        (true, false) => backend.dot(gb, a, sa, false, g, gs, false, 1.0)?,
                        (false, true) => backend.dot(gb, g, gs, true, a, sa, false, 1.0)?,
                        (true, true) => backend.dot(gb, g, gs, true, a, sa, true, 1.0)?,
                    }
                }
            }
            Op::Rows => {
                if let Some(ga) = adj[0] {
                    backend.acc_rows(ga, &operands[0].shape, g, val(1)?)?;
                }
            }
        }
        Ok(())
    }
}

fn check_leaf(shape: &Shape, init: &Init) -> Result<(), GraphError> {
    shape.check()?;
    match init.host_len() {
        Some(len) if len != shape.numel() => Err(GraphError::DataLength {
            len,
            numel: shape.numel(),
        }),
        _ => Ok(()),
    }
}

impl core::fmt::Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!(
            "Type: {}, Shape: {}, Name: {}, Id: {}, Hash: {}",
            self.op.name(),
            self.shape,
            self.name.as_deref().unwrap_or("none"),
            self.id.map_or_else(|| "none".to_string(), |id| id.to_string()),
            self.hash
        ))
    }
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let children = self
            .children
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<String>>()
            .join(", ");
        match (&self.op, &self.name, &self.init) {
            (Op::Param, Some(name), _) => f.write_fmt(format_args!("Param({name}, {})", self.shape)),
            (Op::Constant, _, Some(init)) => f.write_fmt(format_args!("Const({}, {init:?})", self.shape)),
            (op, ..) => f.write_fmt(format_args!("{op:?}({children})")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init;

    #[test]
    fn hash_and_equal() -> Result<(), GraphError> {
        let mut nodes = Arena::new();
        let a = nodes.push(Node::memoized([2, 2].into(), init::ones())?);
        let b = nodes.push(Node::memoized([2, 2].into(), init::from_value(2.0))?);
        let x = Node::new_op(Op::Mul, vec![a, b], &nodes)?;
        let y = Node::new_op(Op::Mul, vec![a, b], &nodes)?;
        let z = Node::new_op(Op::Mul, vec![b, a], &nodes)?;
        let w = Node::new_op(Op::Add, vec![a, b], &nodes)?;
        assert_eq!(x.hash(), y.hash());
        assert!(x.equal(&y));
        assert!(!x.equal(&z));
        assert!(!x.equal(&w));
        assert!(x.is_memoized());
        assert!(!x.is_trainable());
        let c = nodes.push(Node::constant([2, 2].into(), init::ones())?);
        assert!(!Node::new_op(Op::Mul, vec![a, c], &nodes)?.is_memoized());
        Ok(())
    }

    #[test]
    fn shape_inference() -> Result<(), GraphError> {
        let mut nodes = Arena::new();
        let a = nodes.push(Node::param("a", [2, 3].into(), init::zeros(), true)?);
        let b = nodes.push(Node::constant([2, 4].into(), init::zeros())?);
        let i = nodes.push(Node::constant([3].into(), init::from_indices(vec![1, 0, 1]))?);
        let d = Node::new_op(Op::Dot { trans_a: true, trans_b: false }, vec![a, b], &nodes)?;
        assert_eq!(d.shape(), &Shape::from([3, 4]));
        assert!(d.is_trainable());
        assert!(!d.is_memoized());
        assert!(matches!(
            Node::new_op(Op::Dot { trans_a: false, trans_b: false }, vec![a, b], &nodes),
            Err(GraphError::ShapeMismatch { op: "dot", .. })
        ));
        assert!(matches!(
            Node::new_op(Op::Add, vec![a, b], &nodes),
            Err(GraphError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            Node::new_op(Op::Sum(2), vec![a], &nodes),
            Err(GraphError::InvalidAxis { axis: 2, .. })
        ));
        assert_eq!(Node::new_op(Op::Rows, vec![a, i], &nodes)?.shape(), &Shape::from([3, 3]));
        assert!(matches!(
            Node::new_op(Op::Exp, vec![i], &nodes),
            Err(GraphError::InvalidDType { .. })
        ));
        Ok(())
    }

    #[test]
    fn random_constants_differ() -> Result<(), GraphError> {
        let x = Node::memoized([4].into(), init::dropout(0.5))?;
        let y = Node::constant([4].into(), init::dropout(0.5))?;
        assert_eq!(x.hash(), y.hash());
        assert!(!x.equal(&y));
        assert!(!x.is_memoized());
        assert!(matches!(
            Node::constant([3].into(), init::from_vec(vec![1.0, 2.0])),
            Err(GraphError::DataLength { len: 2, numel: 3 })
        ));
        Ok(())
    }
}
