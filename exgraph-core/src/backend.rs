use crate::{dtype::DType, error::GraphError, shape::Shape};

/// Handle to device memory returned by [`Allocator::alloc`].
///
/// Memory is not [`Clone`], every handle is given back to the allocator
/// exactly once through [`Allocator::free`].
#[derive(Debug, PartialEq, Eq)]
pub struct Memory {
    id: usize,
    numel: usize,
    dtype: DType,
}

impl Memory {
    /// Create new handle, used by allocators only
    #[must_use]
    pub const fn new(id: usize, numel: usize, dtype: DType) -> Memory {
        Memory { id, numel, dtype }
    }

    /// Allocator defined id of this buffer
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Number of elements
    #[must_use]
    pub const fn numel(&self) -> usize {
        self.numel
    }

    /// DType of elements
    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    /// Size in bytes
    #[must_use]
    pub const fn bytes(&self) -> usize {
        self.numel * self.dtype.byte_size()
    }
}

/// Unary element-wise function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UOp {
    /// Negation
    Neg,
    /// Natural exponential
    Exp,
    /// Natural logarithm
    Ln,
    /// Hyperbolic tangent
    Tanh,
    /// Rectified linear unit
    ReLU,
    /// Logistic sigmoid
    Sigmoid,
}

/// Binary element-wise function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
}

/// Element-wise kernel writing into an output buffer.
/// Kernels named `Acc*` accumulate into the output instead of overwriting it,
/// they are used by backward passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// out = f(a)
    Unary(UOp),
    /// out = a op b
    Binary(BOp),
    /// out = s * a
    Scale(f32),
    /// out = (a < p) * s, used to turn uniform samples into bernoulli
    Threshold {
        /// Probability of `s`
        p: f32,
        /// Value written where sample is below `p`
        s: f32,
    },
    /// out += s * a
    AccScaled(f32),
    /// out += a * b
    AccMul,
    /// out += a / b
    AccDiv,
    /// out -= a * b / (c * c), gradient of denominator of division
    AccDivGrad,
    /// out += a * (1 - b * b), b is tanh output
    AccTanhGrad,
    /// out += a * b * (1 - b), b is sigmoid output
    AccSigmoidGrad,
    /// out += a where b > 0
    AccReLUGrad,
}

impl Kernel {
    /// Number of input buffers
    #[must_use]
    pub const fn arity(&self) -> usize {
        match self {
            Kernel::Unary(_) | Kernel::Scale(_) | Kernel::Threshold { .. } | Kernel::AccScaled(_) => 1,
            Kernel::Binary(_)
            | Kernel::AccMul
            | Kernel::AccDiv
            | Kernel::AccTanhGrad
            | Kernel::AccSigmoidGrad
            | Kernel::AccReLUGrad => 2,
            Kernel::AccDivGrad => 3,
        }
    }
}

/// Allocator of device memory.
pub trait Allocator {
    /// Allocate buffer for numel elements of dtype. Freed buffers
    /// are available for reuse by subsequent allocations.
    /// In probing mode an allocation above budget returns
    /// [`GraphError::OutOfMemory`].
    fn alloc(&mut self, numel: usize, dtype: DType) -> Result<Memory, GraphError>;
    /// Give buffer back to the allocator
    fn free(&mut self, memory: Memory);
    /// Enter probing mode with budget in bytes, `None` returns to normal mode
    fn throw_at_reallocation(&mut self, budget: Option<usize>);
    /// Is the allocator in probing mode?
    fn is_probing(&self) -> bool;
    /// Bytes currently held by live buffers
    fn allocated_bytes(&self) -> usize;
}

/// Device backend executing kernels on memory from its own [`Allocator`].
pub trait Backend: Allocator {
    /// Device identity, used in diagnostics
    fn device(&self) -> String;
    /// Reseed random number generator
    fn seed(&mut self, seed: u64);
    /// Copy host data into buffer
    fn store(&mut self, memory: &Memory, data: &[f32]) -> Result<(), GraphError>;
    /// Copy host indices into I32 buffer
    fn store_indices(&mut self, memory: &Memory, data: &[u32]) -> Result<(), GraphError>;
    /// Copy buffer to host
    fn load(&self, memory: &Memory) -> Result<Vec<f32>, GraphError>;
    /// Set all elements to value
    fn fill(&mut self, memory: &Memory, value: f32) -> Result<(), GraphError>;
    /// Sample uniform distribution in range low..high
    fn uniform(&mut self, memory: &Memory, low: f32, high: f32) -> Result<(), GraphError>;
    /// Sample normal distribution
    fn normal(&mut self, memory: &Memory, mean: f32, stddev: f32) -> Result<(), GraphError>;
    /// Run element-wise kernel, all buffers have the same element count
    /// and out is distinct from args
    fn elementwise(&mut self, kernel: Kernel, out: &Memory, args: &[&Memory]) -> Result<(), GraphError>;
    /// Matrix product out = beta * out + op(a) · op(b) of rank two operands,
    /// op transposes when the respective flag is set
    #[allow(clippy::too_many_arguments)]
    fn dot(
        &mut self,
        out: &Memory,
        a: &Memory,
        a_shape: &Shape,
        trans_a: bool,
        b: &Memory,
        b_shape: &Shape,
        trans_b: bool,
        beta: f32,
    ) -> Result<(), GraphError>;
    /// out = sum of x along axis, out has shape of x with axis reduced to one
    fn sum(&mut self, out: &Memory, x: &Memory, shape: &Shape, axis: usize) -> Result<(), GraphError>;
    /// out += x broadcasted from x_shape to out_shape
    fn acc_broadcast(&mut self, out: &Memory, out_shape: &Shape, x: &Memory, x_shape: &Shape) -> Result<(), GraphError>;
    /// out row i = x row indices\[i\] of rank two x
    fn rows(&mut self, out: &Memory, x: &Memory, x_shape: &Shape, indices: &Memory) -> Result<(), GraphError>;
    /// out row indices\[i\] += grad row i, inverse of [`Backend::rows`]
    fn acc_rows(&mut self, out: &Memory, out_shape: &Shape, grad: &Memory, indices: &Memory) -> Result<(), GraphError>;
    /// Multiply all elements by factor, in place
    fn scale(&mut self, memory: &Memory, factor: f32) -> Result<(), GraphError>;
    /// L2 norm of all elements
    fn l2_norm(&mut self, memory: &Memory) -> Result<f32, GraphError>;
    /// Returns (has NaN, has Inf)
    fn check_nan(&mut self, memory: &Memory) -> Result<(bool, bool), GraphError>;
}
