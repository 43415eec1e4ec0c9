//! Node initializers.
//!
//! Initializers run once per node, after its value was allocated and
//! before any parent reads it. Deterministic initializers take part in
//! memoization, random ones and lambdas never compare equal.

use crate::{
    backend::{Backend, Kernel, Memory},
    dtype::DType,
    error::GraphError,
    shape::Shape,
};
use std::{
    hash::{Hash, Hasher},
    rc::Rc,
};

/// Host function producing node data from its shape
pub type LambdaFn = Rc<dyn Fn(&Shape) -> Vec<f32>>;

/// Initializer of leaf nodes
#[derive(Clone)]
pub enum Init {
    /// Every element set to value
    Value(f32),
    /// Identity matrix scaled by value over the last two dimensions
    Eye(f32),
    /// Uniform distribution in low..high
    Uniform {
        /// Lower bound
        low: f32,
        /// Upper bound
        high: f32,
    },
    /// Normal distribution
    Normal {
        /// Mean
        mean: f32,
        /// Standard deviation
        stddev: f32,
    },
    /// Glorot uniform scaled by fan in and/or fan out
    GlorotUniform {
        /// Use fan in
        fan_in: bool,
        /// Use fan out
        fan_out: bool,
    },
    /// Glorot normal scaled by fan in and/or fan out
    GlorotNormal {
        /// Use fan in
        fan_in: bool,
        /// Use fan out
        fan_out: bool,
    },
    /// Value `scale` with probability `prob`, zero otherwise
    Bernoulli {
        /// Probability of scale
        prob: f32,
        /// Value of kept elements
        scale: f32,
    },
    /// Host data
    FromVec(Rc<[f32]>),
    /// Host indices, node gets I32 dtype
    FromIndices(Rc<[u32]>),
    /// Host function
    Lambda(LambdaFn),
}

/// All zeros
#[must_use]
pub fn zeros() -> Init {
    Init::Value(0.0)
}

/// All ones
#[must_use]
pub fn ones() -> Init {
    Init::Value(1.0)
}

/// All elements equal value
#[must_use]
pub fn from_value(value: f32) -> Init {
    Init::Value(value)
}

/// Identity matrix
#[must_use]
pub fn eye() -> Init {
    Init::Eye(1.0)
}

/// Uniform in low..high
#[must_use]
pub fn uniform(low: f32, high: f32) -> Init {
    Init::Uniform { low, high }
}

/// Normal distribution
#[must_use]
pub fn normal(mean: f32, stddev: f32) -> Init {
    Init::Normal { mean, stddev }
}

/// Glorot (Xavier) uniform
#[must_use]
pub fn glorot_uniform(fan_in: bool, fan_out: bool) -> Init {
    Init::GlorotUniform { fan_in, fan_out }
}

/// Glorot (Xavier) normal
#[must_use]
pub fn glorot_normal(fan_in: bool, fan_out: bool) -> Init {
    Init::GlorotNormal { fan_in, fan_out }
}

/// Bernoulli distribution
#[must_use]
pub fn bernoulli(prob: f32, scale: f32) -> Init {
    Init::Bernoulli { prob, scale }
}

/// Dropout mask, elements are dropped with probability `prob`
/// and kept elements are scaled by `1/(1 - prob)`
#[must_use]
pub fn dropout(prob: f32) -> Init {
    Init::Bernoulli {
        prob: 1.0 - prob,
        scale: 1.0 / (1.0 - prob),
    }
}

/// Copy of host data
#[must_use]
pub fn from_vec(data: impl Into<Rc<[f32]>>) -> Init {
    Init::FromVec(data.into())
}

/// Copy of host indices
#[must_use]
pub fn from_indices(data: impl Into<Rc<[u32]>>) -> Init {
    Init::FromIndices(data.into())
}

/// Host function called with node's shape
#[must_use]
pub fn lambda(f: impl Fn(&Shape) -> Vec<f32> + 'static) -> Init {
    Init::Lambda(Rc::new(f))
}

fn fans(shape: &Shape) -> (f32, f32) {
    let r = shape.rank();
    let fan_out = shape[r - 1] as f32;
    let fan_in = if r > 1 { shape[r - 2] as f32 } else { 1.0 };
    (fan_in, fan_out)
}

fn glorot_scale(shape: &Shape, fan_in: bool, fan_out: bool) -> f32 {
    let (fi, fo) = fans(shape);
    match (fan_in, fan_out) {
        (true, true) => (2.0 / (fi + fo)).sqrt(),
        (true, false) => (1.0 / fi).sqrt(),
        (false, true) => (1.0 / fo).sqrt(),
        (false, false) => 1.0,
    }
}

impl Init {
    /// DType of nodes produced by this initializer
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Init::FromIndices(_) => DType::I32,
            _ => DType::F32,
        }
    }

    /// Does the initializer always produce the same data?
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        matches!(
            self,
            Init::Value(_) | Init::Eye(_) | Init::FromVec(_) | Init::FromIndices(_)
        )
    }

    /// Number of elements produced for host data initializers
    #[must_use]
    pub fn host_len(&self) -> Option<usize> {
        match self {
            Init::FromVec(data) => Some(data.len()),
            Init::FromIndices(data) => Some(data.len()),
            _ => None,
        }
    }

    /// Structural equality, random initializers and lambdas are never equal
    #[must_use]
    pub fn equal(&self, other: &Init) -> bool {
        match (self, other) {
            (Init::Value(x), Init::Value(y)) | (Init::Eye(x), Init::Eye(y)) => x.to_bits() == y.to_bits(),
            (Init::FromVec(x), Init::FromVec(y)) => {
                Rc::ptr_eq(x, y) || x.iter().zip(y.iter()).all(|(a, b)| a.to_bits() == b.to_bits()) && x.len() == y.len()
            }
            (Init::FromIndices(x), Init::FromIndices(y)) => x == y,
            _ => false,
        }
    }

    pub(crate) fn hash_into<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Init::Value(x) | Init::Eye(x) => x.to_bits().hash(state),
            Init::Uniform { low, high } => {
                low.to_bits().hash(state);
                high.to_bits().hash(state);
            }
            Init::Normal { mean, stddev } => {
                mean.to_bits().hash(state);
                stddev.to_bits().hash(state);
            }
            Init::GlorotUniform { fan_in, fan_out } | Init::GlorotNormal { fan_in, fan_out } => {
                fan_in.hash(state);
                fan_out.hash(state);
            }
            Init::Bernoulli { prob, scale } => {
                prob.to_bits().hash(state);
                scale.to_bits().hash(state);
            }
            Init::FromVec(data) => {
                data.len().hash(state);
                for x in data.iter().take(64) {
                    x.to_bits().hash(state);
                }
            }
            Init::FromIndices(data) => data.hash(state),
            Init::Lambda(f) => (Rc::as_ptr(f) as *const u8 as usize).hash(state),
        }
    }

    /// Write initial data into memory of given shape
    pub fn apply<B: Backend>(&self, backend: &mut B, memory: &Memory, shape: &Shape) -> Result<(), GraphError> {
        match self {
            Init::Value(x) => backend.fill(memory, *x),
            Init::Eye(x) => {
                let r = shape.rank();
                let cols = shape[r - 1];
                let rows = if r > 1 { shape[r - 2] } else { 1 };
                let data: Vec<f32> = (0..shape.numel())
                    .map(|i| {
                        let (row, col) = ((i / cols) % rows, i % cols);
                        if row == col {
                            *x
                        } else {
                            0.0
                        }
                    })
                    .collect();
                backend.store(memory, &data)
            }
            Init::Uniform { low, high } => backend.uniform(memory, *low, *high),
            Init::Normal { mean, stddev } => backend.normal(memory, *mean, *stddev),
            Init::GlorotUniform { fan_in, fan_out } => {
                let scale = glorot_scale(shape, *fan_in, *fan_out) * 3f32.sqrt();
                backend.uniform(memory, -scale, scale)
            }
            Init::GlorotNormal { fan_in, fan_out } => {
                let scale = glorot_scale(shape, *fan_in, *fan_out);
                backend.normal(memory, 0.0, scale)
            }
            Init::Bernoulli { prob, scale } => {
                let samples = backend.alloc(memory.numel(), DType::F32)?;
                let res = backend
                    .uniform(&samples, 0.0, 1.0)
                    .and_then(|()| backend.elementwise(Kernel::Threshold { p: *prob, s: *scale }, memory, &[&samples]));
                backend.free(samples);
                res
            }
            Init::FromVec(data) => backend.store(memory, data),
            Init::FromIndices(data) => backend.store_indices(memory, data),
            Init::Lambda(f) => backend.store(memory, &f(shape)),
        }
    }
}

impl core::fmt::Debug for Init {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Init::Value(x) => f.write_fmt(format_args!("Value({x})")),
            Init::Eye(x) => f.write_fmt(format_args!("Eye({x})")),
            Init::Uniform { low, high } => f.write_fmt(format_args!("Uniform({low}..{high})")),
            Init::Normal { mean, stddev } => f.write_fmt(format_args!("Normal({mean}, {stddev})")),
            Init::GlorotUniform { fan_in, fan_out } => f.write_fmt(format_args!("GlorotUniform({fan_in}, {fan_out})")),
            Init::GlorotNormal { fan_in, fan_out } => f.write_fmt(format_args!("GlorotNormal({fan_in}, {fan_out})")),
            Init::Bernoulli { prob, scale } => f.write_fmt(format_args!("Bernoulli({prob}, {scale})")),
            Init::FromVec(data) => f.write_fmt(format_args!("FromVec(len {})", data.len())),
            Init::FromIndices(data) => f.write_fmt(format_args!("FromIndices(len {})", data.len())),
            Init::Lambda(_) => f.write_str("Lambda"),
        }
    }
}
