//! CPU only, pure rust backend for exgraph
//!
//! Initialize backend.
//! ```rust
//! let dev = exgraph_cpu::device();
//! ```
//!
//! Buffers are plain vectors. Freed buffers go to a pool and are reused by
//! allocations of the same dtype and size. With feature `std` kernels run
//! in parallel using rayon.

#![forbid(unsafe_code)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(rustdoc::private_intra_doc_links)]
#![forbid(missing_docs)]
#![forbid(rustdoc::missing_crate_level_docs)]
#![forbid(rustdoc::private_doc_tests)]
#![forbid(rustdoc::invalid_codeblock_attributes)]
#![forbid(rustdoc::invalid_html_tags)]
#![forbid(rustdoc::invalid_rust_codeblocks)]
#![forbid(rustdoc::bare_urls)]
#![forbid(rustdoc::unescaped_backticks)]
#![forbid(rustdoc::redundant_explicit_links)]

mod kernels;
mod pool;

use crate::{kernels::Data, pool::Pool};
use exgraph_core::{
    backend::{Allocator, Backend, Kernel, Memory},
    shape::Shape,
};
pub use exgraph_core::{dtype::DType, error::GraphError};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;

/// CPU backend
pub struct Cpu {
    buffers: BTreeMap<usize, Data>,
    pool: Pool,
    next_id: usize,
    allocated: usize,
    budget: Option<usize>,
    rng: SmallRng,
}

/// Create new CPU backend
pub fn device() -> Cpu {
    Cpu {
        buffers: BTreeMap::new(),
        pool: Pool::default(),
        next_id: 0,
        allocated: 0,
        budget: None,
        rng: SmallRng::seed_from_u64(420_694_206_942_069),
    }
}

impl Cpu {
    /// Bytes held by the pool of freed buffers
    pub fn pooled_bytes(&self) -> usize {
        self.pool.bytes()
    }

    fn data(&self, memory: &Memory) -> Result<&Data, GraphError> {
        self.buffers
            .get(&memory.id())
            .ok_or_else(|| GraphError::backend(format!("Buffer {} is not allocated", memory.id())))
    }

    fn data_mut(&mut self, memory: &Memory) -> Result<&mut Data, GraphError> {
        self.buffers
            .get_mut(&memory.id())
            .ok_or_else(|| GraphError::backend(format!("Buffer {} is not allocated", memory.id())))
    }

    // Out is taken from the map so that args can be read while it is written.
    fn with_out(
        &mut self,
        out: &Memory,
        f: impl FnOnce(&mut [f32], &Cpu) -> Result<(), GraphError>,
    ) -> Result<(), GraphError> {
        let mut data = self
            .buffers
            .remove(&out.id())
            .ok_or_else(|| GraphError::backend(format!("Buffer {} is not allocated", out.id())))?;
        let res = data.f32_mut().and_then(|slice| f(slice, &*self));
        self.buffers.insert(out.id(), data);
        res
    }

    fn f32(&self, memory: &Memory) -> Result<&[f32], GraphError> {
        self.data(memory)?.f32()
    }

    fn i32(&self, memory: &Memory) -> Result<&[i32], GraphError> {
        self.data(memory)?.i32()
    }
}

impl Allocator for Cpu {
    fn alloc(&mut self, numel: usize, dtype: DType) -> Result<Memory, GraphError> {
        let data = if let Some(data) = self.pool.take(numel, dtype) {
            data
        } else {
            let requested = numel * dtype.byte_size();
            if let Some(budget) = self.budget {
                // pooled buffers are dropped before giving up
                if self.allocated + self.pool.bytes() + requested > budget {
                    self.pool.clear();
                }
                if self.allocated + requested > budget {
                    return Err(GraphError::OutOfMemory {
                        requested,
                        allocated: self.allocated,
                        budget,
                    });
                }
            }
            Data::new(numel, dtype)
        };
        self.allocated += data.bytes();
        let id = self.next_id;
        self.next_id += 1;
        self.buffers.insert(id, data);
        Ok(Memory::new(id, numel, dtype))
    }

    fn free(&mut self, memory: Memory) {
        if let Some(data) = self.buffers.remove(&memory.id()) {
            self.allocated -= data.bytes();
            self.pool.put(data);
        }
    }

    fn throw_at_reallocation(&mut self, budget: Option<usize>) {
        self.budget = budget;
    }

    fn is_probing(&self) -> bool {
        self.budget.is_some()
    }

    fn allocated_bytes(&self) -> usize {
        self.allocated
    }
}

impl Backend for Cpu {
    fn device(&self) -> String {
        "cpu".into()
    }

    fn seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    fn store(&mut self, memory: &Memory, data: &[f32]) -> Result<(), GraphError> {
        match self.data_mut(memory)? {
            Data::F32(buffer) if buffer.len() == data.len() => buffer.copy_from_slice(data),
            Data::I32(buffer) if buffer.len() == data.len() => {
                buffer.iter_mut().zip(data).for_each(|(b, x)| *b = *x as i32);
            }
            buffer => {
                return Err(GraphError::DataLength {
                    len: data.len(),
                    numel: buffer.numel(),
                })
            }
        }
        Ok(())
    }

    fn store_indices(&mut self, memory: &Memory, data: &[u32]) -> Result<(), GraphError> {
        match self.data_mut(memory)? {
            Data::I32(buffer) if buffer.len() == data.len() => {
                for (b, x) in buffer.iter_mut().zip(data) {
                    *b = i32::try_from(*x).map_err(|e| GraphError::backend(e.to_string()))?;
                }
                Ok(())
            }
            Data::I32(buffer) => Err(GraphError::DataLength {
                len: data.len(),
                numel: buffer.len(),
            }),
            Data::F32(_) => Err(GraphError::InvalidDType {
                expected: DType::I32,
                found: DType::F32,
            }),
        }
    }

    fn load(&self, memory: &Memory) -> Result<Vec<f32>, GraphError> {
        Ok(self.data(memory)?.to_f32())
    }

    fn fill(&mut self, memory: &Memory, value: f32) -> Result<(), GraphError> {
        match self.data_mut(memory)? {
            Data::F32(buffer) => buffer.fill(value),
            Data::I32(buffer) => buffer.fill(value as i32),
        }
        Ok(())
    }

    fn uniform(&mut self, memory: &Memory, low: f32, high: f32) -> Result<(), GraphError> {
        let mut data = self
            .buffers
            .remove(&memory.id())
            .ok_or_else(|| GraphError::backend(format!("Buffer {} is not allocated", memory.id())))?;
        let res = data.f32_mut().map(|buffer| {
            for x in buffer {
                *x = low + (high - low) * self.rng.gen::<f32>();
            }
        });
        self.buffers.insert(memory.id(), data);
        res
    }

    fn normal(&mut self, memory: &Memory, mean: f32, stddev: f32) -> Result<(), GraphError> {
        let normal = Normal::new(mean, stddev).map_err(|e| GraphError::backend(e.to_string()))?;
        let mut data = self
            .buffers
            .remove(&memory.id())
            .ok_or_else(|| GraphError::backend(format!("Buffer {} is not allocated", memory.id())))?;
        let res = data.f32_mut().map(|buffer| {
            for x in buffer {
                *x = normal.sample(&mut self.rng);
            }
        });
        self.buffers.insert(memory.id(), data);
        res
    }

    fn elementwise(&mut self, kernel: Kernel, out: &Memory, args: &[&Memory]) -> Result<(), GraphError> {
        if args.len() != kernel.arity() {
            return Err(GraphError::Arity {
                op: "kernel",
                found: args.len(),
            });
        }
        self.with_out(out, |out, cpu| {
            let args = args
                .iter()
                .map(|x| cpu.f32(x))
                .collect::<Result<Vec<&[f32]>, GraphError>>()?;
            kernels::elementwise(kernel, out, &args)
        })
    }

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
    ) -> Result<(), GraphError> {
        self.with_out(out, |out, cpu| {
            kernels::dot(out, cpu.f32(a)?, a_shape, trans_a, cpu.f32(b)?, b_shape, trans_b, beta)
        })
    }

    fn sum(&mut self, out: &Memory, x: &Memory, shape: &Shape, axis: usize) -> Result<(), GraphError> {
        self.with_out(out, |out, cpu| kernels::sum(out, cpu.f32(x)?, shape, axis))
    }

    fn acc_broadcast(&mut self, out: &Memory, out_shape: &Shape, x: &Memory, x_shape: &Shape) -> Result<(), GraphError> {
        self.with_out(out, |out, cpu| kernels::acc_broadcast(out, out_shape, cpu.f32(x)?, x_shape))
    }

    fn rows(&mut self, out: &Memory, x: &Memory, x_shape: &Shape, indices: &Memory) -> Result<(), GraphError> {
        self.with_out(out, |out, cpu| kernels::rows(out, cpu.f32(x)?, x_shape, cpu.i32(indices)?))
    }

    fn acc_rows(&mut self, out: &Memory, out_shape: &Shape, grad: &Memory, indices: &Memory) -> Result<(), GraphError> {
        self.with_out(out, |out, cpu| kernels::acc_rows(out, out_shape, cpu.f32(grad)?, cpu.i32(indices)?))
    }

    fn scale(&mut self, memory: &Memory, factor: f32) -> Result<(), GraphError> {
        self.data_mut(memory)?.f32_mut()?.iter_mut().for_each(|x| *x *= factor);
        Ok(())
    }

    fn l2_norm(&mut self, memory: &Memory) -> Result<f32, GraphError> {
        Ok(self.f32(memory)?.iter().map(|x| x * x).sum::<f32>().sqrt())
    }

    fn check_nan(&mut self, memory: &Memory) -> Result<(bool, bool), GraphError> {
        let data = self.f32(memory)?;
        Ok((data.iter().any(|x| x.is_nan()), data.iter().any(|x| x.is_infinite())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probing() -> Result<(), GraphError> {
        let mut dev = device();
        let x = dev.alloc(4, DType::F32)?;
        dev.throw_at_reallocation(Some(24));
        assert!(dev.is_probing());
        let y = dev.alloc(2, DType::F32)?;
        assert!(matches!(
            dev.alloc(1, DType::F32),
            Err(GraphError::OutOfMemory { requested: 4, allocated: 24, budget: 24 })
        ));
        dev.free(y);
        // same size is served from the pool
        let y = dev.alloc(2, DType::F32)?;
        dev.throw_at_reallocation(None);
        assert!(!dev.is_probing());
        let z = dev.alloc(16, DType::F32)?;
        assert_eq!(dev.allocated_bytes(), 88);
        for m in [x, y, z] {
            dev.free(m);
        }
        assert_eq!(dev.allocated_bytes(), 0);
        assert_eq!(dev.pooled_bytes(), 88);
        Ok(())
    }

    #[test]
    fn kernels_and_random() -> Result<(), GraphError> {
        let mut dev = device();
        dev.seed(42);
        let x = dev.alloc(1000, DType::F32)?;
        let y = dev.alloc(1000, DType::F32)?;
        dev.uniform(&x, -1.0, 1.0)?;
        assert!(dev.load(&x)?.iter().all(|v| (-1.0..1.0).contains(v)));
        dev.elementwise(Kernel::Threshold { p: 0.0, s: 2.0 }, &y, &[&x])?;
        let below = dev.load(&x)?.iter().filter(|v| **v < 0.0).count();
        assert_eq!(dev.load(&y)?.iter().filter(|v| **v == 2.0).count(), below);
        dev.normal(&x, 0.0, 1.0)?;
        let mean = dev.load(&x)?.iter().sum::<f32>() / 1000.0;
        assert!(mean.abs() < 0.2);
        dev.fill(&y, 3.0)?;
        dev.fill(&x, 4.0)?;
        assert_eq!(dev.l2_norm(&y)?, (9000f32).sqrt());
        dev.elementwise(Kernel::AccMul, &y, &[&x, &x])?;
        assert!(dev.load(&y)?.iter().all(|v| *v == 19.0));
        assert!(dev.elementwise(Kernel::AccMul, &y, &[&x]).is_err());
        dev.store(&y, &vec![f32::NAN; 1000])?;
        assert_eq!(dev.check_nan(&y)?, (true, false));
        Ok(())
    }
}
