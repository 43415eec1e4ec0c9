use exgraph_core::{
    backend::{BOp, Kernel, UOp},
    dtype::DType,
    error::GraphError,
    shape::Shape,
};
#[cfg(feature = "std")]
use rayon::prelude::*;

#[derive(Debug)]
pub(crate) enum Data {
    F32(Vec<f32>),
    I32(Vec<i32>),
}

impl Data {
    pub(crate) fn new(numel: usize, dtype: DType) -> Data {
        match dtype {
            DType::F32 => Data::F32(vec![0.0; numel]),
            DType::I32 => Data::I32(vec![0; numel]),
        }
    }

    pub(crate) fn numel(&self) -> usize {
        match self {
            Data::F32(data) => data.len(),
            Data::I32(data) => data.len(),
        }
    }

    pub(crate) fn dtype(&self) -> DType {
        match self {
            Data::F32(_) => DType::F32,
            Data::I32(_) => DType::I32,
        }
    }

    pub(crate) fn bytes(&self) -> usize {
        self.numel() * self.dtype().byte_size()
    }

    pub(crate) fn to_f32(&self) -> Vec<f32> {
        match self {
            Data::F32(data) => data.clone(),
            Data::I32(data) => data.iter().map(|x| *x as f32).collect(),
        }
    }

    pub(crate) fn f32(&self) -> Result<&[f32], GraphError> {
        match self {
            Data::F32(data) => Ok(data),
            Data::I32(_) => Err(GraphError::InvalidDType {
                expected: DType::F32,
                found: DType::I32,
            }),
        }
    }

    pub(crate) fn f32_mut(&mut self) -> Result<&mut [f32], GraphError> {
        match self {
            Data::F32(data) => Ok(data),
            Data::I32(_) => Err(GraphError::InvalidDType {
                expected: DType::F32,
                found: DType::I32,
            }),
        }
    }

    pub(crate) fn i32(&self) -> Result<&[i32], GraphError> {
        match self {
            Data::I32(data) => Ok(data),
            Data::F32(_) => Err(GraphError::InvalidDType {
                expected: DType::I32,
                found: DType::F32,
            }),
        }
    }
}

fn map1(out: &mut [f32], a: &[f32], op: impl Fn(f32, f32) -> f32 + Sync + Send) {
    #[cfg(not(feature = "std"))]
    {
        out.iter_mut().zip(a).for_each(|(o, a)| *o = op(*o, *a));
    }
    #[cfg(feature = "std")]
    {
        out.par_iter_mut().zip(a.par_iter()).for_each(|(o, a)| *o = op(*o, *a));
    }
}

fn map2(out: &mut [f32], a: &[f32], b: &[f32], op: impl Fn(f32, f32, f32) -> f32 + Sync + Send) {
    #[cfg(not(feature = "std"))]
    {
        out.iter_mut()
            .zip(a)
            .zip(b)
            .for_each(|((o, a), b)| *o = op(*o, *a, *b));
    }
    #[cfg(feature = "std")]
    {
        out.par_iter_mut()
            .zip(a.par_iter())
            .zip(b.par_iter())
            .for_each(|((o, a), b)| *o = op(*o, *a, *b));
    }
}

fn map3(out: &mut [f32], a: &[f32], b: &[f32], c: &[f32], op: impl Fn(f32, f32, f32, f32) -> f32 + Sync + Send) {
    #[cfg(not(feature = "std"))]
    {
        out.iter_mut()
            .zip(a)
            .zip(b)
            .zip(c)
            .for_each(|(((o, a), b), c)| *o = op(*o, *a, *b, *c));
    }
    #[cfg(feature = "std")]
    {
        out.par_iter_mut()
            .zip(a.par_iter())
            .zip(b.par_iter())
            .zip(c.par_iter())
            .for_each(|(((o, a), b), c)| *o = op(*o, *a, *b, *c));
    }
}

fn uop(op: UOp, x: f32) -> f32 {
    match op {
        UOp::Neg => -x,
        UOp::Exp => x.exp(),
        UOp::Ln => x.ln(),
        UOp::Tanh => x.tanh(),
        UOp::ReLU => x.max(0.0),
        UOp::Sigmoid => 1.0 / (1.0 + (-x).exp()),
    }
}

fn bop(op: BOp, x: f32, y: f32) -> f32 {
    match op {
        BOp::Add => x + y,
        BOp::Sub => x - y,
        BOp::Mul => x * y,
        BOp::Div => x / y,
    }
}

pub(crate) fn elementwise(kernel: Kernel, out: &mut [f32], args: &[&[f32]]) -> Result<(), GraphError> {
    if let Some(arg) = args.iter().find(|arg| arg.len() != out.len()) {
        return Err(GraphError::DataLength {
            len: arg.len(),
            numel: out.len(),
        });
    }
    match (kernel, args) {
        (Kernel::Unary(op), [a]) => map1(out, a, move |_, a| uop(op, a)),
        (Kernel::Binary(op), [a, b]) => map2(out, a, b, move |_, a, b| bop(op, a, b)),
        (Kernel::Scale(s), [a]) => map1(out, a, move |_, a| s * a),
        (Kernel::Threshold { p, s }, [a]) => map1(out, a, move |_, a| if a < p { s } else { 0.0 }),
        (Kernel::AccScaled(s), [a]) => map1(out, a, move |o, a| o + s * a),
        (Kernel::AccMul, [a, b]) => map2(out, a, b, |o, a, b| o + a * b),
        (Kernel::AccDiv, [a, b]) => map2(out, a, b, |o, a, b| o + a / b),
        (Kernel::AccDivGrad, [a, b, c]) => map3(out, a, b, c, |o, a, b, c| o - a * b / (c * c)),
        (Kernel::AccTanhGrad, [a, b]) => map2(out, a, b, |o, a, b| o + a * (1.0 - b * b)),
        (Kernel::AccSigmoidGrad, [a, b]) => map2(out, a, b, |o, a, b| o + a * b * (1.0 - b)),
        (Kernel::AccReLUGrad, [a, b]) => map2(out, a, b, |o, a, b| if b > 0.0 { o + a } else { o }),
        _ => {
            return Err(GraphError::Arity {
                op: "kernel",
                found: args.len(),
            })
        }
    }
    Ok(())
}

/// out = beta * out + op(a) · op(b)
#[allow(clippy::too_many_arguments)]
pub(crate) fn dot(
    out: &mut [f32],
    a: &[f32],
    a_shape: &Shape,
    trans_a: bool,
    b: &[f32],
    b_shape: &Shape,
    trans_b: bool,
    beta: f32,
) -> Result<(), GraphError> {
    let mismatch = || GraphError::ShapeMismatch {
        op: "dot",
        lhs: a_shape.clone(),
        rhs: b_shape.clone(),
    };
    let (sa, sb) = match (a_shape.dims(), b_shape.dims()) {
        ([r0, r1], [s0, s1]) => ((*r0, *r1), (*s0, *s1)),
        _ => return Err(mismatch()),
    };
    let (m, k) = if trans_a { (sa.1, sa.0) } else { sa };
    let (kb, n) = if trans_b { (sb.1, sb.0) } else { sb };
    if k != kb || out.len() != m * n {
        return Err(mismatch());
    }
    let a_at = |i: usize, p: usize| if trans_a { a[p * sa.1 + i] } else { a[i * sa.1 + p] };
    let b_at = |p: usize, j: usize| if trans_b { b[j * sb.1 + p] } else { b[p * sb.1 + j] };
    let row = |(i, row): (usize, &mut [f32])| {
        for (j, o) in row.iter_mut().enumerate() {
            let acc: f32 = (0..k).map(|p| a_at(i, p) * b_at(p, j)).sum();
            *o = if beta == 0.0 { acc } else { beta * *o + acc };
        }
    };
    if n == 0 {
        return Ok(());
    }
    #[cfg(not(feature = "std"))]
    {
        out.chunks_mut(n).enumerate().for_each(row);
    }
    #[cfg(feature = "std")]
    {
        out.par_chunks_mut(n).enumerate().for_each(row);
    }
    Ok(())
}

/// out = sum of x along axis
pub(crate) fn sum(out: &mut [f32], x: &[f32], shape: &Shape, axis: usize) -> Result<(), GraphError> {
    let dims = shape.dims();
    if axis >= dims.len() {
        return Err(GraphError::InvalidAxis {
            axis,
            shape: shape.clone(),
        });
    }
    let n = dims[axis];
    let inner: usize = dims[axis + 1..].iter().product();
    let reduce = |(i, o): (usize, &mut f32)| {
        let (outer, inner_i) = (i / inner, i % inner);
        *o = (0..n).map(|j| x[outer * n * inner + j * inner + inner_i]).sum();
    };
    #[cfg(not(feature = "std"))]
    {
        out.iter_mut().enumerate().for_each(reduce);
    }
    #[cfg(feature = "std")]
    {
        out.par_iter_mut().enumerate().for_each(reduce);
    }
    Ok(())
}

/// out += x broadcasted from x_shape to out_shape
pub(crate) fn acc_broadcast(out: &mut [f32], out_shape: &Shape, x: &[f32], x_shape: &Shape) -> Result<(), GraphError> {
    if out_shape.rank() != x_shape.rank() {
        return Err(GraphError::ShapeMismatch {
            op: "broadcast",
            lhs: out_shape.clone(),
            rhs: x_shape.clone(),
        });
    }
    let strides = out_shape.strides();
    let x_strides = x_shape.broadcast_strides(out_shape);
    let acc = |(i, o): (usize, &mut f32)| {
        let mut rem = i;
        let mut xi = 0;
        for (st, xst) in strides.iter().zip(x_strides.iter()) {
            xi += rem / st * xst;
            rem %= st;
        }
        *o += x[xi];
    };
    #[cfg(not(feature = "std"))]
    {
        out.iter_mut().enumerate().for_each(acc);
    }
    #[cfg(feature = "std")]
    {
        out.par_iter_mut().enumerate().for_each(acc);
    }
    Ok(())
}

fn row_index(index: i32, rows: usize) -> Result<usize, GraphError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < rows)
        .ok_or_else(|| GraphError::backend(format!("Row index {index} out of range 0..{rows}")))
}

pub(crate) fn rows(out: &mut [f32], x: &[f32], x_shape: &Shape, indices: &[i32]) -> Result<(), GraphError> {
    let (rows, cols) = (x_shape[0], x_shape[1]);
    for (row, index) in out.chunks_mut(cols).zip(indices) {
        let r = row_index(*index, rows)?;
        row.copy_from_slice(&x[r * cols..(r + 1) * cols]);
    }
    Ok(())
}

// sequential, the same row may be selected more than once
pub(crate) fn acc_rows(out: &mut [f32], out_shape: &Shape, grad: &[f32], indices: &[i32]) -> Result<(), GraphError> {
    let (rows, cols) = (out_shape[0], out_shape[1]);
    for (row, index) in grad.chunks(cols).zip(indices) {
        let r = row_index(*index, rows)?;
        out[r * cols..(r + 1) * cols]
            .iter_mut()
            .zip(row)
            .for_each(|(o, g)| *o += g);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_transposes() -> Result<(), GraphError> {
        // a = [[1, 2, 3], [4, 5, 6]]
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let sa = Shape::from([2, 3]);
        let mut out = [0.0; 4];
        dot(&mut out, &a, &sa, false, &a, &sa, true, 0.0)?;
        assert_eq!(out, [14.0, 32.0, 32.0, 77.0]);
        let mut out = [1.0; 9];
        dot(&mut out, &a, &sa, true, &a, &sa, false, 1.0)?;
        assert_eq!(out, [18.0, 23.0, 28.0, 23.0, 30.0, 37.0, 28.0, 37.0, 46.0]);
        assert!(dot(&mut out, &a, &sa, false, &a, &sa, false, 0.0).is_err());
        Ok(())
    }

    #[test]
    fn sum_and_broadcast() -> Result<(), GraphError> {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let shape = Shape::from([2, 3]);
        let mut cols = [0.0; 3];
        sum(&mut cols, &x, &shape, 0)?;
        assert_eq!(cols, [5.0, 7.0, 9.0]);
        let mut rows = [0.0; 2];
        sum(&mut rows, &x, &shape, 1)?;
        assert_eq!(rows, [6.0, 15.0]);

        let mut out = [1.0; 6];
        acc_broadcast(&mut out, &shape, &rows, &Shape::from([2, 1]))?;
        assert_eq!(out, [7.0, 7.0, 7.0, 16.0, 16.0, 16.0]);
        Ok(())
    }

    #[test]
    fn gather_rows() -> Result<(), GraphError> {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let shape = Shape::from([3, 2]);
        let mut out = [0.0; 4];
        rows(&mut out, &x, &shape, &[2, 2])?;
        assert_eq!(out, [5.0, 6.0, 5.0, 6.0]);
        let mut grad = [0.0; 6];
        acc_rows(&mut grad, &shape, &[1.0; 4], &[2, 2])?;
        assert_eq!(grad, [0.0, 0.0, 0.0, 0.0, 2.0, 2.0]);
        assert!(rows(&mut out, &x, &shape, &[3, 0]).is_err());
        Ok(())
    }
}
