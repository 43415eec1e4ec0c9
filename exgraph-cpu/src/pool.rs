use crate::kernels::Data;
use exgraph_core::dtype::DType;
use std::collections::BTreeMap;

/// Freed buffers kept for reuse, keyed by dtype and element count
#[derive(Debug, Default)]
pub(crate) struct Pool {
    free: BTreeMap<(DType, usize), Vec<Data>>,
    bytes: usize,
}

impl Pool {
    pub(crate) fn take(&mut self, numel: usize, dtype: DType) -> Option<Data> {
        let data = self.free.get_mut(&(dtype, numel))?.pop()?;
        self.bytes -= data.bytes();
        Some(data)
    }

    pub(crate) fn put(&mut self, data: Data) {
        self.bytes += data.bytes();
        self.free.entry((data.dtype(), data.numel())).or_default().push(data);
    }

    /// Bytes held by pooled buffers
    pub(crate) fn bytes(&self) -> usize {
        self.bytes
    }

    pub(crate) fn clear(&mut self) {
        self.free.clear();
        self.bytes = 0;
    }
}

#[test]
fn reuse() {
    let mut pool = Pool::default();
    pool.put(Data::new(4, DType::F32));
    assert_eq!(pool.bytes(), 16);
    assert!(pool.take(4, DType::I32).is_none());
    assert!(pool.take(3, DType::F32).is_none());
    assert_eq!(pool.take(4, DType::F32).map(|data| data.numel()), Some(4));
    assert_eq!(pool.bytes(), 0);
}
