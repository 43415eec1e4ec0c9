/// DType of a node's buffers
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DType {
    /// 32 bit floating point type
    F32,
    /// 32 bit integer type, used for index vectors
    I32,
}

impl DType {
    /// Get the size of DType in bytes
    pub const fn byte_size(self) -> usize {
        match self {
            Self::I32 | Self::F32 => 4,
        }
    }
}

impl core::fmt::Display for DType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> Result<(), core::fmt::Error> {
        f.write_fmt(format_args!("{self:?}"))
    }
}

#[test]
fn byte_size() {
    const F32: usize = DType::F32.byte_size();
    assert_eq!(F32, 4);
    assert_eq!(crate::backend::Memory::new(0, 3, DType::I32).bytes(), 12);
}
