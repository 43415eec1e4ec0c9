/// Debug mask, set by the `EXGRAPH_DEBUG` environment variable or the
/// `debug` field of [`GraphConfig`](crate::config::GraphConfig).
///
/// Bits:
/// 1 - memory, allocation, freeing and capacity probes
/// 2 - forward pass trace
/// 4 - backward pass trace
/// 8 - checkpoint plans
/// 16 - memoization hits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugMask(pub u32);

impl DebugMask {
    /// Read mask from environment, falls back to `default`
    #[must_use]
    pub fn from_env(default: u32) -> Self {
        if let Ok(x) = std::env::var("EXGRAPH_DEBUG") {
            if let Ok(x) = x.parse::<u32>() {
                return Self(x);
            }
        }
        Self(default)
    }

    /// Print memory operations
    #[must_use]
    pub const fn memory(&self) -> bool {
        self.0 % 2 == 1
    }

    /// Print each node evaluated in forward pass
    #[must_use]
    pub const fn forward(&self) -> bool {
        (self.0 >> 1) % 2 == 1
    }

    /// Print each node processed in backward pass
    #[must_use]
    pub const fn backward(&self) -> bool {
        (self.0 >> 2) % 2 == 1
    }

    /// Print checkpoint subtapes
    #[must_use]
    pub const fn checkpoint(&self) -> bool {
        (self.0 >> 3) % 2 == 1
    }

    /// Print memoization hits
    #[must_use]
    pub const fn memo(&self) -> bool {
        (self.0 >> 4) % 2 == 1
    }
}

#[test]
fn bits() {
    let d = DebugMask(0b10110);
    assert!(!d.memory());
    assert!(d.forward());
    assert!(d.backward());
    assert!(!d.checkpoint());
    assert!(d.memo());
}
