use crate::{dtype::DType, error::GraphError, shape::Shape};

/// Items with this name prefix carry metadata and are skipped when loading parameters
pub const SPECIAL_PREFIX: &str = "special:";

/// Name keyed, shape and type tagged parameter data exchanged with
/// save and load routines.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Parameter name without namespace
    pub name: String,
    /// Shape of parameter
    pub shape: Shape,
    /// DType of parameter
    pub dtype: DType,
    /// Values, I32 parameters are stored as exact integers in f32
    pub data: Vec<f32>,
}

impl Item {
    /// New F32 item
    pub fn new(name: impl Into<String>, shape: impl Into<Shape>, data: Vec<f32>) -> Item {
        Item {
            name: name.into(),
            shape: shape.into(),
            dtype: DType::F32,
            data,
        }
    }

    /// New I32 item
    pub fn from_indices(name: impl Into<String>, shape: impl Into<Shape>, data: &[u32]) -> Item {
        Item {
            name: name.into(),
            shape: shape.into(),
            dtype: DType::I32,
            data: data.iter().map(|x| *x as f32).collect(),
        }
    }

    /// Data of I32 item as indices, rejects negative, fractional and
    /// values not exactly representable in f32
    pub fn indices(&self) -> Result<Vec<u32>, GraphError> {
        self.data
            .iter()
            .map(|x| {
                if x.fract() == 0.0 && (0.0..=16_777_216.0).contains(x) {
                    Ok(*x as u32)
                } else {
                    Err(GraphError::InvalidIndex {
                        name: self.name.clone(),
                        value: *x,
                    })
                }
            })
            .collect()
    }

    /// Is this a metadata item?
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.name.starts_with(SPECIAL_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices() -> Result<(), GraphError> {
        let item = Item::from_indices("idx", [3], &[4, 0, 7]);
        assert_eq!(item.indices()?, [4, 0, 7]);
        for value in [-1.0, 0.5, f32::NAN] {
            let item = Item {
                data: vec![1.0, value],
                ..item.clone()
            };
            assert!(matches!(item.indices(), Err(GraphError::InvalidIndex { .. })));
        }
        Ok(())
    }
}
