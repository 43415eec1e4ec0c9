use crate::error::GraphError;

/// Maximum rank of any node's shape
pub const MAX_RANK: usize = 4;

/// Shape of a node's value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Shape(Box<[usize]>);

impl Shape {
    /// Get shape's rank
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.0.len()
    }

    /// Get number of elements in tensor with this shape
    /// (a product of it's dimensions).
    #[must_use]
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Iter
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.into_iter()
    }

    /// Dimensions as slice
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Fails with [`GraphError::RankExceeded`] if rank is above [`MAX_RANK`]
    /// or with [`GraphError::InvalidShape`] for rank zero.
    pub fn check(&self) -> Result<(), GraphError> {
        if self.rank() > MAX_RANK {
            return Err(GraphError::RankExceeded {
                rank: self.rank(),
                max: MAX_RANK,
            });
        }
        if self.rank() == 0 {
            return Err(GraphError::InvalidShape(self.clone()));
        }
        Ok(())
    }

    /// Get shape's strides
    #[must_use]
    pub fn strides(&self) -> Shape {
        let mut a = 1;
        let mut strides: Vec<usize> = self
            .0
            .iter()
            .rev()
            .map(|d| {
                let t = a;
                a *= d;
                t
            })
            .collect();
        strides.reverse();
        Shape(strides.into())
    }

    /// Strides for reading a value of this shape broadcasted into `shape`.
    /// Dimensions of size one that are expanded get stride zero.
    #[must_use]
    pub fn broadcast_strides(&self, shape: &Shape) -> Shape {
        self.strides()
            .into_iter()
            .zip(self)
            .zip(shape)
            .map(|((st, od), nd)| if od == nd { *st } else { 0 })
            .collect::<Vec<usize>>()
            .into()
    }

    /// Reduce self along axis, the axis is kept with size one
    #[must_use]
    pub fn reduce(&self, axis: usize) -> Shape {
        let mut shape = self.clone();
        shape.0[axis] = 1;
        shape
    }

    /// Shape with two last dimensions swapped
    #[must_use]
    pub fn transpose(&self) -> Shape {
        let mut shape = self.clone();
        let r = self.rank();
        if r > 1 {
            shape.0.swap(r - 1, r - 2);
        }
        shape
    }
}

impl core::fmt::Display for Shape {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:?}", self.0))
    }
}

impl core::ops::Index<usize> for Shape {
    type Output = usize;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<Vec<usize>> for Shape {
    fn from(value: Vec<usize>) -> Self {
        Shape(value.into_boxed_slice())
    }
}

impl From<&[usize]> for Shape {
    fn from(value: &[usize]) -> Self {
        Shape(value.iter().copied().collect())
    }
}

impl From<usize> for Shape {
    fn from(value: usize) -> Self {
        Shape(Box::new([value]))
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(value: [usize; N]) -> Self {
        Shape(value.into_iter().collect())
    }
}

impl From<&Shape> for Shape {
    fn from(value: &Shape) -> Self {
        value.clone()
    }
}

impl<'a> IntoIterator for &'a Shape {
    type IntoIter = <&'a [usize] as IntoIterator>::IntoIter;
    type Item = &'a usize;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides() {
        let sh = Shape::from([2, 3, 4]);
        assert_eq!(sh.numel(), 24);
        assert_eq!(sh.strides().dims(), &[12, 4, 1]);
        assert_eq!(sh[2], 4);
    }

    #[test]
    fn broadcast() {
        let sh = Shape::from([2, 1]);
        assert_eq!(sh.broadcast_strides(&[2, 3].into()).dims(), &[1, 0]);
        assert_eq!(Shape::from([2, 3]).reduce(1), Shape::from([2, 1]));
        assert_eq!(Shape::from([2, 3]).transpose(), Shape::from([3, 2]));
    }

    #[test]
    fn rank_bound() {
        assert!(Shape::from([1, 2, 3, 4]).check().is_ok());
        assert!(matches!(
            Shape::from([1, 1, 2, 3, 4]).check(),
            Err(GraphError::RankExceeded { rank: 5, max: MAX_RANK })
        ));
    }
}
