/// Read-only numeric inputs addressed by `LOAD`.
///
/// Indices start at 0. The interpreter only ever reads through this trait.
pub trait Variables {
    /// Number of addressable slots.
    fn len(&self) -> usize;

    /// Value at `index` converted to `f64`, or `None` when out of range.
    fn get(&self, index: usize) -> Option<f64>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Copy + Into<f64>> Variables for [T] {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn get(&self, index: usize) -> Option<f64> {
        <[T]>::get(self, index).map(|v| (*v).into())
    }
}

impl<T: Copy + Into<f64>, const N: usize> Variables for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn get(&self, index: usize) -> Option<f64> {
        Variables::get(self.as_slice(), index)
    }
}

impl<T: Copy + Into<f64>> Variables for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> Option<f64> {
        Variables::get(self.as_slice(), index)
    }
}
