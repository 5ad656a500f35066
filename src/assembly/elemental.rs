use crate::assembly::global::GlobalVector;
use crate::Real;
use std::fmt;
use std::fmt::{Display, Formatter};

/// A dense local vector whose entries know the global rows they belong to.
///
/// Entries are laid out block-major: entry `i + b * n` holds local node `i` of block `b`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementalVector<T: Real> {
    values: Vec<T>,
    row_indices: Vec<usize>,
    num_blocks: usize,
}

impl<T: Real> ElementalVector<T> {
    /// Creates a zero vector with `num_blocks * nodes_per_block` entries, all mapped to row 0.
    pub fn new(num_blocks: usize, nodes_per_block: usize) -> Self {
        let size = num_blocks * nodes_per_block;
        Self {
            values: vec![T::zero(); size],
            row_indices: vec![0; size],
            num_blocks,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Resets all values to zero. Row indices are kept.
    pub fn zero(&mut self) {
        self.values.fill(T::zero());
    }

    /// # Panics
    ///
    /// Panics if `local_index` is out of bounds.
    pub fn set_row_index(&mut self, local_index: usize, global_index: usize) {
        assert!(
            local_index < self.len(),
            "local index {local_index} out of bounds for elemental vector of length {}",
            self.len()
        );
        self.row_indices[local_index] = global_index;
    }

    /// Mutable access to a single entry, for accumulation.
    ///
    /// # Panics
    ///
    /// Panics if `local_index` is out of bounds.
    pub fn element_mut(&mut self, local_index: usize) -> &mut T {
        &mut self.values[local_index]
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    /// Adds every entry to its row of the global vector.
    pub fn add_to<V: GlobalVector<T> + ?Sized>(&self, global: &mut V) {
        for (&row, &value) in self.row_indices.iter().zip(&self.values) {
            global.add_to_entry(row, value);
        }
    }
}

impl<T: Real> Display for ElementalVector<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "ElementalVector ({} entries, {} blocks)", self.len(), self.num_blocks)?;
        for (i, (row, value)) in self.row_indices.iter().zip(&self.values).enumerate() {
            writeln!(f, "  [{i}] -> {row}: {value}")?;
        }
        Ok(())
    }
}
