//! Fixed-length controller input/output vectors.
//!
//! Backed by `heapless::Vec` so that no cycle allocates. The length is set
//! once at construction and never changes; writes past it are programming
//! errors and panic.

use heapless::Vec;
use pilot_common::consts::MAX_CONTROLLER_IO;

use crate::error::WiringError;

/// Ordered, fixed-length sequence of scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct IoVector {
    values: Vec<f64, MAX_CONTROLLER_IO>,
}

impl IoVector {
    /// Vector of `len` zeros.
    ///
    /// # Errors
    /// [`WiringError::Capacity`] when `len` exceeds [`MAX_CONTROLLER_IO`].
    pub fn zeroed(len: usize) -> Result<Self, WiringError> {
        let mut values = Vec::new();
        values
            .resize(len, 0.0)
            .map_err(|_| WiringError::Capacity {
                requested: len,
                capacity: MAX_CONTROLLER_IO,
            })?;
        Ok(Self { values })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read element `index`.
    ///
    /// # Panics
    /// When `index >= len()`.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        assert!(
            index < self.values.len(),
            "io index {index} out of range (len {})",
            self.values.len()
        );
        self.values[index]
    }

    /// Write element `index`.
    ///
    /// # Panics
    /// When `index >= len()`.
    #[inline]
    pub fn set(&mut self, index: usize, value: f64) {
        assert!(
            index < self.values.len(),
            "io index {index} out of range (len {})",
            self.values.len()
        );
        self.values[index] = value;
    }

    /// Copy `src` element-wise. Lengths must match.
    ///
    /// # Panics
    /// On length mismatch; wiring validation rules this out for built trees.
    #[inline]
    pub fn copy_from(&mut self, src: &[f64]) {
        assert_eq!(
            src.len(),
            self.values.len(),
            "io length mismatch: got {}, expected {}",
            src.len(),
            self.values.len()
        );
        self.values.copy_from_slice(src);
    }

    /// Set every element to zero.
    #[inline]
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }
}
