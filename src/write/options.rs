//! Writer options and statistics.

/// Default deflate level.
pub const DEFAULT_LEVEL: u32 = 6;

/// Options for writing archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Deflate level, 0 (store-speed) to 9 (smallest).
    pub level: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }
}

impl WriteOptions {
    /// Creates write options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression level (0-9).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompressionLevel`] if `level > 9`.
    ///
    /// ```rust
    /// use zippy::write::WriteOptions;
    ///
    /// let opts = WriteOptions::new().level(9)?;
    /// assert_eq!(opts.level, 9);
    /// assert!(WriteOptions::new().level(15).is_err());
    /// # Ok::<(), zippy::Error>(())
    /// ```
    ///
    /// [`Error::InvalidCompressionLevel`]: crate::Error::InvalidCompressionLevel
    pub fn level(mut self, level: u32) -> crate::Result<Self> {
        if level > 9 {
            return Err(crate::Error::InvalidCompressionLevel { level });
        }
        self.level = level;
        Ok(self)
    }

    pub(crate) fn compression(&self) -> flate2::Compression {
        flate2::Compression::new(self.level)
    }
}

/// Result of a write operation.
#[must_use = "write result should be checked to verify operation completed as expected"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Number of entries written, including copied ones.
    pub entries_written: usize,
    /// Number of entries copied raw from another archive.
    pub entries_copied: usize,
    /// Number of directories written.
    pub directories_written: usize,
    /// Total uncompressed bytes of newly compressed entries.
    pub total_size: u64,
    /// Total compressed bytes of newly compressed entries.
    pub compressed_size: u64,
}

impl WriteResult {
    /// Returns the compression ratio (compressed / uncompressed).
    pub fn compression_ratio(&self) -> f64 {
        if self.total_size == 0 {
            1.0
        } else {
            self.compressed_size as f64 / self.total_size as f64
        }
    }

    /// Returns the space savings as a fraction.
    pub fn space_savings(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            1.0 - self.compression_ratio()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_validation() {
        assert_eq!(WriteOptions::new().level(0).unwrap().level, 0);
        assert!(matches!(
            WriteOptions::new().level(10),
            Err(crate::Error::InvalidCompressionLevel { level: 10 })
        ));
    }

    #[test]
    fn test_ratio_of_empty_result() {
        let result = WriteResult::default();
        assert_eq!(result.compression_ratio(), 1.0);
        assert_eq!(result.space_savings(), 0.0);
    }
}
