//! Extraction options.

/// Policy for handling existing files during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Truncate and rewrite existing files.
    #[default]
    Overwrite,
    /// Leave existing files alone and leave the entry out of the result.
    Skip,
    /// Fail with [`Error::DestinationExists`](crate::Error::DestinationExists).
    Error,
}

/// Metadata preservation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreserveMetadata {
    /// Restore the stored modification time (also used as access time).
    pub modification_time: bool,
    /// Create files and directories with the stored permission bits.
    pub mode: bool,
}

impl Default for PreserveMetadata {
    fn default() -> Self {
        Self::all()
    }
}

impl PreserveMetadata {
    /// Preserve everything.
    pub fn all() -> Self {
        Self {
            modification_time: true,
            mode: true,
        }
    }

    /// Preserve nothing; files get the process defaults.
    pub fn none() -> Self {
        Self {
            modification_time: false,
            mode: false,
        }
    }
}

/// Options for extraction operations.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Discard directory components and extract every entry by base name.
    ///
    /// Entries from different directories may then collide; the last one
    /// written wins.
    pub junk_paths: bool,
    /// Policy for handling existing files.
    pub overwrite: OverwritePolicy,
    /// Metadata preservation options.
    pub preserve_metadata: PreserveMetadata,
}

impl ExtractOptions {
    /// Creates extraction options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets junk-path mode.
    pub fn junk_paths(mut self, junk: bool) -> Self {
        self.junk_paths = junk;
        self
    }

    /// Sets the overwrite policy.
    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Sets metadata preservation options.
    pub fn preserve_metadata(mut self, preserve: PreserveMetadata) -> Self {
        self.preserve_metadata = preserve;
        self
    }
}
