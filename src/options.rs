//! Parser/extraction configuration (§9's anti-singleton note): an immutable
//! value threaded explicitly through constructors instead of read from any
//! global or thread-local state.

/// Default chunk size for internal buffered reads (e.g. the cabinet
/// searcher's scan buffer).
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Configuration for parsing and extracting cabinets.
///
/// Pass this to [`Cabinet::new_with_config`](crate::cabinet::Cabinet::new_with_config)
/// (or build one with [`CabinetReaderConfig::new`] and its `with_*` setters)
/// to control salvage behavior, logging verbosity, and buffer sizing. The
/// plain [`Cabinet::new`](crate::cabinet::Cabinet::new) constructor is
/// equivalent to passing `CabinetReaderConfig::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CabinetReaderConfig {
    salvage: bool,
    quiet: bool,
    buffer_size: usize,
}

impl Default for CabinetReaderConfig {
    fn default() -> CabinetReaderConfig {
        CabinetReaderConfig {
            salvage: false,
            quiet: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl CabinetReaderConfig {
    /// Returns a new configuration with the defaults: salvage mode off,
    /// normal logging, and the default buffer size.
    pub fn new() -> CabinetReaderConfig {
        CabinetReaderConfig::default()
    }

    /// In salvage mode, per-file parse failures (e.g. a file entry whose
    /// folder index is out of range) and CFDATA checksum mismatches are
    /// downgraded to a `tracing::warn!` event, and the offending file is
    /// skipped (or the block is used as-is) instead of aborting the parse.
    pub fn with_salvage(mut self, salvage: bool) -> CabinetReaderConfig {
        self.salvage = salvage;
        self
    }

    /// Suppresses this crate's own `tracing::debug!`/`tracing::warn!`
    /// events.
    pub fn with_quiet(mut self, quiet: bool) -> CabinetReaderConfig {
        self.quiet = quiet;
        self
    }

    /// Sets the buffer size used for internal chunked reads. Defaults to
    /// [`DEFAULT_BUFFER_SIZE`].
    pub fn with_buffer_size(mut self, buffer_size: usize) -> CabinetReaderConfig {
        self.buffer_size = buffer_size;
        self
    }

    /// Returns whether salvage mode is enabled.
    pub fn salvage(&self) -> bool {
        self.salvage
    }

    /// Returns whether quiet mode is enabled.
    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Returns the configured buffer size.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}
