//! Session configuration.

use dirfile_storage::AccessMode;

/// Default recursion ceiling for field resolution.
pub const DEFAULT_MAX_RECURSION: usize = 32;

/// Configuration for opening a dirfile session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the session may write.
    pub access_mode: AccessMode,

    /// Maximum depth of derived-field resolution.
    pub max_recursion: usize,

    /// Frames that precede the first frame stored in each RAW data file.
    pub frame_offset: i64,

    /// Samples scanned before the window to seed an MPLEX field with no period.
    pub mplex_lookback: usize,

    /// Whether to create the dirfile directory if it doesn't exist.
    pub create_dirs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_mode: AccessMode::ReadOnly,
            max_recursion: DEFAULT_MAX_RECURSION,
            frame_offset: 0,
            mplex_lookback: 10,
            create_dirs: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the access mode.
    #[must_use]
    pub const fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Shorthand for `access_mode(AccessMode::ReadWrite)`.
    #[must_use]
    pub const fn read_write(self) -> Self {
        self.access_mode(AccessMode::ReadWrite)
    }

    /// Sets the recursion ceiling.
    #[must_use]
    pub const fn max_recursion(mut self, depth: usize) -> Self {
        self.max_recursion = depth;
        self
    }

    /// Sets the frame offset.
    #[must_use]
    pub const fn frame_offset(mut self, frames: i64) -> Self {
        self.frame_offset = frames;
        self
    }

    /// Sets the MPLEX lookback used when an entry has no period.
    #[must_use]
    pub const fn mplex_lookback(mut self, samples: usize) -> Self {
        self.mplex_lookback = samples;
        self
    }

    /// Sets whether to create the dirfile directory if missing.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.access_mode, AccessMode::ReadOnly);
        assert_eq!(config.max_recursion, DEFAULT_MAX_RECURSION);
        assert_eq!(config.frame_offset, 0);
        assert!(!config.create_dirs);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .read_write()
            .max_recursion(4)
            .frame_offset(10);

        assert!(config.access_mode.is_writable());
        assert_eq!(config.max_recursion, 4);
        assert_eq!(config.frame_offset, 10);
    }
}
