//! Controller configuration.

/// Configuration for opening a [`crate::Controller`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the data directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the journal after every command (safer but slower).
    ///
    /// When false, commands are still flushed to the OS before returning.
    pub sync_on_commit: bool,

    /// Take a checkpoint after this many commands (0 = only on close).
    ///
    /// A failed automatic checkpoint is not reported to the command that
    /// triggered it: the command is already journaled, so it still
    /// succeeds and the failure is only logged at `warn`. The next
    /// checkpoint retries.
    pub checkpoint_every: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            checkpoint_every: 0,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the data directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync the journal on every command.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the automatic checkpoint interval in commands.
    #[must_use]
    pub const fn checkpoint_every(mut self, commands: u64) -> Self {
        self.checkpoint_every = commands;
        self
    }
}
