//! The prevalent controller.
//!
//! A [`Controller`] owns one in-memory state machine and makes it durable.
//! Reads run concurrently under a shared lock. Writes are serialized
//! commands: each one is executed, appended to the journal and flushed
//! while the state is still exclusively locked, so no reader ever sees a
//! change that is not on disk yet.
//!
//! ## Recovery
//!
//! Opening a controller loads the latest snapshot and replays every
//! journaled command with a higher commit sequence. A command that fails
//! during replay means the journal and snapshot disagree, and the open
//! fails with [`CoreError::JournalCorruption`].
//!
//! ## Lifecycle
//!
//! `Open → Closed` is terminal. A journal write failure moves the
//! controller to a poisoned state from which every call fails.

use crate::codec::{from_cbor, to_cbor};
use crate::config::Config;
use crate::error::{CoreError, CoreResult, RepositoryError};
use crate::journal::{Journal, JournalRecord};
use crate::snapshot::SnapshotStore;
use crate::types::CommitSeq;
use moodini_storage::{InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

#[cfg(feature = "std")]
use crate::dir::StoreDir;
#[cfg(feature = "std")]
use std::path::Path;

/// A state machine that a [`Controller`] can persist.
///
/// `execute` must be deterministic: replaying the same commands on the
/// same starting state must produce the same state. It must also leave the
/// state untouched when it returns an error, because rejected commands are
/// not journaled.
pub trait Prevalent: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the data directory below the controller root.
    const NAME: &'static str;

    /// Serializable mutation.
    type Command: Serialize + DeserializeOwned + fmt::Debug + Send + Sync;

    /// Value handed back to the caller of a successful command.
    type Output;

    /// Applies `command`.
    fn execute(&mut self, command: &Self::Command) -> Result<Self::Output, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lifecycle {
    Open,
    Closed,
    Poisoned(String),
}

struct Writer {
    journal: Journal,
    snapshots: SnapshotStore,
    last_seq: CommitSeq,
    since_checkpoint: u64,
}

/// Point-in-time counters of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStats {
    /// Sequence of the last applied command.
    pub last_sequence: CommitSeq,
    /// Commands journaled since the last snapshot.
    pub commands_since_checkpoint: u64,
    /// Current journal size in bytes.
    pub journal_bytes: u64,
}

/// Single-writer, multi-reader owner of a prevalent state.
pub struct Controller<S: Prevalent> {
    config: Config,
    state: RwLock<S>,
    writer: Mutex<Writer>,
    lifecycle: RwLock<Lifecycle>,
    #[cfg(feature = "std")]
    _dir: Option<StoreDir>,
}

impl<S: Prevalent> Controller<S> {
    /// Opens the controller stored in `<root>/<S::NAME>/`.
    ///
    /// The directory is locked for the lifetime of the controller.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DirectoryLocked`] if another controller holds it
    /// - [`CoreError::JournalCorruption`], [`CoreError::SnapshotCorruption`]
    ///   or [`CoreError::ChecksumMismatch`] if recovery fails
    #[cfg(feature = "std")]
    pub fn open(root: &Path, config: Config) -> CoreResult<Self> {
        use moodini_storage::FileBackend;

        let dir = StoreDir::open(&root.join(S::NAME), config.create_if_missing)?;
        let journal = FileBackend::open(&dir.journal_path())?;
        let snapshot = FileBackend::open(&dir.snapshot_path())?;
        info!(store = S::NAME, path = %dir.path().display(), "opening controller");

        let mut controller = Self::open_with_backends(config, Box::new(journal), Box::new(snapshot))?;
        controller._dir = Some(dir);
        Ok(controller)
    }

    /// Opens a controller over the given journal and snapshot backends.
    pub fn open_with_backends(
        config: Config,
        journal_backend: Box<dyn StorageBackend>,
        snapshot_backend: Box<dyn StorageBackend>,
    ) -> CoreResult<Self> {
        let mut journal = Journal::new(journal_backend, config.sync_on_commit);
        let snapshots = SnapshotStore::new(snapshot_backend);
        let (state, last_seq, replayed) = Self::recover(&mut journal, &snapshots)?;

        info!(
            store = S::NAME,
            last_sequence = last_seq.as_u64(),
            replayed,
            "controller recovered"
        );

        Ok(Self {
            config,
            state: RwLock::new(state),
            writer: Mutex::new(Writer {
                journal,
                snapshots,
                last_seq,
                since_checkpoint: replayed,
            }),
            lifecycle: RwLock::new(Lifecycle::Open),
            #[cfg(feature = "std")]
            _dir: None,
        })
    }

    /// Opens a fresh, non-persistent controller.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backends(
            Config::default(),
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
        )
    }

    /// Rebuilds the state from the snapshot and the journal.
    ///
    /// Returns (state, last sequence, commands replayed).
    fn recover(journal: &mut Journal, snapshots: &SnapshotStore) -> CoreResult<(S, CommitSeq, u64)> {
        let (mut state, base) = match snapshots.read::<S>()? {
            Some((info, state)) => (state, info.sequence),
            None => (S::default(), CommitSeq::default()),
        };

        let mut last = base;
        let mut replayed = 0u64;
        let (valid_end, torn) = {
            let mut records = journal.iter()?;
            for item in records.by_ref() {
                let (offset, record) = item?;
                match record {
                    JournalRecord::Checkpoint { sequence } => {
                        if sequence > base {
                            return Err(CoreError::journal_corruption(format!(
                                "journal continues from {sequence} but snapshot covers {base}"
                            )));
                        }
                    }
                    JournalRecord::Command { sequence, payload } => {
                        if sequence <= base {
                            continue;
                        }
                        if sequence != last.next() {
                            return Err(CoreError::journal_corruption(format!(
                                "expected {} at offset {offset}, found {sequence}",
                                last.next()
                            )));
                        }
                        let command: S::Command = from_cbor(&payload).map_err(|e| {
                            CoreError::journal_corruption(format!(
                                "command {sequence} does not decode: {e}"
                            ))
                        })?;
                        state.execute(&command).map_err(|e| {
                            CoreError::journal_corruption(format!(
                                "command {sequence} failed on replay: {e}"
                            ))
                        })?;
                        last = sequence;
                        replayed += 1;
                    }
                }
            }
            (records.valid_end(), records.hit_truncated_tail())
        };

        if torn {
            warn!(
                store = S::NAME,
                offset = valid_end,
                "discarding incomplete journal record"
            );
            journal.truncate_to(valid_end)?;
        }

        Ok((state, last, replayed))
    }

    /// Runs a read-only function against the current state.
    ///
    /// Many queries may run at once; none of them observes a command half
    /// way through. The lifecycle is checked under the state lock, so a
    /// query queued behind a command whose journal append failed sees the
    /// poisoning instead of the unjournaled state.
    pub fn query<R>(&self, f: impl FnOnce(&S) -> R) -> CoreResult<R> {
        let state = self.state.read();
        self.ensure_open()?;
        Ok(f(&state))
    }

    /// Applies a command and journals it.
    ///
    /// When this returns `Ok`, the command is in the journal. When the
    /// state machine rejects the command the error is
    /// [`CoreError::Rejected`] and neither the state nor the journal
    /// changed.
    pub fn command(&self, command: S::Command) -> CoreResult<S::Output> {
        let mut writer = self.writer.lock();
        self.ensure_open()?;

        let payload = to_cbor(&command)?;
        let mut state = self.state.write();
        let output = state.execute(&command)?;

        let sequence = writer.last_seq.next();
        let record = JournalRecord::Command { sequence, payload };
        if let Err(e) = writer.journal.append(&record) {
            error!(store = S::NAME, %sequence, error = %e, "journal append failed");
            *self.lifecycle.write() = Lifecycle::Poisoned(e.to_string());
            return Err(e);
        }
        writer.last_seq = sequence;
        writer.since_checkpoint += 1;
        debug!(store = S::NAME, %sequence, ?command, "command applied");

        let every = self.config.checkpoint_every;
        if every > 0 && writer.since_checkpoint >= every {
            let state = RwLockWriteGuard::downgrade(state);
            if let Err(e) = Self::checkpoint_locked(&mut writer, &state) {
                warn!(store = S::NAME, error = %e, "automatic checkpoint failed");
            }
        }

        Ok(output)
    }

    /// Writes a snapshot of the current state and clears the journal.
    pub fn checkpoint(&self) -> CoreResult<()> {
        let mut writer = self.writer.lock();
        self.ensure_open()?;
        let state = self.state.read();
        Self::checkpoint_locked(&mut writer, &state)
    }

    fn checkpoint_locked(writer: &mut Writer, state: &S) -> CoreResult<()> {
        let sequence = writer.last_seq;
        let info = writer.snapshots.write(sequence, state)?;
        writer.journal.clear()?;
        writer.journal.append(&JournalRecord::Checkpoint { sequence })?;
        writer.since_checkpoint = 0;
        info!(
            store = S::NAME,
            %sequence,
            bytes = info.state_len,
            "checkpoint written"
        );
        Ok(())
    }

    /// Checkpoints and closes the controller.
    ///
    /// Closing twice is a no-op. A poisoned controller is closed without a
    /// checkpoint and the poisoning error is returned.
    pub fn close(&self) -> CoreResult<()> {
        let mut writer = self.writer.lock();
        let current = self.lifecycle.read().clone();
        match current {
            Lifecycle::Closed => return Ok(()),
            Lifecycle::Poisoned(message) => {
                *self.lifecycle.write() = Lifecycle::Closed;
                return Err(CoreError::ControllerPoisoned { message });
            }
            Lifecycle::Open => {}
        }

        {
            let state = self.state.read();
            Self::checkpoint_locked(&mut writer, &state)?;
        }
        writer.journal.flush()?;
        *self.lifecycle.write() = Lifecycle::Closed;
        info!(store = S::NAME, sequence = %writer.last_seq, "controller closed");
        Ok(())
    }

    /// Whether the controller accepts calls.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.lifecycle.read() == Lifecycle::Open
    }

    /// Sequence of the last applied command.
    #[must_use]
    pub fn last_sequence(&self) -> CommitSeq {
        self.writer.lock().last_seq
    }

    /// Current counters.
    pub fn stats(&self) -> CoreResult<ControllerStats> {
        let writer = self.writer.lock();
        Ok(ControllerStats {
            last_sequence: writer.last_seq,
            commands_since_checkpoint: writer.since_checkpoint,
            journal_bytes: writer.journal.size()?,
        })
    }

    /// Returns the configuration the controller was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn ensure_open(&self) -> CoreResult<()> {
        match &*self.lifecycle.read() {
            Lifecycle::Open => Ok(()),
            Lifecycle::Closed => Err(CoreError::ControllerClosed),
            Lifecycle::Poisoned(message) => Err(CoreError::ControllerPoisoned {
                message: message.clone(),
            }),
        }
    }
}

impl<S: Prevalent> fmt::Debug for Controller<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("store", &S::NAME)
            .field("lifecycle", &*self.lifecycle.read())
            .finish_non_exhaustive()
    }
}

impl<S: Prevalent> Drop for Controller<S> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// Minimal state machine: a list of numbers that rejects duplicates.
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Numbers {
        values: Vec<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    enum NumberCommand {
        Push(i64),
    }

    impl Prevalent for Numbers {
        const NAME: &'static str = "numbers";
        type Command = NumberCommand;
        type Output = usize;

        fn execute(&mut self, command: &NumberCommand) -> Result<usize, RepositoryError> {
            let NumberCommand::Push(value) = command;
            if self.values.contains(value) {
                return Err(RepositoryError::not_found("numbers", crate::EntityId::new(*value)));
            }
            self.values.push(*value);
            Ok(self.values.len())
        }
    }

    fn open_shared(
        journal: &InMemoryBackend,
        snapshot: &InMemoryBackend,
        config: Config,
    ) -> CoreResult<Controller<Numbers>> {
        Controller::open_with_backends(config, Box::new(journal.clone()), Box::new(snapshot.clone()))
    }

    #[test]
    fn command_then_query() {
        let controller = Controller::<Numbers>::open_in_memory().unwrap();
        assert_eq!(controller.command(NumberCommand::Push(4)).unwrap(), 1);
        assert_eq!(controller.command(NumberCommand::Push(9)).unwrap(), 2);
        let values = controller.query(|s| s.values.clone()).unwrap();
        assert_eq!(values, vec![4, 9]);
        assert_eq!(controller.last_sequence(), CommitSeq::new(2));
    }

    #[test]
    fn rejected_command_is_not_journaled() {
        let journal = InMemoryBackend::new();
        let snapshot = InMemoryBackend::new();
        let controller = open_shared(&journal, &snapshot, Config::default()).unwrap();
        controller.command(NumberCommand::Push(1)).unwrap();
        let before = journal.data();

        let err = controller.command(NumberCommand::Push(1)).unwrap_err();
        assert!(err.as_rejection().is_some());
        assert_eq!(journal.data(), before);
        assert_eq!(controller.last_sequence(), CommitSeq::new(1));
    }

    #[test]
    fn reopen_replays_journal() {
        let journal = InMemoryBackend::new();
        let snapshot = InMemoryBackend::new();
        {
            let controller = open_shared(&journal, &snapshot, Config::default()).unwrap();
            controller.command(NumberCommand::Push(1)).unwrap();
            controller.command(NumberCommand::Push(2)).unwrap();
            std::mem::forget(controller);
        }
        assert!(snapshot.data().is_empty());

        let controller = open_shared(&journal, &snapshot, Config::default()).unwrap();
        assert_eq!(controller.query(|s| s.values.clone()).unwrap(), vec![1, 2]);
        assert_eq!(controller.stats().unwrap().commands_since_checkpoint, 2);
        controller.command(NumberCommand::Push(3)).unwrap();
        assert_eq!(controller.last_sequence(), CommitSeq::new(3));
    }

    #[test]
    fn close_checkpoints_and_clears_journal() {
        let journal = InMemoryBackend::new();
        let snapshot = InMemoryBackend::new();
        let controller = open_shared(&journal, &snapshot, Config::default()).unwrap();
        controller.command(NumberCommand::Push(7)).unwrap();
        controller.close().unwrap();
        assert!(!controller.is_open());
        assert!(!snapshot.data().is_empty());

        let reopened = open_shared(&journal, &snapshot, Config::default()).unwrap();
        assert_eq!(reopened.query(|s| s.values.clone()).unwrap(), vec![7]);
        assert_eq!(reopened.last_sequence(), CommitSeq::new(1));
        assert_eq!(reopened.stats().unwrap().commands_since_checkpoint, 0);
    }

    #[test]
    fn closed_controller_rejects_calls() {
        let controller = Controller::<Numbers>::open_in_memory().unwrap();
        controller.close().unwrap();
        controller.close().unwrap();
        assert!(matches!(
            controller.command(NumberCommand::Push(1)),
            Err(CoreError::ControllerClosed)
        ));
        assert!(matches!(
            controller.query(|s| s.values.len()),
            Err(CoreError::ControllerClosed)
        ));
        assert!(matches!(
            controller.checkpoint(),
            Err(CoreError::ControllerClosed)
        ));
    }

    #[test]
    fn automatic_checkpoint() {
        let journal = InMemoryBackend::new();
        let snapshot = InMemoryBackend::new();
        let config = Config::default().checkpoint_every(2);
        let controller = open_shared(&journal, &snapshot, config.clone()).unwrap();
        controller.command(NumberCommand::Push(1)).unwrap();
        assert!(snapshot.data().is_empty());
        controller.command(NumberCommand::Push(2)).unwrap();
        assert!(!snapshot.data().is_empty());
        controller.command(NumberCommand::Push(3)).unwrap();
        assert_eq!(controller.stats().unwrap().commands_since_checkpoint, 1);
        std::mem::forget(controller);

        let reopened = open_shared(&journal, &snapshot, config).unwrap();
        assert_eq!(reopened.query(|s| s.values.clone()).unwrap(), vec![1, 2, 3]);
        assert_eq!(reopened.last_sequence(), CommitSeq::new(3));
    }

    #[test]
    fn journal_newer_than_snapshot_is_corruption() {
        let journal = InMemoryBackend::new();
        let snapshot = InMemoryBackend::new();
        let controller = open_shared(&journal, &snapshot, Config::default()).unwrap();
        controller.command(NumberCommand::Push(1)).unwrap();
        controller.checkpoint().unwrap();
        std::mem::forget(controller);

        let mut lost = snapshot.clone();
        lost.truncate(0).unwrap();
        let result = open_shared(&journal, &snapshot, Config::default());
        assert!(matches!(result, Err(CoreError::JournalCorruption { .. })));
    }

    #[test]
    fn replay_failure_is_corruption() {
        let journal = InMemoryBackend::new();
        let snapshot = InMemoryBackend::new();
        let mut raw = Journal::new(Box::new(journal.clone()), false);
        for seq in 1..=2 {
            raw.append(&JournalRecord::Command {
                sequence: CommitSeq::new(seq),
                payload: to_cbor(&NumberCommand::Push(5)).unwrap(),
            })
            .unwrap();
        }
        let result = open_shared(&journal, &snapshot, Config::default());
        assert!(matches!(result, Err(CoreError::JournalCorruption { .. })));
    }
}
