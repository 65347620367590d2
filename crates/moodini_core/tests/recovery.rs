//! Durability: reopen, crash and corruption handling.

use moodini_core::{
    Answer, Config, Controller, CoreError, EntityId, Question, QuestionCommand,
    QuestionRepository, QuestionService, User, UserService,
};
use moodini_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError, StorageResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

type Questions = Controller<QuestionRepository>;

fn open_files(dir: &Path) -> Result<Questions, CoreError> {
    Controller::open_with_backends(
        Config::default(),
        Box::new(FileBackend::open(&dir.join("journal.log")).unwrap()),
        Box::new(FileBackend::open(&dir.join("snapshot.bin")).unwrap()),
    )
}

fn create(controller: &Questions, text: &str) {
    controller
        .command(QuestionCommand::Create(Question::new(text)))
        .unwrap();
}

fn texts(controller: &Questions) -> Vec<String> {
    controller
        .query(|repo| repo.questions().into_iter().map(|q| q.text).collect())
        .unwrap()
}

#[test]
fn service_state_survives_restart() {
    let temp = tempdir().unwrap();
    let (q1, q2);
    {
        let service = QuestionService::open(temp.path(), Config::default()).unwrap();
        q1 = service.create(Question::new("Q1")).unwrap();
        q2 = service.create(Question::new("Q2")).unwrap();
        service.create(Question::new("Q3")).unwrap();
        service.vote(q1.id.unwrap(), Answer::Amped).unwrap();
        service.vote(q1.id.unwrap(), Answer::Amped).unwrap();
        service.delete(EntityId::new(3)).unwrap();
        service.close().unwrap();
    }

    let service = QuestionService::open(temp.path(), Config::default()).unwrap();
    assert_eq!(service.list().unwrap(), vec![q1.clone(), q2]);
    assert_eq!(
        service.votes(q1.id.unwrap()).unwrap().get(&Answer::Amped),
        Some(&2)
    );
    let q4 = service.create(Question::new("Q4")).unwrap();
    assert_eq!(q4.id, Some(EntityId::new(4)));
}

#[test]
fn collections_live_in_separate_directories() {
    let temp = tempdir().unwrap();
    {
        let questions = QuestionService::open(temp.path(), Config::default()).unwrap();
        let users = UserService::open(temp.path(), Config::default()).unwrap();
        questions.create(Question::new("Q")).unwrap();
        users
            .create(User::new("Ada", "Lovelace", "ada@example.org"))
            .unwrap();
    }
    assert!(temp.path().join("questions").join("snapshot.bin").exists());
    assert!(temp.path().join("users").join("snapshot.bin").exists());

    let users = UserService::open(temp.path(), Config::default()).unwrap();
    assert_eq!(users.list().unwrap().len(), 1);
}

#[test]
fn second_open_of_same_store_is_locked() {
    let temp = tempdir().unwrap();
    let _first = QuestionService::open(temp.path(), Config::default()).unwrap();
    let second = Controller::<QuestionRepository>::open(temp.path(), Config::default());
    assert!(matches!(second, Err(CoreError::DirectoryLocked)));
}

#[test]
fn missing_directory_without_create_fails() {
    let temp = tempdir().unwrap();
    let result = Controller::<QuestionRepository>::open(
        &temp.path().join("absent"),
        Config::default().create_if_missing(false),
    );
    assert!(matches!(result, Err(CoreError::InvalidDirectory { .. })));
}

#[test]
fn crash_without_close_replays_journal() {
    let temp = tempdir().unwrap();
    {
        let controller = open_files(temp.path());
        let controller = controller.unwrap();
        create(&controller, "a");
        create(&controller, "b");
        controller
            .command(QuestionCommand::Delete(EntityId::new(2)))
            .unwrap();
        std::mem::forget(controller);
    }

    let controller = open_files(temp.path()).unwrap();
    assert_eq!(texts(&controller), vec!["a"]);
    create(&controller, "c");
    assert_eq!(
        controller.query(|repo| repo.last_id()).unwrap(),
        3,
        "deleted id 2 must not be reissued"
    );
}

#[test]
fn crash_after_checkpoint_combines_snapshot_and_journal() {
    let temp = tempdir().unwrap();
    {
        let controller = open_files(temp.path()).unwrap();
        create(&controller, "before");
        controller.checkpoint().unwrap();
        create(&controller, "after");
        std::mem::forget(controller);
    }

    let controller = open_files(temp.path()).unwrap();
    assert_eq!(texts(&controller), vec!["before", "after"]);
    assert_eq!(controller.last_sequence().as_u64(), 2);
}

#[test]
fn torn_tail_is_discarded_and_journal_stays_usable() {
    let temp = tempdir().unwrap();
    {
        let controller = open_files(temp.path()).unwrap();
        create(&controller, "intact");
        std::mem::forget(controller);
    }
    {
        let mut journal = OpenOptions::new()
            .append(true)
            .open(temp.path().join("journal.log"))
            .unwrap();
        journal.write_all(b"MJRN\x01\x00\x01\xff\x00").unwrap();
    }

    {
        let controller = open_files(temp.path()).unwrap();
        assert_eq!(texts(&controller), vec!["intact"]);
        create(&controller, "later");
        std::mem::forget(controller);
    }

    let controller = open_files(temp.path()).unwrap();
    assert_eq!(texts(&controller), vec!["intact", "later"]);
}

#[test]
fn flipped_journal_byte_refuses_to_open() {
    let temp = tempdir().unwrap();
    {
        let controller = open_files(temp.path()).unwrap();
        create(&controller, "precious");
        std::mem::forget(controller);
    }
    let path = temp.path().join("journal.log");
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 6;
    bytes[last] ^= 0x55;
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(
        open_files(temp.path()),
        Err(CoreError::ChecksumMismatch { .. })
    ));
}

#[test]
fn corrupted_snapshot_refuses_to_open() {
    let journal = InMemoryBackend::new();
    let snapshot = InMemoryBackend::new();
    {
        let controller: Questions = Controller::open_with_backends(
            Config::default(),
            Box::new(journal.clone()),
            Box::new(snapshot.clone()),
        )
        .unwrap();
        create(&controller, "q");
        controller.close().unwrap();
    }
    let data = snapshot.data();
    snapshot.corrupt_byte(20, data[20] ^ 0xFF);

    let result: Result<Questions, _> = Controller::open_with_backends(
        Config::default(),
        Box::new(journal.clone()),
        Box::new(snapshot.clone()),
    );
    assert!(matches!(
        result,
        Err(CoreError::ChecksumMismatch { .. } | CoreError::SnapshotCorruption { .. })
    ));
}

/// Journal backend whose appends can be made to fail.
///
/// A failing append raises `entered` and then waits a moment before
/// returning, so other threads can queue up behind the command.
#[derive(Clone, Default)]
struct FlakyBackend {
    inner: InMemoryBackend,
    failing: Arc<AtomicBool>,
    entered: Arc<AtomicBool>,
}

impl StorageBackend for FlakyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if self.failing.load(Ordering::SeqCst) {
            self.entered.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(200));
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.replace(data)
    }
}

#[test]
fn journal_failure_poisons_controller() {
    let journal = FlakyBackend::default();
    let controller: Questions = Controller::open_with_backends(
        Config::default(),
        Box::new(journal.clone()),
        Box::new(InMemoryBackend::new()),
    )
    .unwrap();
    create(&controller, "ok");

    journal.failing.store(true, Ordering::SeqCst);
    let err = controller
        .command(QuestionCommand::Create(Question::new("lost")))
        .unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));

    journal.failing.store(false, Ordering::SeqCst);
    assert!(matches!(
        controller.query(|repo| repo.len()),
        Err(CoreError::ControllerPoisoned { .. })
    ));
    assert!(matches!(
        controller.command(QuestionCommand::Create(Question::new("again"))),
        Err(CoreError::ControllerPoisoned { .. })
    ));
    assert!(!controller.is_open());
    assert!(matches!(
        controller.close(),
        Err(CoreError::ControllerPoisoned { .. })
    ));
    assert!(matches!(
        controller.query(|repo| repo.len()),
        Err(CoreError::ControllerClosed)
    ));
}

#[test]
fn poisoned_service_errors_are_fatal() {
    let journal = FlakyBackend::default();
    let controller = Controller::open_with_backends(
        Config::default(),
        Box::new(journal.clone()),
        Box::new(InMemoryBackend::new()),
    )
    .unwrap();
    let service = QuestionService::new(controller);
    journal.failing.store(true, Ordering::SeqCst);
    let err = service.create(Question::new("q")).unwrap_err();
    assert!(err.is_fatal());
    assert!(service.list().unwrap_err().is_fatal());
}

#[test]
fn query_waiting_on_failed_command_sees_poisoning() {
    let journal = FlakyBackend::default();
    let controller: Questions = Controller::open_with_backends(
        Config::default(),
        Box::new(journal.clone()),
        Box::new(InMemoryBackend::new()),
    )
    .unwrap();
    create(&controller, "ok");
    journal.failing.store(true, Ordering::SeqCst);

    thread::scope(|scope| {
        let writer = scope.spawn(|| {
            controller.command(QuestionCommand::Create(Question::new("lost")))
        });
        while !journal.entered.load(Ordering::SeqCst) {
            thread::yield_now();
        }

        let seen = controller.query(|repo| {
            repo.questions().into_iter().map(|q| q.text).collect::<Vec<_>>()
        });
        assert!(
            matches!(seen, Err(CoreError::ControllerPoisoned { .. })),
            "query saw {seen:?}"
        );
        assert!(writer.join().unwrap().is_err());
    });
}

#[test]
fn failed_automatic_checkpoint_keeps_command() {
    let snapshot = FlakyBackend::default();
    let controller: Questions = Controller::open_with_backends(
        Config::default().checkpoint_every(2),
        Box::new(InMemoryBackend::new()),
        Box::new(snapshot.clone()),
    )
    .unwrap();

    snapshot.failing.store(true, Ordering::SeqCst);
    create(&controller, "Q1");
    create(&controller, "Q2");
    create(&controller, "Q3");
    assert!(controller.is_open());
    assert_eq!(controller.stats().unwrap().commands_since_checkpoint, 3);
    assert_eq!(texts(&controller), vec!["Q1", "Q2", "Q3"]);

    snapshot.failing.store(false, Ordering::SeqCst);
    create(&controller, "Q4");
    assert_eq!(controller.stats().unwrap().commands_since_checkpoint, 0);
}
