//! Checkpoint command implementation.

use crate::Store;
use moodini_core::{Config, Controller, CoreResult, Prevalent, QuestionRepository, UserRepository};
use std::path::Path;
use tracing::info;

/// Runs the checkpoint command.
///
/// Each store is opened with its directory lock, so this fails while a
/// server holds the store.
pub fn run(path: &Path, stores: &[Store]) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default().create_if_missing(false);
    for store in stores {
        let sequence = match store {
            Store::Questions => checkpoint::<QuestionRepository>(path, &config)?,
            Store::Users => checkpoint::<UserRepository>(path, &config)?,
        };
        println!("✓ {} checkpointed at seq {sequence}", store.dir_name());
    }
    Ok(())
}

fn checkpoint<S: Prevalent>(root: &Path, config: &Config) -> CoreResult<u64> {
    info!("Checkpointing {:?}", root.join(S::NAME));
    let controller = Controller::<S>::open(root, config.clone())?;
    controller.checkpoint()?;
    let sequence = controller.last_sequence().as_u64();
    controller.close()?;
    Ok(sequence)
}
