use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::CommandError;
use crate::{
    config::CONFIG,
    storage::Storage,
};

/// List stored audio files
#[derive(Args, Debug)]
pub struct Command {
    /// Directory to list instead of the configured one
    #[arg(long, short, value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,
}

impl Command {
    pub async fn run(&self) -> Result<(), CommandError> {
        let root = self
            .storage_dir
            .clone()
            .unwrap_or_else(|| CONFIG.storage_dir.clone());
        let storage = Storage::new(root);

        let files = storage.list_audio().await?;
        if files.is_empty() {
            info!("No audio files in {:?}", storage.root());
            return Ok(());
        }

        for f in &files {
            println!("{:>12}  {:<5}  {}", f.size_bytes, f.extension(), f.filename);
        }
        Ok(())
    }
}
