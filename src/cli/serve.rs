use std::path::PathBuf;

use clap::Args;

use super::CommandError;
use crate::{
    config::{
        CONFIG,
        Config,
    },
    server,
    storage::profile::UploadProfile,
};

/// Run the upload server
#[derive(Args, Debug)]
pub struct Command {
    /// Address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Directory to store uploads in
    #[arg(long, short, value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Which audio types to accept
    #[arg(long, value_enum)]
    pub profile: Option<UploadProfile>,

    /// Upload ceiling in bytes
    #[arg(long, value_name = "BYTES")]
    pub max_upload_size: Option<u64>,
}

impl Command {
    pub async fn run(&self) -> Result<(), CommandError> {
        let config = self.apply(CONFIG.clone());
        Ok(server::core::serve(&config).await?)
    }

    /// Layers flags over the loaded config
    fn apply(&self, mut config: Config) -> Config {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = &self.storage_dir {
            config.storage_dir = dir.clone();
        }
        if let Some(profile) = self.profile {
            config.upload_profile = profile;
        }
        if let Some(size) = self.max_upload_size {
            config.max_upload_size = Some(size);
        }
        config
    }
}
