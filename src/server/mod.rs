pub mod core;
pub mod endpoints;
pub mod error;
pub mod range;

use crate::{
    config::Config,
    storage::{
        Storage,
        profile::UploadProfile,
    },
};

/// Everything the handlers need, passed explicitly through axum's `State`
#[derive(Debug, Clone)]
pub struct AppState {
    pub storage:               Storage,
    pub profile:               UploadProfile,
    /// Upload ceiling in bytes
    pub max_upload_size:       u64,
    /// Ceiling for every other request body
    pub max_form_size:         usize,
    pub trust_forwarded_proto: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            storage:               Storage::new(&config.storage_dir),
            profile:               config.upload_profile,
            max_upload_size:       config.upload_limit(),
            max_form_size:         config.max_form_size,
            trust_forwarded_proto: config.trust_forwarded_proto,
        }
    }
}
