//! Configuration types for resolved CLI arguments.
//!
//! Args structs (for CLI parsing) live in cli.rs and the subcommand modules;
//! this module holds the shared Config structs and their TryFrom implementations.

use crate::cli::{ModelArgs, ModelSource};
use eyre::Result;
use hf_hub::Cache;
use hf_hub::api::sync::Api;
use std::path::PathBuf;
use urbs_classify::types::ModelRepo;

/// Resolved model configuration.
///
/// Converted from ModelArgs via TryFrom.
#[derive(Debug)]
pub struct ModelConfig {
    pub repo: ModelRepo,
}

impl TryFrom<ModelArgs> for ModelConfig {
    type Error = eyre::Error;

    fn try_from(args: ModelArgs) -> Result<Self> {
        let repo = match args.model_source {
            ModelSource::Auto => {
                let path = PathBuf::from(&args.model);
                if path.is_dir() {
                    ModelRepo::Path(path)
                } else {
                    tracing::debug!(model = args.model, "no local model directory, using hub");
                    ModelRepo::Api(Api::new()?.model(args.model))
                }
            }
            ModelSource::Path => ModelRepo::Path(PathBuf::from(args.model)),
            ModelSource::Cache => ModelRepo::Cache(Cache::from_env().model(args.model)),
            ModelSource::Api => ModelRepo::Api(Api::new()?.model(args.model)),
        };

        Ok(Self { repo })
    }
}
