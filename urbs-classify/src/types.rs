//! Model repository resolution.

use eyre::{OptionExt, Result, WrapErr};
use hf_hub::CacheRepo;
use hf_hub::api::sync::{ApiError, ApiRepo};
use std::path::PathBuf;

/// Model repository sources.
#[derive(Debug)]
pub enum ModelRepo {
    /// Local filesystem path
    Path(PathBuf),
    /// HuggingFace cache repository
    Cache(CacheRepo),
    /// HuggingFace API repository
    Api(ApiRepo),
}

impl ModelRepo {
    /// Resolve a file name to its full path in this repository.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        match self {
            ModelRepo::Path(path) => path
                .join(file_name)
                .canonicalize()
                .wrap_err(format!("failed to resolve model file: {file_name}")),
            ModelRepo::Cache(cache_repo) => cache_repo
                .get(file_name)
                .ok_or_eyre(format!("model file not found in cache: {file_name}")),
            ModelRepo::Api(api_repo) => api_repo
                .get(file_name)
                .wrap_err(format!("failed to download from api: {file_name}")),
        }
    }

    /// Try resolving multiple file names, return first successful match.
    pub fn resolve_any(&self, candidates: &[&str]) -> Result<PathBuf> {
        candidates
            .iter()
            .find_map(|name| self.resolve(name).ok())
            .ok_or_eyre("no model found from candidates")
    }

    /// Resolve an optional companion file.
    ///
    /// Returns `Ok(None)` only when the repository definitely lacks the file
    /// (missing on disk, absent from the cache, or a 404 from the hub). Any
    /// other failure, such as a network or permission error, is propagated so
    /// callers never silently fall back to defaults.
    pub fn resolve_optional(&self, file_name: &str) -> Result<Option<PathBuf>> {
        let resolved = match self {
            ModelRepo::Path(path) => {
                let candidate = path.join(file_name);
                let exists = candidate
                    .try_exists()
                    .wrap_err(format!("failed to check model file: {file_name}"))?;
                if exists {
                    Some(self.resolve(file_name)?)
                } else {
                    None
                }
            }
            ModelRepo::Cache(cache_repo) => cache_repo.get(file_name),
            ModelRepo::Api(api_repo) => match api_repo.get(file_name) {
                Ok(path) => Some(path),
                Err(e) if is_not_found(&e) => None,
                Err(e) => {
                    return Err(e).wrap_err(format!("failed to download from api: {file_name}"));
                }
            },
        };

        if resolved.is_none() {
            tracing::debug!(file_name, "optional model file missing");
        }

        Ok(resolved)
    }
}

/// Whether a hub error means the file does not exist in the repository.
fn is_not_found(err: &ApiError) -> bool {
    match err {
        ApiError::RequestError(e) => matches!(**e, ureq::Error::Status(404, _)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_local_files() {
        let dir = std::env::temp_dir().join("urbs_repo_local");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("classifier.onnx"), b"").unwrap();

        let repo = ModelRepo::Path(dir.clone());

        let path = repo
            .resolve_any(&["model.onnx", "classifier.onnx"])
            .unwrap();
        assert!(path.ends_with("classifier.onnx"));

        assert!(repo.resolve("labels.txt").is_err());
        assert!(repo.resolve_optional("labels.txt").unwrap().is_none());

        let found = repo.resolve_optional("classifier.onnx").unwrap();
        assert!(found.is_some_and(|p| p.ends_with("classifier.onnx")));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn only_hub_404_counts_as_missing() {
        let status = |code| {
            let response = ureq::Response::new(code, "status", "").unwrap();
            ApiError::RequestError(Box::new(ureq::Error::Status(code, response)))
        };

        assert!(is_not_found(&status(404)));
        assert!(!is_not_found(&status(401)));
        assert!(!is_not_found(&status(503)));
        assert!(!is_not_found(&ApiError::InvalidResume));

        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        assert!(!is_not_found(&ApiError::IoError(io)));
    }
}
