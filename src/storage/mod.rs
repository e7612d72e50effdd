use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::render::{CompositeError, OutputFormat, RasterArtifact, DEFAULT_JPEG_QUALITY};
use thiserror::Error;

const PICTURES_SUBDIR: &str = "Pictures";
const LENS_SUBDIR: &str = "Lens";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("session id is empty")]
    MissingSessionId,
    #[error("session id {0:?} is not a plain file name")]
    InvalidSessionId(String),
    #[error("failed to encode artifact: {0}")]
    Encode(#[from] CompositeError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Sink for finalized submission rasters.
pub trait ArtifactStorage {
    fn save_artifact(&self, session_id: &str, artifact: &RasterArtifact)
    -> StorageResult<PathBuf>;
    fn discard_artifact(&self, session_id: &str) -> StorageResult<()>;
}

#[derive(Debug, Clone)]
pub struct StorageService {
    output_dir: PathBuf,
    format: OutputFormat,
    jpeg_quality: u8,
}

impl StorageService {
    pub const fn with_paths(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            format: OutputFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_format(mut self, format: OutputFormat, jpeg_quality: u8) -> Self {
        self.format = format;
        self.jpeg_quality = jpeg_quality.clamp(1, 100);
        self
    }

    /// `~/Pictures/Lens`, created if missing.
    pub fn with_default_paths() -> StorageResult<Self> {
        let home = std::env::var("HOME").map_err(|_| StorageError::MissingHomeDirectory)?;
        let mut output_dir = PathBuf::from(home);
        output_dir.push(PICTURES_SUBDIR);
        output_dir.push(LENS_SUBDIR);
        fs::create_dir_all(&output_dir)?;
        Ok(Self::with_paths(output_dir))
    }

    pub fn from_config(config: &AppConfig) -> StorageResult<Self> {
        let service = match &config.output_dir {
            Some(dir) => Self::with_paths(dir.clone()),
            None => Self::with_default_paths()?,
        };
        Ok(service.with_format(config.output_format, config.jpeg_quality()))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn validate_session_id(session_id: &str) -> StorageResult<()> {
        if session_id.is_empty() {
            return Err(StorageError::MissingSessionId);
        }
        let plain = Path::new(session_id)
            .file_name()
            .is_some_and(|name| name == session_id);
        if !plain {
            return Err(StorageError::InvalidSessionId(session_id.to_string()));
        }
        Ok(())
    }

    pub fn allocate_target_path(&self, session_id: &str) -> StorageResult<PathBuf> {
        Self::validate_session_id(session_id)?;
        let mut path = self.output_dir.clone();
        path.push(format!("{session_id}.{}", self.format.extension()));
        Ok(path)
    }

    pub fn save_artifact(
        &self,
        session_id: &str,
        artifact: &RasterArtifact,
    ) -> StorageResult<PathBuf> {
        let target = self.allocate_target_path(session_id)?;
        let bytes = artifact.encode(self.format, self.jpeg_quality)?;
        save_overwrite(&bytes, &target)?;
        tracing::info!(
            path = %target.display(),
            bytes = bytes.len(),
            mime = self.format.mime_type(),
            "artifact saved"
        );
        Ok(target)
    }

    pub fn discard_artifact(&self, session_id: &str) -> StorageResult<()> {
        let path = self.allocate_target_path(session_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

impl ArtifactStorage for StorageService {
    fn save_artifact(
        &self,
        session_id: &str,
        artifact: &RasterArtifact,
    ) -> StorageResult<PathBuf> {
        self.save_artifact(session_id, artifact)
    }

    fn discard_artifact(&self, session_id: &str) -> StorageResult<()> {
        self.discard_artifact(session_id)
    }
}

fn save_overwrite<D: AsRef<Path>>(bytes: &[u8], destination: D) -> StorageResult<()> {
    let destination = destination.as_ref();

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let _ = fs::remove_file(destination);
    fs::write(destination, bytes)?;
    Ok(())
}
