pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod render;
pub mod script;
pub mod state;
pub mod storage;
pub use error::{AppError, AppResult};

use std::path::PathBuf;

use config::AppConfig;
use editor::{EditorSession, SessionOptions};
use geometry::CanvasSize;
use script::EditScript;
use storage::{ArtifactStorage, StorageService};

const USAGE: &str = "lens-edit <image> <script.json> [output-dir]";

/// Paths for one headless edit: the source photo, the recorded script and an
/// optional output directory overriding the configured one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub input: PathBuf,
    pub script: PathBuf,
    pub output_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn parse<I, S>(args: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<PathBuf>,
    {
        let mut args = args.into_iter().map(Into::into);
        let (Some(input), Some(script)) = (args.next(), args.next()) else {
            return Err(AppError::Usage(USAGE.to_string()));
        };
        let output_dir = args.next();
        if args.next().is_some() {
            return Err(AppError::Usage(USAGE.to_string()));
        }
        Ok(Self {
            input,
            script,
            output_dir,
        })
    }
}

/// Replays a script over a photo, flattens the result and saves it. Returns the
/// saved path.
pub fn run_with(invocation: &Invocation, config: &AppConfig) -> AppResult<PathBuf> {
    let storage = match &invocation.output_dir {
        Some(dir) => StorageService::with_paths(dir.clone())
            .with_format(config.output_format, config.jpeg_quality()),
        None => StorageService::from_config(config)?,
    };
    run_with_storage(invocation, config, &storage)
}

/// Like [`run_with`], but hands the finalized raster to `storage`.
pub fn run_with_storage(
    invocation: &Invocation,
    config: &AppConfig,
    storage: &dyn ArtifactStorage,
) -> AppResult<PathBuf> {
    let script = EditScript::load(&invocation.script)?;
    let bytes = std::fs::read(&invocation.input)?;
    let options = SessionOptions {
        id: None,
        history_limit: config.history_limit,
    };
    let mut session = EditorSession::from_encoded(&bytes, CanvasSize::default(), options)?;
    let (width, height) = session.image().dimensions();
    session.set_canvas_size(
        script
            .canvas
            .unwrap_or(CanvasSize::new(width as f32, height as f32)),
    );

    let report = script::replay(&mut session, &script)?;
    tracing::debug!(created = ?report.created_ids, "annotations created by script");

    let fonts = config.font_library();
    let artifact = session.finalize(&fonts)?;

    Ok(storage.save_artifact(session.id(), &artifact)?)
}

/// Entrypoint used by the CLI binary.
pub fn run() -> AppResult<()> {
    logging::init();
    tracing::info!("starting lens-edit");

    let invocation = Invocation::parse(std::env::args_os().skip(1))?;
    let config = config::load_app_config();
    let saved = run_with(&invocation, &config)?;

    tracing::info!(path = %saved.display(), "edit complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::render::RasterArtifact;
    use crate::storage::StorageResult;

    #[derive(Default)]
    struct RecordingStorage {
        saved: RefCell<Vec<(String, (u32, u32))>>,
    }

    impl ArtifactStorage for RecordingStorage {
        fn save_artifact(
            &self,
            session_id: &str,
            artifact: &RasterArtifact,
        ) -> StorageResult<PathBuf> {
            self.saved
                .borrow_mut()
                .push((session_id.to_string(), (artifact.width(), artifact.height())));
            Ok(PathBuf::from(format!("{session_id}.png")))
        }

        fn discard_artifact(&self, _session_id: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn invocation_requires_image_and_script() {
        assert!(matches!(
            Invocation::parse(["photo.jpg"]),
            Err(AppError::Usage(_))
        ));
        assert!(matches!(
            Invocation::parse(["a", "b", "c", "d"]),
            Err(AppError::Usage(_))
        ));
    }

    #[test]
    fn invocation_output_dir_is_optional() {
        let invocation = Invocation::parse(["photo.jpg", "edit.json"]).expect("two args parse");
        assert_eq!(invocation.input, PathBuf::from("photo.jpg"));
        assert_eq!(invocation.output_dir, None);

        let invocation =
            Invocation::parse(["photo.jpg", "edit.json", "out"]).expect("three args parse");
        assert_eq!(invocation.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn finalized_raster_is_handed_to_the_storage_under_the_session_id() {
        let dir = std::env::temp_dir().join(format!("lens-run-storage-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir should be created");
        let input = dir.join("photo.png");
        image::RgbaImage::from_pixel(30, 10, image::Rgba([1, 2, 3, 255]))
            .save(&input)
            .expect("input should save");
        let script = dir.join("edit.json");
        std::fs::write(&script, r#"{ "actions": [{ "action": "commit" }] }"#)
            .expect("script should write");

        let storage = RecordingStorage::default();
        let invocation = Invocation {
            input,
            script,
            output_dir: None,
        };
        let saved = run_with_storage(&invocation, &AppConfig::default(), &storage)
            .expect("run should succeed");

        let records = storage.saved.borrow();
        assert_eq!(records.len(), 1);
        let (id, dimensions) = &records[0];
        assert!(id.starts_with("edit-"), "generated id: {id}");
        assert_eq!(*dimensions, (30, 10));
        assert_eq!(saved, PathBuf::from(format!("{id}.png")));
        let _ = std::fs::remove_dir_all(dir);
    }
}
