//! Result lookup and read-back.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::extension::extension_of;

/// Where the worker is expected to write the result for `input`.
///
/// The result keeps the input's stem and extension; only the directory changes.
#[must_use]
pub fn expected_output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}{}", extension_of(input)))
}

/// MIME type inferred from a result path's extension.
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Bytes of a completed result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultArtifact {
    /// Path the bytes were read from.
    pub path: PathBuf,
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type inferred from the extension.
    pub content_type: &'static str,
}

/// Reads worker results back from the output directory.
#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    max_bytes: u64,
}

impl Retriever {
    /// Retriever refusing results larger than `max_bytes`.
    #[must_use]
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Read the result the worker produced for `input`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] when no regular file exists at the expected
    /// path, [`PipelineError::ResultTooLarge`] when it exceeds the limit and
    /// [`PipelineError::Io`] when it cannot be read.
    pub async fn fetch(&self, input: &Path, output_dir: &Path) -> PipelineResult<ResultArtifact> {
        let path = expected_output_path(input, output_dir);
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PipelineError::NotFound { path });
            }
            Err(err) => return Err(PipelineError::io("retrieve.metadata", path, err)),
        };
        if !metadata.is_file() {
            return Err(PipelineError::NotFound { path });
        }
        if metadata.len() > self.max_bytes {
            return Err(PipelineError::ResultTooLarge {
                path,
                size: metadata.len(),
                limit: self.max_bytes,
            });
        }

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PipelineError::NotFound { path });
            }
            Err(err) => return Err(PipelineError::io("retrieve.read", path, err)),
        };
        debug!(path = %path.display(), size = bytes.len(), "result retrieved");
        let content_type = content_type_for(&path);
        Ok(ResultArtifact {
            path,
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[test]
    fn output_path_mirrors_input_name() {
        assert_eq!(
            expected_output_path(Path::new("/tmp/1700.png"), Path::new("/tmp/generated")),
            PathBuf::from("/tmp/generated/1700.png")
        );
        assert_eq!(
            expected_output_path(Path::new("/tmp/1700"), Path::new("/out")),
            PathBuf::from("/out/1700.jpg")
        );
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.tiff")), "image/tiff");
        assert_eq!(content_type_for(Path::new("a.xyz")), "application/octet-stream");
    }

    #[tokio::test]
    async fn fetch_reads_existing_result() -> Result<()> {
        let temp = TempDir::new()?;
        let input = temp.path().join("42.png");
        let output_dir = temp.path().join("generated");
        std::fs::create_dir(&output_dir)?;
        std::fs::write(output_dir.join("42.png"), b"colour")?;

        let artifact = Retriever::new(1024).fetch(&input, &output_dir).await?;
        assert_eq!(artifact.bytes, b"colour");
        assert_eq!(artifact.content_type, "image/png");
        assert_eq!(artifact.path, output_dir.join("42.png"));
        Ok(())
    }

    #[tokio::test]
    async fn fetch_reports_missing_result() -> Result<()> {
        let temp = TempDir::new()?;
        let err = Retriever::new(1024)
            .fetch(&temp.path().join("42.png"), temp.path())
            .await
            .err();
        assert!(matches!(err, Some(PipelineError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn fetch_treats_directory_as_missing() -> Result<()> {
        let temp = TempDir::new()?;
        std::fs::create_dir(temp.path().join("42.png"))?;
        let err = Retriever::new(1024)
            .fetch(Path::new("/staging/42.png"), temp.path())
            .await
            .err();
        assert!(matches!(err, Some(PipelineError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn fetch_refuses_oversized_result() -> Result<()> {
        let temp = TempDir::new()?;
        std::fs::write(temp.path().join("42.jpg"), b"0123456789")?;
        let err = Retriever::new(4)
            .fetch(Path::new("/staging/42.jpg"), temp.path())
            .await
            .err();
        assert!(matches!(
            err,
            Some(PipelineError::ResultTooLarge {
                size: 10,
                limit: 4,
                ..
            })
        ));
        Ok(())
    }
}
