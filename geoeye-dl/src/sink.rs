use std::future::Future;
use std::path::Path;

use tokio::{fs, io, sync::Semaphore};

static MAX_FILE_HANDLES: Semaphore = Semaphore::const_new(100);

/// Byte persistence.
pub trait Sink: Send + Sync {
    /// Fully persist `payload` at `path`.
    fn write(&self, path: &Path, payload: &[u8]) -> impl Future<Output = io::Result<()>> + Send;
}

/// Default sink writing each payload to a brand new local file.
///
/// Files are opened with `create_new`, so an existing file is never overwritten: writing to an
/// already existing path fails with [`io::ErrorKind::AlreadyExists`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSink;

impl Sink for FileSink {
    async fn write(&self, path: &Path, payload: &[u8]) -> io::Result<()> {
        use io::AsyncWriteExt;

        let _permit = MAX_FILE_HANDLES.acquire().await.map_err(io::Error::other)?;

        let file = fs::File::options().write(true).create_new(true).open(path).await?;

        let mut writer = io::BufWriter::new(file);

        writer.write_all(payload).await?;

        writer.shutdown().await?;
        writer.into_inner().sync_all().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_sink_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");

        FileSink.write(&path, b"\x89PNG").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_file_sink_writes_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");

        FileSink.write(&path, &[]).await.unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_file_sink_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");

        FileSink.write(&path, b"first").await.unwrap();
        let err = FileSink.write(&path, b"second").await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_file_sink_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("img.png");

        let err = FileSink.write(&path, b"data").await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
