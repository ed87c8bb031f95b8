//! Response body for a finished snapshot.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::web::Bytes;
use futures_util::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::orchestrator::PreparedExport;

/// Streams the artifact in fixed-size chunks.
///
/// Owns the [`PreparedExport`]: when the server drops the body, after the
/// last chunk or because the client went away, the artifact is deleted and
/// the permit released.
pub struct ArtifactStream {
    // Declared first so the file handle closes before the artifact is removed.
    reader: ReaderStream<File>,
    export: PreparedExport,
    sent: u64,
    finished: bool,
}

impl ArtifactStream {
    pub(crate) fn new(file: File, chunk_size: usize, export: PreparedExport) -> Self {
        Self {
            reader: ReaderStream::with_capacity(file, chunk_size.max(1)),
            export,
            sent: 0,
            finished: false,
        }
    }

    /// The export being streamed.
    pub fn export(&self) -> &PreparedExport {
        &self.export
    }
}

impl Stream for ArtifactStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.reader).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => this.sent += chunk.len() as u64,
            Poll::Ready(None) => this.finished = true,
            _ => {}
        }
        polled
    }
}

impl Drop for ArtifactStream {
    fn drop(&mut self) {
        if self.finished {
            debug!(
                file = self.export.download_name(),
                bytes = self.sent,
                "export streamed"
            );
        } else {
            debug!(
                file = self.export.download_name(),
                bytes = self.sent,
                size = self.export.size(),
                "export abandoned before completion"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ExportOrchestrator;
    use dbexport_core::{DatabaseHandle, StaticRegistry};
    use dbexport_security::{LinkAuthorizer, Signer};
    use futures_util::StreamExt;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn prepared(dir: &TempDir) -> (ExportOrchestrator, PreparedExport) {
        let source = dir.path().join("data.db");
        rusqlite::Connection::open(&source)
            .unwrap()
            .execute_batch(
                "create table t (x text); insert into t values (hex(randomblob(20000)));",
            )
            .unwrap();
        let registry = StaticRegistry::with_databases([DatabaseHandle::on_disk("data", &source)]);
        let authorizer = LinkAuthorizer::new(Arc::new(Signer::new("secret")), None);
        let orchestrator =
            ExportOrchestrator::new(Arc::new(registry), authorizer, dir.path().join("exports"));
        let token = orchestrator.authorizer().mint("data", "c");
        let export = orchestrator.prepare("data", &token, "c").await.unwrap();
        (orchestrator, export)
    }

    #[tokio::test]
    async fn test_streams_whole_file_in_chunks() {
        let dir = TempDir::new().unwrap();
        let (_orchestrator, export) = prepared(&dir).await;
        let expected = std::fs::read(export.artifact().path()).unwrap();
        let path = export.artifact().path().to_path_buf();

        let mut stream = export.into_stream(4096).await.unwrap();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            assert!(chunk.len() <= 4096);
            body.extend_from_slice(&chunk);
        }
        assert_eq!(body, expected);
        assert!(path.exists());

        drop(stream);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_abandoned_stream_cleans_up() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, export) = prepared(&dir).await;
        let path = export.artifact().path().to_path_buf();
        let before = orchestrator.available_permits();

        let mut stream = export.into_stream(1024).await.unwrap();
        assert!(stream.next().await.is_some());
        drop(stream);

        assert!(!path.exists());
        assert_eq!(orchestrator.available_permits(), before + 1);
    }
}
