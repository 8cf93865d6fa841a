//! Common helpers for end-to-end tests.

use std::io::Write;

use tempfile::NamedTempFile;

use crate::auth::{AccessTokenError, AccessTokenIssuer, IdentityStore, RequestMetadata};
use crate::config::IssuerConfig;
use crate::testing::{CountingSigner, SimulatedTimeSource, init_tracing};

/// Target URI used by the end-to-end scenarios.
pub const TARGET_URI: &str = "http://example.com/my_test_service";

/// An issuer on a simulated clock with a counting signer.
pub struct TestIssuer {
    pub issuer: AccessTokenIssuer<CountingSigner, SimulatedTimeSource>,
    pub signer: CountingSigner,
    pub time: SimulatedTimeSource,
    runtime: tokio::runtime::Runtime,
}

impl TestIssuer {
    /// Create a test issuer with no identity.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::with_identity(IdentityStore::default())
    }

    /// Create a test issuer with the given identity.
    #[must_use]
    pub fn with_identity(identity: IdentityStore) -> Self {
        init_tracing();

        let signer = CountingSigner::default();
        let time = SimulatedTimeSource::default_start();
        let issuer = AccessTokenIssuer::with_parts(
            identity,
            IssuerConfig::default(),
            signer.clone(),
            time.clone(),
        );

        // Loads only await a single reader; no worker pool needed.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create runtime");

        Self {
            issuer,
            signer,
            time,
            runtime,
        }
    }

    /// Load the identity by streaming `bytes` through the async entry point.
    pub fn load_from_stream_bytes(&mut self, bytes: &[u8]) -> Result<(), AccessTokenError> {
        self.runtime.block_on(self.issuer.load_from_stream(bytes))
    }

    /// Load the identity from a stream over any async reader.
    pub fn load_from_stream<R>(&mut self, reader: R) -> Result<(), AccessTokenError>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        self.runtime.block_on(self.issuer.load_from_stream(reader))
    }

    /// Load the identity by opening `file` with `tokio::fs` and streaming it.
    pub fn load_from_file(&mut self, file: &NamedTempFile) -> Result<(), AccessTokenError> {
        let path = file.path().to_path_buf();
        let Self {
            issuer, runtime, ..
        } = self;
        runtime.block_on(async {
            let file = tokio::fs::File::open(path).await?;
            issuer.load_from_stream(file).await
        })
    }

    /// Flavor of the runtime that drives the async load operations.
    #[must_use]
    pub fn runtime_flavor(&self) -> tokio::runtime::RuntimeFlavor {
        self.runtime.handle().runtime_flavor()
    }

    pub fn metadata(&self, target_uri: &str) -> Result<RequestMetadata, AccessTokenError> {
        self.issuer.get_request_metadata(target_uri)
    }
}

/// Write `value` to a temporary credentials file.
#[must_use]
pub fn write_credentials_file(value: &serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    serde_json::to_writer_pretty(&mut file, value).expect("Failed to write credentials");
    file.flush().expect("Failed to flush credentials");
    file
}

/// Async reader that fails on every read.
pub struct FailingStream;

impl tokio::io::AsyncRead for FailingStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        _buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "stream reset by peer",
        )))
    }
}
