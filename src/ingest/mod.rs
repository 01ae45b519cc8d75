//! Image ingestion
//!
//! Turns file bytes into decoded `SourceImage`s. A batch decodes all of its
//! files concurrently on the blocking pool, then hands the results back in
//! the order the files were given, so stack insertion order never depends
//! on which decode finished first. A failed file never produces a partial
//! source; it is reported on its own and the rest of the batch continues.

use std::path::Path;
use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;

use crate::compositor::{ImageFormat, SourceImage};

/// Errors raised while reading or decoding one input file
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{name} contains no image data")]
    EmptyInput { name: String },
    #[error("Decoding {name} was interrupted")]
    Interrupted { name: String },
}

/// One file handed to ingestion
#[derive(Debug, Clone)]
pub struct IngestSource {
    /// File name as the user sees it
    pub name: String,
    pub bytes: Vec<u8>,
    /// Declared mime type, if the caller knows one
    pub mime: Option<String>,
}

impl IngestSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, IngestionError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| IngestionError::Read {
                name: name.clone(),
                source,
            })?;
        Ok(Self::new(name, bytes))
    }
}

/// Decode one file. Blocking; batches run this on the blocking pool.
pub fn decode(input: IngestSource) -> Result<SourceImage, IngestionError> {
    let IngestSource { name, bytes, mime } = input;
    if bytes.is_empty() {
        return Err(IngestionError::EmptyInput { name });
    }

    let pixels = match image::load_from_memory(&bytes) {
        Ok(img) => img.to_rgba8(),
        Err(source) => return Err(IngestionError::Decode { name, source }),
    };
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(IngestionError::EmptyInput { name });
    }

    let format = ImageFormat::resolve(mime.as_deref(), &name);
    tracing::debug!(
        file = %name,
        width = pixels.width(),
        height = pixels.height(),
        format = format.mime(),
        "Decoded image"
    );
    Ok(SourceImage::new(name, format, pixels, bytes))
}

/// Decode a batch concurrently. Results come back in input order.
pub async fn ingest_batch(
    inputs: Vec<IngestSource>,
) -> Vec<Result<Arc<SourceImage>, IngestionError>> {
    decode_in_order(inputs, decode).await
}

/// Run `decoder` for every input on the blocking pool and collect the
/// results by input position, whatever order the tasks finish in
async fn decode_in_order<F>(
    inputs: Vec<IngestSource>,
    decoder: F,
) -> Vec<Result<Arc<SourceImage>, IngestionError>>
where
    F: Fn(IngestSource) -> Result<SourceImage, IngestionError> + Send + Sync + 'static,
{
    let decoder = Arc::new(decoder);
    let tasks = inputs.into_iter().map(|input| {
        let name = input.name.clone();
        let decoder = Arc::clone(&decoder);
        async move {
            match tokio::task::spawn_blocking(move || decoder(input)).await {
                Ok(result) => result.map(Arc::new),
                Err(e) => {
                    tracing::error!(file = %name, "Decode task failed: {}", e);
                    Err(IngestionError::Interrupted { name })
                }
            }
        }
    });

    let results = join_all(tasks).await;
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        tracing::warn!("Skipping file: {}", err);
    }
    results
}

/// Read and decode a list of paths as one batch
pub async fn ingest_paths<P: AsRef<Path>>(
    paths: &[P],
) -> Vec<Result<Arc<SourceImage>, IngestionError>> {
    let mut inputs = Vec::with_capacity(paths.len());
    let mut slots = Vec::with_capacity(paths.len());
    for path in paths {
        match IngestSource::from_path(path).await {
            Ok(input) => {
                slots.push(None);
                inputs.push(input);
            }
            Err(e) => slots.push(Some(e)),
        }
    }

    // Merge read failures back into their original positions
    let mut decoded = ingest_batch(inputs).await.into_iter();
    slots
        .into_iter()
        .map(|slot| match slot {
            Some(err) => {
                tracing::warn!("Skipping file: {}", err);
                Err(err)
            }
            None => decoded.next().unwrap_or_else(|| {
                Err(IngestionError::Interrupted {
                    name: String::new(),
                })
            }),
        })
        .collect()
}
