use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::multipart::Multipart;
use crate::part::{FilePart, SharedFields};
use crate::MultipartError;

static TEMP_NAME_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A file part that has been written to temporary storage.
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub name: String,
    pub filename: Option<String>,
    pub encoding: String,
    pub mimetype: String,
    pub truncated: bool,
    pub fields: SharedFields,
    pub filepath: PathBuf,
}

struct UploadState {
    multipart: Multipart,
    temp_files: Vec<PathBuf>,
    saved: Option<Result<Arc<Vec<SavedFile>>, MultipartError>>,
}

/// Drains a request's file parts to uniquely named temporary files and owns
/// their lifetime until cleanup.
///
/// The host wires its single guaranteed request-completion hook, covering
/// both success and failure outcomes, to [`clean_request_files`](Self::clean_request_files);
/// a `Drop` fallback removes anything still recorded so no temp file survives
/// the request even when the hook never ran.
pub struct UploadManager {
    state: Mutex<UploadState>,
    tmpdir: PathBuf,
}

impl UploadManager {
    pub fn new(multipart: Multipart) -> Self {
        Self::with_tmpdir(multipart, std::env::temp_dir())
    }

    pub fn with_tmpdir(multipart: Multipart, tmpdir: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(UploadState {
                multipart,
                temp_files: Vec::new(),
                saved: None,
            }),
            tmpdir: tmpdir.into(),
        }
    }

    /// Streams every file part to disk and returns the saved set.
    ///
    /// The first invocation drains the request's files; later invocations
    /// return the cached result without re-draining, and concurrent
    /// invocations queue on the single pending drain instead of starting a
    /// second one. A per-file I/O failure removes the partial file and moves
    /// on to the remaining files; limit and transport failures end the batch.
    pub async fn save_request_files(&self) -> Result<Arc<Vec<SavedFile>>, MultipartError> {
        let mut state = self.state.lock().await;
        if let Some(result) = &state.saved {
            return result.clone();
        }
        let result = drain_to_disk(&mut state, &self.tmpdir).await;
        state.saved = Some(result.clone());
        result
    }

    /// Removes every temp file recorded for this request.
    ///
    /// Effectively once: repeat calls are no-ops. Missing files are
    /// tolerated and removal failures are logged, never returned, so cleanup
    /// cannot mask the handler's real outcome.
    pub async fn clean_request_files(&self) {
        let mut state = self.state.lock().await;
        for path in state.temp_files.drain(..) {
            #[cfg(feature = "metrics")]
            crate::metrics::TEMP_FILES_LIVE.dec();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("removed temp file {:?}", path),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!("failed to remove temp file {:?}: {}", path, err),
            }
        }
    }
}

impl Drop for UploadManager {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_lock() {
            for path in state.temp_files.drain(..) {
                let _ = std::fs::remove_file(&path);
            }
        }
    }
}

async fn drain_to_disk(
    state: &mut UploadState,
    tmpdir: &Path,
) -> Result<Arc<Vec<SavedFile>>, MultipartError> {
    let UploadState {
        multipart,
        temp_files,
        ..
    } = state;
    let mut files = multipart.files()?;
    let mut saved = Vec::new();
    while let Some(mut file) = files.next().await? {
        let path = unique_path(tmpdir, file.filename.as_deref());
        match write_to_disk(&mut file, &path).await {
            Ok(()) => {
                temp_files.push(path.clone());
                #[cfg(feature = "metrics")]
                {
                    crate::metrics::FILES_PERSISTED.inc();
                    crate::metrics::TEMP_FILES_LIVE.inc();
                }
                saved.push(SavedFile {
                    name: file.name.clone(),
                    filename: file.filename.clone(),
                    encoding: file.encoding.clone(),
                    mimetype: file.mimetype.clone(),
                    truncated: file.truncated(),
                    fields: file.fields.clone(),
                    filepath: path,
                });
            }
            Err(MultipartError::Io(err)) => {
                warn!("failed to persist file {:?}: {}", file.filename, err);
                remove_quietly(&path).await;
            }
            Err(err) => {
                remove_quietly(&path).await;
                return Err(err);
            }
        }
    }
    Ok(Arc::new(saved))
}

async fn write_to_disk(file: &mut FilePart, path: &Path) -> Result<(), MultipartError> {
    let mut out = tokio::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .await?;
    while let Some(chunk) = file.next_chunk().await {
        out.write_all(&chunk?).await?;
    }
    out.flush().await?;
    Ok(())
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!("failed to remove partial file {:?}: {}", path, err),
    }
}

/// Collision-resistant temp path: process id, wall-clock nanos and an atomic
/// counter, keeping the upload's original extension so downstream tooling can
/// sniff the type from the name.
fn unique_path(tmpdir: &Path, filename: Option<&str>) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let counter = TEMP_NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = format!("formstream-upload-{}-{nanos}-{counter}", std::process::id());
    if let Some(ext) = filename
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
    {
        name.push('.');
        name.push_str(ext);
    }
    tmpdir.join(name)
}
