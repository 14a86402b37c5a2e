use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::Stream;

use crate::MultipartError;

/// One segment of a multipart body: a plain form field or an uploaded file.
#[derive(Debug)]
pub enum Part {
    Field(FieldPart),
    File(FilePart),
}

impl Part {
    /// Field name from the part's content disposition.
    pub fn name(&self) -> &str {
        match self {
            Part::Field(field) => &field.name,
            Part::File(file) => &file.name,
        }
    }

    /// `"file"` or `"field"`.
    pub fn part_type(&self) -> &'static str {
        match self {
            Part::Field(_) => "field",
            Part::File(_) => "file",
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Part::File(_))
    }

    /// The live map of every part seen so far in this request.
    pub fn fields(&self) -> &SharedFields {
        match self {
            Part::Field(field) => &field.fields,
            Part::File(file) => &file.fields,
        }
    }

    pub fn as_field(&self) -> Option<&FieldPart> {
        match self {
            Part::Field(field) => Some(field),
            Part::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FilePart> {
        match self {
            Part::File(file) => Some(file),
            Part::Field(_) => None,
        }
    }

    pub fn into_field(self) -> Option<FieldPart> {
        match self {
            Part::Field(field) => Some(field),
            Part::File(_) => None,
        }
    }

    pub fn into_file(self) -> Option<FilePart> {
        match self {
            Part::File(file) => Some(file),
            Part::Field(_) => None,
        }
    }
}

/// A completed form field.
#[derive(Debug, Clone)]
pub struct FieldPart {
    pub name: String,
    pub value: String,
    pub name_truncated: bool,
    pub value_truncated: bool,
    pub fields: SharedFields,
}

/// An uploaded file whose bytes arrive through [`FileStream`].
#[derive(Debug)]
pub struct FilePart {
    pub name: String,
    pub filename: Option<String>,
    pub encoding: String,
    pub mimetype: String,
    pub fields: SharedFields,
    truncated: Arc<AtomicBool>,
    stream: FileStream,
    cached: Option<Bytes>,
}

impl FilePart {
    pub(crate) fn new(
        name: String,
        filename: Option<String>,
        encoding: String,
        mimetype: String,
        fields: SharedFields,
        truncated: Arc<AtomicBool>,
        stream: FileStream,
    ) -> Self {
        Self {
            name,
            filename,
            encoding,
            mimetype,
            fields,
            truncated,
            stream,
            cached: None,
        }
    }

    /// True once the file was cut short by the per-file byte ceiling.
    pub fn truncated(&self) -> bool {
        self.truncated.load(Ordering::Acquire)
    }

    /// Next chunk of file bytes, `None` once the file is finished.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, MultipartError>> {
        self.stream.next().await
    }

    /// Full file content, buffered once and cached for repeat calls.
    ///
    /// Drains the remaining stream to completion even when a chunk carries an
    /// error, so the exchange can always advance past this part.
    pub async fn content(&mut self) -> Result<Bytes, MultipartError> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }
        let mut buf = BytesMut::new();
        let mut failure = None;
        while let Some(chunk) = self.stream.next().await {
            match chunk {
                Ok(data) => buf.extend_from_slice(&data),
                Err(err) => failure = Some(err),
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }
        let content = buf.freeze();
        self.cached = Some(content.clone());
        Ok(content)
    }

    /// Consume and discard the rest of the file.
    pub async fn drain(&mut self) -> Result<(), MultipartError> {
        let mut failure = None;
        while let Some(chunk) = self.stream.next().await {
            if let Err(err) = chunk {
                failure = Some(err);
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Extension of the uploaded filename, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let filename = self.filename.as_deref()?;
        filename
            .rsplit('.')
            .next()
            .filter(|ext| !ext.is_empty() && *ext != filename)
    }
}

impl Stream for FilePart {
    type Item = Result<Bytes, MultipartError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}

/// Pull endpoint for one file's bytes.
///
/// Ends cleanly at the final chunk, or at the byte ceiling when the file was
/// truncated in default mode. In strict mode a truncated file yields its
/// prefix, then one terminal error.
#[derive(Debug)]
pub struct FileStream {
    rx: mpsc::Receiver<Result<Bytes, MultipartError>>,
    done: bool,
}

impl FileStream {
    pub(crate) fn new(rx: mpsc::Receiver<Result<Bytes, MultipartError>>) -> Self {
        Self { rx, done: false }
    }
}

impl Stream for FileStream {
    type Item = Result<Bytes, MultipartError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(item)) => {
                if item.is_err() {
                    self.done = true;
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Lightweight description of a part, as recorded in the sibling-fields map.
#[derive(Debug, Clone)]
pub enum FieldEntry {
    Field { value: String, truncated: bool },
    File { filename: Option<String>, mimetype: String },
}

#[derive(Debug, Default)]
struct FieldHistory {
    entries: Vec<(String, Vec<FieldEntry>)>,
}

/// Live, insertion-ordered map from field name to the parts seen so far in
/// the request. Every delivered [`Part`] holds a handle to the same map, so a
/// later part can observe the fields that preceded it.
#[derive(Debug, Clone, Default)]
pub struct SharedFields(Arc<Mutex<FieldHistory>>);

impl SharedFields {
    fn lock(&self) -> MutexGuard<'_, FieldHistory> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn insert(&self, name: &str, entry: FieldEntry) {
        let mut inner = self.lock();
        if let Some((_, entries)) = inner.entries.iter_mut().find(|(n, _)| n == name) {
            entries.push(entry);
        } else {
            inner.entries.push((name.to_string(), vec![entry]));
        }
    }

    /// First field value recorded under `name`, if any.
    pub fn value_of(&self, name: &str) -> Option<String> {
        let inner = self.lock();
        let (_, entries) = inner.entries.iter().find(|(n, _)| n == name)?;
        entries.iter().find_map(|entry| match entry {
            FieldEntry::Field { value, .. } => Some(value.clone()),
            FieldEntry::File { .. } => None,
        })
    }

    /// Every entry recorded under `name`, in arrival order.
    pub fn entries_of(&self, name: &str) -> Vec<FieldEntry> {
        let inner = self.lock();
        inner
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entries)| entries.clone())
            .unwrap_or_default()
    }

    /// Field names in first-insertion order.
    pub fn names(&self) -> Vec<String> {
        let inner = self.lock();
        inner.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().entries.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
