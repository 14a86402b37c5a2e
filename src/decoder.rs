use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::channel::{part_channel, PartSender, PartStream};
use crate::limits::MultipartConfig;
use crate::part::{FieldEntry, FieldPart, FilePart, FileStream, Part, SharedFields};
use crate::MultipartError;

/// In-flight byte chunks buffered per file before the bridge stops reading
/// ahead of the consumer.
const FILE_CHUNK_CAPACITY: usize = 16;

/// What the external byte-level decoder pushes into the bridge, in wire order.
///
/// Count-limit overflow arrives out-of-band from normal part delivery, as the
/// dedicated `PartsLimit`/`FilesLimit`/`FieldsLimit` signals. Exactly one
/// terminal event (`Finished` or `Error`) ends a well-behaved exchange; a
/// stream that simply stops is treated as a premature close.
#[derive(Debug)]
pub enum DecoderEvent {
    Field {
        name: String,
        value: String,
        name_truncated: bool,
        value_truncated: bool,
    },
    FileBegin {
        name: String,
        filename: Option<String>,
        encoding: String,
        mimetype: String,
    },
    FileChunk(Bytes),
    FileEnd,
    PartsLimit,
    FilesLimit,
    FieldsLimit,
    Error(MultipartError),
    Finished,
}

/// Spawns the bridge task that turns pushed decoder events into pull-based
/// part delivery. A decoder construction failure (`Err`) is injected through
/// the same channel path as any other terminal error, so consumers observe
/// one unified failure path regardless of when construction happened.
pub(crate) fn spawn_bridge<S>(
    events: Result<S, MultipartError>,
    config: Arc<MultipartConfig>,
) -> PartStream
where
    S: Stream<Item = DecoderEvent> + Send + 'static,
{
    let (tx, stream) = part_channel();
    match events {
        Err(err) => {
            tokio::spawn(async move {
                tx.fail(err).await;
            });
        }
        Ok(events) => {
            tokio::spawn(Bridge::new(tx, config).run(events));
        }
    }
    stream
}

struct ActiveFile {
    name: String,
    chunks: Option<mpsc::Sender<Result<Bytes, MultipartError>>>,
    written: u64,
    truncated: Arc<AtomicBool>,
}

struct BufferedField {
    name: String,
    data: BytesMut,
    truncated: bool,
}

enum ActivePart {
    /// A real file: bytes flow through to the consumer's stream.
    Streaming(ActiveFile),
    /// Reclassified by the `is_part_a_file` predicate: bytes are collected
    /// and re-emitted as a field value.
    Buffering(BufferedField),
}

struct Bridge {
    tx: PartSender,
    config: Arc<MultipartConfig>,
    fields: SharedFields,
    active: Option<ActivePart>,
}

impl Bridge {
    fn new(tx: PartSender, config: Arc<MultipartConfig>) -> Self {
        Self {
            tx,
            config,
            fields: SharedFields::default(),
            active: None,
        }
    }

    async fn run<S>(mut self, events: S)
    where
        S: Stream<Item = DecoderEvent>,
    {
        tokio::pin!(events);
        while let Some(event) = events.next().await {
            match event {
                DecoderEvent::Field {
                    name,
                    value,
                    name_truncated,
                    value_truncated,
                } => {
                    if self.config.is_prohibited(&name) {
                        self.abort(MultipartError::ProhibitedName(name)).await;
                        return;
                    }
                    self.fields.insert(
                        &name,
                        FieldEntry::Field {
                            value: value.clone(),
                            truncated: value_truncated,
                        },
                    );
                    let part = Part::Field(FieldPart {
                        name,
                        value,
                        name_truncated,
                        value_truncated,
                        fields: self.fields.clone(),
                    });
                    if !self.deliver(part).await {
                        return;
                    }
                }
                DecoderEvent::FileBegin {
                    name,
                    filename,
                    encoding,
                    mimetype,
                } => {
                    if self.config.is_prohibited(&name) {
                        // Sink the rejected file's bytes first so the
                        // transport is never left stalled on an unread part.
                        sink_rejected_file(events.as_mut()).await;
                        self.abort(MultipartError::ProhibitedName(name)).await;
                        return;
                    }
                    if self.active.is_some() {
                        debug!("new part began before the previous file ended");
                        self.active = None;
                    }
                    if self
                        .config
                        .part_is_file(&name, Some(&mimetype), filename.as_deref())
                    {
                        if !self.begin_file(name, filename, encoding, mimetype).await {
                            return;
                        }
                    } else {
                        self.active = Some(ActivePart::Buffering(BufferedField {
                            name,
                            data: BytesMut::new(),
                            truncated: false,
                        }));
                    }
                }
                DecoderEvent::FileChunk(data) => self.on_chunk(data).await,
                DecoderEvent::FileEnd => {
                    if !self.on_file_end().await {
                        return;
                    }
                }
                DecoderEvent::PartsLimit => {
                    self.abort(MultipartError::PartsLimit).await;
                    return;
                }
                DecoderEvent::FilesLimit => {
                    self.abort(MultipartError::FilesLimit).await;
                    return;
                }
                DecoderEvent::FieldsLimit => {
                    self.abort(MultipartError::FieldsLimit).await;
                    return;
                }
                DecoderEvent::Error(err) => {
                    self.abort(err).await;
                    return;
                }
                DecoderEvent::Finished => {
                    self.tx.finish().await;
                    return;
                }
            }
        }
        // The transport went away without a terminal event.
        self.abort(MultipartError::PrematureClose).await;
    }

    async fn begin_file(
        &mut self,
        name: String,
        filename: Option<String>,
        encoding: String,
        mimetype: String,
    ) -> bool {
        let (chunk_tx, chunk_rx) = mpsc::channel(FILE_CHUNK_CAPACITY);
        let truncated = Arc::new(AtomicBool::new(false));
        self.fields.insert(
            &name,
            FieldEntry::File {
                filename: filename.clone(),
                mimetype: mimetype.clone(),
            },
        );
        let part = Part::File(FilePart::new(
            name.clone(),
            filename,
            encoding,
            mimetype,
            self.fields.clone(),
            truncated.clone(),
            FileStream::new(chunk_rx),
        ));
        self.active = Some(ActivePart::Streaming(ActiveFile {
            name,
            chunks: Some(chunk_tx),
            written: 0,
            truncated,
        }));
        self.deliver(part).await
    }

    async fn on_chunk(&mut self, data: Bytes) {
        match &mut self.active {
            Some(ActivePart::Streaming(file)) => {
                if file.truncated.load(Ordering::Acquire) {
                    // Past the ceiling: the rest of the file goes to the null
                    // sink so the decoder can keep advancing.
                    return;
                }
                let mut data = data;
                let mut crossed = false;
                if let Some(limit) = self.config.limits.file_size {
                    let room = limit.saturating_sub(file.written);
                    if data.len() as u64 > room {
                        data.truncate(room as usize);
                        crossed = true;
                    }
                }
                file.written += data.len() as u64;
                if !data.is_empty() {
                    if let Some(tx) = &file.chunks {
                        if tx.send(Ok(data)).await.is_err() {
                            debug!(
                                "consumer dropped file {:?}, discarding remaining bytes",
                                file.name
                            );
                            file.chunks = None;
                        }
                    }
                }
                if crossed {
                    file.truncated.store(true, Ordering::Release);
                    if self.config.throw_file_size_limit {
                        warn!("file {:?} exceeded the size limit", file.name);
                        if let Some(tx) = file.chunks.take() {
                            let _ = tx.send(Err(MultipartError::FileTooLarge)).await;
                        }
                    } else {
                        error!("file {:?} exceeded the size limit, truncating", file.name);
                        file.chunks = None;
                    }
                }
            }
            Some(ActivePart::Buffering(field)) => {
                let room = self.config.limits.field_size.saturating_sub(field.data.len());
                if data.len() > room {
                    field.data.extend_from_slice(&data[..room]);
                    field.truncated = true;
                } else {
                    field.data.extend_from_slice(&data);
                }
            }
            None => debug!("dropping stray file chunk with no active part"),
        }
    }

    async fn on_file_end(&mut self) -> bool {
        match self.active.take() {
            // Dropping the chunk sender closes the consumer's stream.
            Some(ActivePart::Streaming(_)) => true,
            Some(ActivePart::Buffering(field)) => {
                let value = String::from_utf8_lossy(&field.data).into_owned();
                self.fields.insert(
                    &field.name,
                    FieldEntry::Field {
                        value: value.clone(),
                        truncated: field.truncated,
                    },
                );
                let part = Part::Field(FieldPart {
                    name: field.name,
                    value,
                    name_truncated: false,
                    value_truncated: field.truncated,
                    fields: self.fields.clone(),
                });
                self.deliver(part).await
            }
            None => {
                debug!("unmatched file end");
                true
            }
        }
    }

    async fn deliver(&self, part: Part) -> bool {
        #[cfg(feature = "metrics")]
        crate::metrics::PARTS_DELIVERED.inc();
        if self.tx.deliver(part).await {
            true
        } else {
            debug!("part consumer went away before the body finished");
            false
        }
    }

    /// Terminal failure: an in-flight file stream observes the error before
    /// the part channel does, so a blocked disk write fails fast.
    async fn abort(&mut self, err: MultipartError) {
        if let Some(ActivePart::Streaming(mut file)) = self.active.take() {
            if let Some(tx) = file.chunks.take() {
                let _ = tx.send(Err(err.clone())).await;
            }
        }
        self.tx.fail(err).await;
    }
}

/// Consumes and discards the byte events of a rejected file so the connection
/// keeps flowing even though the part never reaches the consumer.
async fn sink_rejected_file<S>(mut events: Pin<&mut S>)
where
    S: Stream<Item = DecoderEvent>,
{
    while let Some(event) = events.next().await {
        match event {
            DecoderEvent::FileChunk(_) => continue,
            DecoderEvent::FileEnd => return,
            // Terminal or out-of-band signal: stop sinking, the exchange is
            // being failed anyway.
            _ => return,
        }
    }
}
