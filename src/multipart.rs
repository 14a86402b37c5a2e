use std::sync::Arc;

use futures::Stream;

use crate::channel::{part_channel, PartStream};
use crate::decoder::{spawn_bridge, DecoderEvent};
use crate::limits::MultipartConfig;
use crate::part::{FilePart, Part};
use crate::MultipartError;

/// Per-request entry point for pulling parts out of a multipart body.
///
/// Exactly one consuming operation ([`parts`](Self::parts),
/// [`files`](Self::files) or [`first_part`](Self::first_part)) may be
/// initiated per request; a second initiation is a usage error, as is any
/// initiation on a request that is not multipart at all.
#[derive(Debug)]
pub struct Multipart {
    stream: PartStream,
    multipart: bool,
    consumed: bool,
}

impl Multipart {
    /// Bridges a decoder's event stream into pull-based iteration.
    ///
    /// Pass `Err` when decoder construction itself failed (for example a
    /// malformed boundary): the error is delivered on the first pull rather
    /// than thrown here, so every consumer observes the same failure path.
    pub fn from_decoder<S>(events: Result<S, MultipartError>, config: MultipartConfig) -> Self
    where
        S: Stream<Item = DecoderEvent> + Send + 'static,
    {
        let stream = spawn_bridge(events, Arc::new(config));
        Self {
            stream,
            multipart: true,
            consumed: false,
        }
    }

    /// For host adapters: a request whose content type is not multipart.
    /// Every consuming operation on it fails synchronously.
    pub fn not_multipart() -> Self {
        let (_sender, stream) = part_channel();
        Self {
            stream,
            multipart: false,
            consumed: false,
        }
    }

    fn claim(&mut self) -> Result<(), MultipartError> {
        if !self.multipart {
            return Err(MultipartError::NotMultipart);
        }
        if self.consumed {
            return Err(MultipartError::AlreadyConsumed);
        }
        self.consumed = true;
        Ok(())
    }

    /// Every part, file and field, in strict arrival order.
    pub fn parts(&mut self) -> Result<Parts<'_>, MultipartError> {
        self.claim()?;
        Ok(Parts {
            stream: &mut self.stream,
        })
    }

    /// File parts only; fields are skipped.
    pub fn files(&mut self) -> Result<Files<'_>, MultipartError> {
        self.claim()?;
        Ok(Files {
            stream: &mut self.stream,
        })
    }

    /// The first delivered part from one unfiltered pull, whatever its type,
    /// or `Ok(None)` when the body had no parts.
    pub async fn first_part(&mut self) -> Result<Option<Part>, MultipartError> {
        self.claim()?;
        self.stream.next_part().await
    }

    /// Consuming adapter yielding every part as a [`Stream`] item.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<Part, MultipartError>> {
        async_stream::stream! {
            if let Err(err) = self.claim() {
                yield Err(err);
                return;
            }
            loop {
                match self.stream.next_part().await {
                    Ok(Some(part)) => yield Ok(part),
                    Ok(None) => return,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        }
    }

    /// Consuming adapter yielding file parts only.
    pub fn into_file_stream(mut self) -> impl Stream<Item = Result<FilePart, MultipartError>> {
        async_stream::stream! {
            if let Err(err) = self.claim() {
                yield Err(err);
                return;
            }
            loop {
                match self.stream.next_part().await {
                    Ok(Some(Part::File(file))) => yield Ok(file),
                    Ok(Some(Part::Field(_))) => continue,
                    Ok(None) => return,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        }
    }
}

/// Iterator over every part, in wire order.
#[derive(Debug)]
pub struct Parts<'a> {
    stream: &'a mut PartStream,
}

impl Parts<'_> {
    pub async fn next(&mut self) -> Result<Option<Part>, MultipartError> {
        self.stream.next_part().await
    }
}

/// Iterator over file parts only.
#[derive(Debug)]
pub struct Files<'a> {
    stream: &'a mut PartStream,
}

impl Files<'_> {
    pub async fn next(&mut self) -> Result<Option<FilePart>, MultipartError> {
        loop {
            match self.stream.next_part().await? {
                None => return Ok(None),
                Some(Part::Field(_)) => continue,
                Some(Part::File(file)) => return Ok(Some(file)),
            }
        }
    }
}
