use tokio::sync::mpsc;

use crate::part::Part;
use crate::MultipartError;

/// One value produced by the decoder bridge.
#[derive(Debug)]
pub(crate) enum PartEvent {
    Part(Part),
    Finished,
}

/// Builds the capacity-one handoff between the decoder bridge and the
/// consumer. With a single slot the producer's next `send` parks until the
/// consumer has taken the previous value, which is exactly the
/// one-part-in-flight backpressure the decoder relies on.
pub(crate) fn part_channel() -> (PartSender, PartStream) {
    let (tx, rx) = mpsc::channel(1);
    (
        PartSender { tx },
        PartStream {
            rx,
            done: false,
            failed: None,
        },
    )
}

#[derive(Debug, Clone)]
pub(crate) struct PartSender {
    tx: mpsc::Sender<Result<PartEvent, MultipartError>>,
}

impl PartSender {
    /// Hands a part to the consumer. Returns false once the consumer is gone.
    pub(crate) async fn deliver(&self, part: Part) -> bool {
        self.tx.send(Ok(PartEvent::Part(part))).await.is_ok()
    }

    pub(crate) async fn finish(&self) -> bool {
        self.tx.send(Ok(PartEvent::Finished)).await.is_ok()
    }

    pub(crate) async fn fail(&self, err: MultipartError) -> bool {
        self.tx.send(Err(err)).await.is_ok()
    }
}

/// Pull side of the part handoff.
///
/// Single-pass: after the end marker every call keeps returning `Ok(None)`,
/// and after an error every call keeps returning that error. A producer that
/// disappears without a terminal marker surfaces as [`MultipartError::PrematureClose`]
/// instead of hanging the consumer.
#[derive(Debug)]
pub struct PartStream {
    rx: mpsc::Receiver<Result<PartEvent, MultipartError>>,
    done: bool,
    failed: Option<MultipartError>,
}

impl PartStream {
    pub async fn next_part(&mut self) -> Result<Option<Part>, MultipartError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if self.done {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(Ok(PartEvent::Part(part))) => Ok(Some(part)),
            Some(Ok(PartEvent::Finished)) => {
                self.done = true;
                Ok(None)
            }
            Some(Err(err)) => {
                self.failed = Some(err.clone());
                Err(err)
            }
            None => {
                let err = MultipartError::PrematureClose;
                self.failed = Some(err.clone());
                Err(err)
            }
        }
    }
}
