//! # Streaming multipart consumption
//!
//! This library bridges an event-driven multipart/form-data decoder into a
//! single-consumer, pull-based iteration protocol. The decoder pushes parts
//! as it sees them on the wire; request handlers pull them one at a time,
//! with a capacity-one channel in between so the decoder never runs more
//! than one part ahead of the handler. On top of the part stream sit the
//! typed iterators (`parts`, `files`, `first_part`), the limit and
//! truncation policy, and an upload manager that persists file parts to
//! temporary storage and guarantees their removal when the request ends.
//!
//! The byte-level multipart grammar is not parsed here: any decoder that can
//! emit [`DecoderEvent`]s in wire order can sit on the push side.
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use formstream::{DecoderEvent, Multipart, MultipartConfig};
//! use futures::stream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), formstream::MultipartError> {
//!     // Stands in for a real decoder wired to a request body.
//!     let events = stream::iter(vec![
//!         DecoderEvent::Field {
//!             name: "hello".into(),
//!             value: "world".into(),
//!             name_truncated: false,
//!             value_truncated: false,
//!         },
//!         DecoderEvent::FileBegin {
//!             name: "upload".into(),
//!             filename: Some("notes.txt".into()),
//!             encoding: "7bit".into(),
//!             mimetype: "text/plain".into(),
//!         },
//!         DecoderEvent::FileChunk(Bytes::from_static(b"hi there")),
//!         DecoderEvent::FileEnd,
//!         DecoderEvent::Finished,
//!     ]);
//!
//!     let mut multipart = Multipart::from_decoder(Ok(events), MultipartConfig::default());
//!     let mut parts = multipart.parts()?;
//!     while let Some(part) = parts.next().await? {
//!         println!("{}: {}", part.part_type(), part.name());
//!     }
//!     Ok(())
//! }
//! ```

#[cfg(test)]
mod tests;

mod error;
pub use error::MultipartError;

mod part;
pub use part::{FieldEntry, FieldPart, FilePart, FileStream, Part, SharedFields};

mod channel;
pub use channel::PartStream;

mod decoder;
pub use decoder::DecoderEvent;

mod multipart;
pub use multipart::{Files, Multipart, Parts};

mod persist;
pub use persist::{SavedFile, UploadManager};

mod limits;
#[cfg(feature = "configs")]
pub use limits::configuration;
pub use limits::{FileClassifier, Limits, MultipartConfig};

#[cfg(feature = "metrics")]
mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::gather_metrics;
