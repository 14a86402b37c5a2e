use bytes::Bytes;
use futures::stream;

use crate::{DecoderEvent, Limits, Multipart, MultipartConfig, MultipartError};

pub fn field(name: &str, value: &str) -> DecoderEvent {
    DecoderEvent::Field {
        name: name.into(),
        value: value.into(),
        name_truncated: false,
        value_truncated: false,
    }
}

pub fn file_begin(name: &str, filename: &str, mimetype: &str) -> DecoderEvent {
    DecoderEvent::FileBegin {
        name: name.into(),
        filename: Some(filename.into()),
        encoding: "7bit".into(),
        mimetype: mimetype.into(),
    }
}

pub fn chunk(data: &'static [u8]) -> DecoderEvent {
    DecoderEvent::FileChunk(Bytes::from_static(data))
}

pub fn chunk_owned(data: Vec<u8>) -> DecoderEvent {
    DecoderEvent::FileChunk(Bytes::from(data))
}

pub fn scripted(events: Vec<DecoderEvent>) -> Multipart {
    scripted_with(events, MultipartConfig::default())
}

pub fn scripted_with(events: Vec<DecoderEvent>, config: MultipartConfig) -> Multipart {
    Multipart::from_decoder(Ok(stream::iter(events)), config)
}

pub fn failed_construction(err: MultipartError) -> Multipart {
    Multipart::from_decoder(
        Err::<stream::Iter<std::vec::IntoIter<DecoderEvent>>, _>(err),
        MultipartConfig::default(),
    )
}

pub fn file_size_config(file_size: u64, strict: bool) -> MultipartConfig {
    MultipartConfig {
        limits: Limits {
            file_size: Some(file_size),
            ..Limits::default()
        },
        throw_file_size_limit: strict,
        ..MultipartConfig::default()
    }
}
