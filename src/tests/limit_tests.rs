#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::tests::support;
    use crate::{DecoderEvent, Limits, MultipartConfig, MultipartError};

    #[tokio::test]
    async fn files_limit_signal_fails_the_exchange_before_any_bytes() {
        let config = MultipartConfig {
            limits: Limits {
                files: Some(0),
                ..Limits::default()
            },
            ..MultipartConfig::default()
        };
        // A compliant decoder reports the overflow instead of the file part.
        let mut multipart = support::scripted_with(vec![DecoderEvent::FilesLimit], config);
        let mut files = multipart.files().expect("claim files");
        assert!(matches!(files.next().await, Err(MultipartError::FilesLimit)));
    }

    #[tokio::test]
    async fn parts_and_fields_limit_signals_are_fatal() {
        let mut multipart = support::scripted(vec![
            support::field("a", "1"),
            DecoderEvent::PartsLimit,
        ]);
        let mut parts = multipart.parts().expect("claim parts");
        parts.next().await.expect("field").expect("some");
        assert!(matches!(parts.next().await, Err(MultipartError::PartsLimit)));

        let mut multipart = support::scripted(vec![DecoderEvent::FieldsLimit]);
        let mut parts = multipart.parts().expect("claim parts");
        assert!(matches!(
            parts.next().await,
            Err(MultipartError::FieldsLimit)
        ));
    }

    #[tokio::test]
    async fn oversized_file_is_truncated_at_the_ceiling_by_default() {
        let mut multipart = support::scripted_with(
            vec![
                support::file_begin("upload", "big.bin", "application/octet-stream"),
                support::chunk(b"01234"),
                support::chunk(b"56789AB"),
                DecoderEvent::FileEnd,
                DecoderEvent::Finished,
            ],
            support::file_size_config(8, false),
        );
        let mut files = multipart.files().expect("claim files");
        let mut file = files.next().await.expect("file").expect("some");

        let content = file.content().await.expect("truncated reads still succeed");
        assert_eq!(&content[..], b"01234567");
        assert!(file.truncated());
        assert!(files.next().await.expect("end").is_none());
    }

    #[tokio::test]
    async fn file_exactly_at_the_ceiling_is_not_truncated() {
        let mut multipart = support::scripted_with(
            vec![
                support::file_begin("upload", "fits.bin", "application/octet-stream"),
                support::chunk(b"01234567"),
                DecoderEvent::FileEnd,
                DecoderEvent::Finished,
            ],
            support::file_size_config(8, false),
        );
        let mut files = multipart.files().expect("claim files");
        let mut file = files.next().await.expect("file").expect("some");
        assert_eq!(&file.content().await.expect("content")[..], b"01234567");
        assert!(!file.truncated());
    }

    #[tokio::test]
    async fn strict_mode_rejects_only_after_the_stream_drained() {
        let mut multipart = support::scripted_with(
            vec![
                support::file_begin("upload", "big.bin", "application/octet-stream"),
                support::chunk(b"01234"),
                support::chunk(b"56789AB"),
                DecoderEvent::FileEnd,
                DecoderEvent::Finished,
            ],
            support::file_size_config(8, true),
        );
        let mut files = multipart.files().expect("claim files");
        let mut file = files.next().await.expect("file").expect("some");

        // The truncated prefix is delivered first; the error is the last item.
        let mut received = Vec::new();
        let mut failure = None;
        while let Some(item) = file.next_chunk().await {
            match item {
                Ok(data) => {
                    assert!(failure.is_none(), "no bytes may follow the error");
                    received.extend_from_slice(&data);
                }
                Err(err) => failure = Some(err),
            }
        }
        assert_eq!(&received[..], b"01234567");
        assert!(matches!(failure, Some(MultipartError::FileTooLarge)));
    }

    #[tokio::test]
    async fn strict_mode_content_rejects_as_file_too_large() {
        let mut multipart = support::scripted_with(
            vec![
                support::file_begin("upload", "big.bin", "application/octet-stream"),
                support::chunk_owned(vec![b'y'; 64]),
                DecoderEvent::FileEnd,
                DecoderEvent::Finished,
            ],
            support::file_size_config(16, true),
        );
        let mut files = multipart.files().expect("claim files");
        let mut file = files.next().await.expect("file").expect("some");
        assert!(matches!(
            file.content().await,
            Err(MultipartError::FileTooLarge)
        ));
    }

    #[tokio::test]
    async fn prohibited_field_name_fails_the_exchange() {
        let mut multipart = support::scripted(vec![
            support::field("__proto__", "polluted"),
            DecoderEvent::Finished,
        ]);
        let mut parts = multipart.parts().expect("claim parts");
        let err = parts.next().await.expect_err("prohibited name");
        assert!(matches!(err, MultipartError::ProhibitedName(name) if name == "__proto__"));
    }

    #[tokio::test]
    async fn prohibited_file_name_drains_without_consumer_action() {
        let mut multipart = support::scripted(vec![
            support::file_begin("constructor", "evil.bin", "application/octet-stream"),
            support::chunk_owned(vec![0u8; 4096]),
            support::chunk_owned(vec![0u8; 4096]),
            DecoderEvent::FileEnd,
            DecoderEvent::Finished,
        ]);
        let mut parts = multipart.parts().expect("claim parts");
        let err = timeout(Duration::from_secs(1), parts.next())
            .await
            .expect("rejected file must not stall the exchange")
            .expect_err("prohibited name");
        assert!(matches!(err, MultipartError::ProhibitedName(name) if name == "constructor"));
    }

    #[tokio::test]
    async fn ignored_file_never_stalls_the_exchange() {
        let mut events = vec![
            support::field("before", "1"),
            support::file_begin("upload", "big.bin", "application/octet-stream"),
        ];
        // Far more chunks than the per-file channel buffers.
        for _ in 0..64 {
            events.push(support::chunk_owned(vec![b'z'; 256]));
        }
        events.push(DecoderEvent::FileEnd);
        events.push(support::field("after", "2"));
        events.push(DecoderEvent::Finished);

        let mut multipart = support::scripted(events);
        let mut parts = multipart.parts().expect("claim parts");

        assert_eq!(parts.next().await.expect("field").expect("some").name(), "before");
        let file = parts.next().await.expect("file").expect("some");
        drop(file); // handler ignores the upload entirely

        let after = timeout(Duration::from_secs(1), parts.next())
            .await
            .expect("dropped file must not stall the exchange")
            .expect("field")
            .expect("some");
        assert_eq!(after.name(), "after");
        assert!(parts.next().await.expect("end").is_none());
    }

    #[tokio::test]
    async fn classifier_can_turn_a_file_part_into_a_field() {
        let config = MultipartConfig {
            is_part_a_file: Some(Arc::new(|name, _content_type, _filename| name != "inline")),
            ..MultipartConfig::default()
        };
        let mut multipart = support::scripted_with(
            vec![
                support::file_begin("inline", "note.txt", "text/plain"),
                support::chunk(b"hello "),
                support::chunk(b"world"),
                DecoderEvent::FileEnd,
                DecoderEvent::Finished,
            ],
            config,
        );
        let mut parts = multipart.parts().expect("claim parts");
        let part = parts.next().await.expect("part").expect("some");
        let field = part.into_field().expect("reclassified as field");
        assert_eq!(field.name, "inline");
        assert_eq!(field.value, "hello world");
        assert!(!field.value_truncated);
    }
}
