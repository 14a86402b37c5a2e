#[cfg(test)]
mod tests {
    use crate::tests::support;
    use crate::{DecoderEvent, FieldEntry};

    #[tokio::test]
    async fn field_history_preserves_first_insertion_order() {
        let mut multipart = support::scripted(vec![
            support::field("alpha", "1"),
            support::field("beta", "2"),
            support::field("alpha", "3"),
            DecoderEvent::Finished,
        ]);
        let mut parts = multipart.parts().expect("claim parts");

        let mut last = None;
        while let Some(part) = parts.next().await.expect("part") {
            last = Some(part);
        }
        let last = last.expect("at least one part");

        let fields = last.fields();
        assert_eq!(fields.names(), ["alpha", "beta"]);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.value_of("alpha").as_deref(), Some("1"));

        let repeats = fields.entries_of("alpha");
        assert_eq!(repeats.len(), 2);
        assert!(matches!(
            &repeats[1],
            FieldEntry::Field { value, .. } if value == "3"
        ));
    }

    #[tokio::test]
    async fn files_are_recorded_alongside_fields() {
        let mut multipart = support::scripted(vec![
            support::file_begin("upload", "pic.png", "image/png"),
            support::chunk(b"png bytes"),
            DecoderEvent::FileEnd,
            support::field("caption", "sunset"),
            DecoderEvent::Finished,
        ]);
        let mut parts = multipart.parts().expect("claim parts");

        let file = parts.next().await.expect("file").expect("some");
        drop(file);
        let caption = parts.next().await.expect("field").expect("some");

        let fields = caption.fields();
        assert_eq!(fields.names(), ["upload", "caption"]);
        assert!(matches!(
            fields.entries_of("upload").first(),
            Some(FieldEntry::File { filename: Some(f), .. }) if f == "pic.png"
        ));
        // A file never answers for a field value lookup.
        assert!(fields.value_of("upload").is_none());
    }
}
