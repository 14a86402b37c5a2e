use bytes::Bytes;
use formstream::{DecoderEvent, Multipart, MultipartConfig, Part};
use futures::stream;

#[tokio::main]
async fn main() -> Result<(), formstream::MultipartError> {
    // Stands in for a real decoder wired to a request body.
    let events = stream::iter(vec![
        DecoderEvent::Field {
            name: "hello".into(),
            value: "world".into(),
            name_truncated: false,
            value_truncated: false,
        },
        DecoderEvent::FileBegin {
            name: "upload".into(),
            filename: Some("notes.txt".into()),
            encoding: "7bit".into(),
            mimetype: "text/plain".into(),
        },
        DecoderEvent::FileChunk(Bytes::from_static(b"some uploaded text")),
        DecoderEvent::FileEnd,
        DecoderEvent::Finished,
    ]);

    let mut multipart = Multipart::from_decoder(Ok(events), MultipartConfig::default());
    let mut parts = multipart.parts()?;

    while let Some(part) = parts.next().await? {
        match part {
            Part::Field(field) => println!("field {} = {}", field.name, field.value),
            Part::File(mut file) => {
                let content = file.content().await?;
                println!(
                    "file {} ({:?}, {}): {} bytes, saw field hello = {:?}",
                    file.name,
                    file.filename,
                    file.mimetype,
                    content.len(),
                    file.fields.value_of("hello"),
                );
            }
        }
    }
    Ok(())
}
