use bytes::Bytes;
use formstream::{DecoderEvent, Multipart, MultipartConfig, UploadManager};
use futures::stream;

#[tokio::main]
async fn main() -> Result<(), formstream::MultipartError> {
    let events = stream::iter(vec![
        DecoderEvent::FileBegin {
            name: "report".into(),
            filename: Some("report.csv".into()),
            encoding: "7bit".into(),
            mimetype: "text/csv".into(),
        },
        DecoderEvent::FileChunk(Bytes::from_static(b"id,total\n1,99\n")),
        DecoderEvent::FileEnd,
        DecoderEvent::Finished,
    ]);

    let multipart = Multipart::from_decoder(Ok(events), MultipartConfig::default());
    let manager = UploadManager::new(multipart);

    let saved = manager.save_request_files().await?;
    for file in saved.iter() {
        println!("saved {:?} to {}", file.filename, file.filepath.display());
    }

    // A host framework calls this from its request-completion hook; here the
    // request "ends" right away.
    manager.clean_request_files().await;
    for file in saved.iter() {
        println!(
            "{} still exists: {}",
            file.filepath.display(),
            file.filepath.exists()
        );
    }
    Ok(())
}
