use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_gauge, Encoder, IntCounter, IntGauge, TextEncoder,
};

lazy_static! {
    pub(crate) static ref PARTS_DELIVERED: IntCounter = register_int_counter!(
        "formstream_parts_delivered",
        "Total multipart parts delivered to consumers"
    )
    .unwrap();
    pub(crate) static ref FILES_PERSISTED: IntCounter = register_int_counter!(
        "formstream_files_persisted",
        "Total uploaded files written to temporary storage"
    )
    .unwrap();
    pub(crate) static ref TEMP_FILES_LIVE: IntGauge = register_int_gauge!(
        "formstream_temp_files_live",
        "Temporary upload files currently recorded on disk"
    )
    .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
