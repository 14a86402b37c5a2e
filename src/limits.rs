use std::sync::Arc;

/// Ceilings applied to one multipart exchange.
///
/// Count ceilings (`parts`, `files`, `fields`) are enforced by the decoder,
/// which reports overflow through the dedicated limit signals; crossing one
/// is fatal to the whole exchange. The per-file byte ceiling (`file_size`)
/// is applied by the bridge and is non-fatal by default: the file is
/// truncated at the ceiling and flagged. `None` means unbounded.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "configs", derive(serde::Deserialize))]
#[cfg_attr(feature = "configs", serde(default))]
pub struct Limits {
    /// Max bytes of a field name.
    pub field_name_size: usize,
    /// Max bytes of a field value.
    pub field_size: usize,
    /// Max number of non-file fields.
    pub fields: Option<usize>,
    /// Max bytes per file.
    pub file_size: Option<u64>,
    /// Max number of file parts.
    pub files: Option<usize>,
    /// Max header key-value pairs per part.
    pub header_pairs: usize,
    /// Max number of parts of any kind.
    pub parts: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            field_name_size: 100,
            field_size: 1024 * 1024,
            fields: None,
            file_size: None,
            files: None,
            header_pairs: 2000,
            parts: Some(1000),
        }
    }
}

/// Decides whether a part counts as a file, given field name, content type
/// and filename. The default treats any part carrying a filename as a file.
pub type FileClassifier = Arc<dyn Fn(&str, Option<&str>, Option<&str>) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct MultipartConfig {
    pub limits: Limits,
    /// When set, consuming a file that crossed the byte ceiling fails with
    /// a file-too-large error once its stream has drained, instead of
    /// silently yielding the truncated prefix.
    pub throw_file_size_limit: bool,
    /// Field names rejected outright. Kept for compatibility with hosts
    /// where such names can shadow structural object properties; override
    /// with an empty list to disable the rule.
    pub prohibited_names: Vec<String>,
    pub is_part_a_file: Option<FileClassifier>,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            throw_file_size_limit: false,
            prohibited_names: vec!["__proto__".into(), "constructor".into()],
            is_part_a_file: None,
        }
    }
}

impl MultipartConfig {
    pub(crate) fn is_prohibited(&self, name: &str) -> bool {
        self.prohibited_names.iter().any(|n| n == name)
    }

    pub(crate) fn part_is_file(
        &self,
        name: &str,
        content_type: Option<&str>,
        filename: Option<&str>,
    ) -> bool {
        match &self.is_part_a_file {
            Some(classifier) => classifier(name, content_type, filename),
            None => filename.is_some(),
        }
    }
}

#[cfg(feature = "configs")]
pub mod configuration {
    use super::Limits;
    use config::Config;

    /// Loads a [`Limits`] table from a configuration file; absent keys fall
    /// back to the defaults.
    pub fn load_limits(path: &str) -> Result<Limits, config::ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        settings.try_deserialize()
    }
}
