//! The original-file record carried in every envelope: extension, MIME type
//! and byte length, serialized as versioned compact JSON.

use serde::{Deserialize, Deserializer, Serialize};

/// Current metadata record format version, written as the `v` field.
pub const METADATA_VERSION: u32 = 1;

/// Attributes of the original file, carried in the envelope header.
///
/// Serialized as compact JSON: `{"v":1,"ext":"pdf","type":"application/pdf","size":1234}`.
/// The block is length-prefixed in the envelope, so the strings may hold any
/// characters.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    #[serde(rename = "v")]
    pub version: u32,
    pub ext: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
}

// Deserialization helper.  Records without a `v` field are version 1.
#[derive(Deserialize)]
struct FileMetadataRaw {
    #[serde(default)]
    v: Option<u32>,
    #[serde(default)]
    ext: String,
    #[serde(rename = "type", default)]
    content_type: String,
    size: u64,
}

impl<'de> Deserialize<'de> for FileMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = FileMetadataRaw::deserialize(deserializer)?;
        let version = raw.v.unwrap_or(METADATA_VERSION);
        if version > METADATA_VERSION {
            return Err(serde::de::Error::custom(format!(
                "unsupported metadata version {version}"
            )));
        }
        Ok(FileMetadata {
            version,
            ext: raw.ext,
            content_type: raw.content_type,
            size: raw.size,
        })
    }
}

impl FileMetadata {
    /// Build the record for a source file from its name, MIME type and length.
    pub fn for_file(original_name: &str, content_type: &str, size: u64) -> Self {
        Self {
            version: METADATA_VERSION,
            ext: extension_of(original_name),
            content_type: content_type.to_owned(),
            size,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Lowercased text after the last `.` of `name`.
///
/// A name without a dot yields the whole name lowercased; `""` yields `""`.
pub fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or_default().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_rules() {
        assert_eq!(extension_of("report.PDF"), "pdf");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("Makefile"), "makefile");
        assert_eq!(extension_of("trailing."), "");
        assert_eq!(extension_of(""), "");
    }

    #[test]
    fn serialized_form_is_compact_and_versioned() {
        let meta = FileMetadata::for_file("a.pdf", "application/pdf", 42);
        let json = String::from_utf8(meta.to_bytes().unwrap()).unwrap();
        assert_eq!(json, r#"{"v":1,"ext":"pdf","type":"application/pdf","size":42}"#);
        assert_eq!(FileMetadata::from_bytes(json.as_bytes()).unwrap(), meta);
    }

    #[test]
    fn unversioned_record_is_accepted() {
        let meta = FileMetadata::from_bytes(br#"{"type":"text/plain","ext":"txt","size":5}"#).unwrap();
        assert_eq!(meta.version, METADATA_VERSION);
        assert_eq!(meta.ext, "txt");
        assert_eq!(meta.content_type, "text/plain");
        assert_eq!(meta.size, 5);
    }

    #[test]
    fn newer_version_is_rejected() {
        assert!(FileMetadata::from_bytes(br#"{"v":2,"ext":"txt","type":"","size":1}"#).is_err());
    }

    #[test]
    fn unusual_characters_survive() {
        let meta = FileMetadata::for_file("weird.\"}\u{0}é", "x/\"y\"", 3);
        let back = FileMetadata::from_bytes(&meta.to_bytes().unwrap()).unwrap();
        assert_eq!(back, meta);
    }
}
