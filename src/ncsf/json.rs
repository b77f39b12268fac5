//! JSON serialization types for NCSF files and timing reports

use super::reader::NcsfFile;
use super::tags::parse_length;
use crate::player::{LengthReport, TimeKind};
use serde::Serialize;

/// Top-level JSON structure for an NCSF file
#[derive(Debug, Clone, Serialize)]
pub struct NcsfJson {
    /// PSF version byte
    pub version: u8,
    /// Size of the reserved section in bytes
    pub reserved_size: usize,
    /// Sequence number, for minincsf files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    /// Compressed program size in bytes
    pub compressed_size: u32,
    /// Decompressed program size in bytes
    pub program_size: usize,
    /// CRC-32 of the compressed program
    pub crc: String,
    /// Parsed `length` tag in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_seconds: Option<f64>,
    /// Tags in file order
    pub tags: Vec<TagJson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagJson {
    pub name: String,
    pub value: String,
}

impl NcsfJson {
    pub fn new(file: &NcsfFile) -> Self {
        Self {
            version: file.version,
            reserved_size: file.reserved.len(),
            sequence: file.sequence_number(),
            compressed_size: file.compressed_size,
            program_size: file.program.len(),
            crc: format!("{:08x}", file.crc),
            length_seconds: file.tags.get("length").and_then(parse_length),
            tags: file
                .tags
                .iter()
                .map(|(name, value)| TagJson {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }
}

/// Timing summary for one converted sequence
#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    pub index: usize,
    pub name: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TimeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    pub silence_detected: bool,
}

impl SequenceReport {
    pub fn new(index: usize, name: &str, file: &str, report: Option<&LengthReport>) -> Self {
        let time = report.map(|r| r.time).filter(|t| t.is_determined());
        Self {
            index,
            name: name.to_string(),
            file: file.to_string(),
            seconds: time.map(|t| t.seconds),
            kind: time.map(|t| t.kind),
            length: report.and_then(|r| r.length.clone()),
            silence_detected: report.map_or(false, |r| r.silence_detected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::writer::build_ncsf;
    use super::super::TagList;
    use super::*;

    #[test]
    fn test_ncsf_json_fields() {
        let mut tags = TagList::new();
        tags.set("_lib", "game.ncsflib");
        tags.set("length", "1:05");
        let data = build_ncsf(&3u32.to_le_bytes(), &[], &tags).unwrap();
        let json = NcsfJson::new(&NcsfFile::read(&data).unwrap());

        assert_eq!(json.sequence, Some(3));
        assert_eq!(json.length_seconds, Some(65.0));
        let value = serde_json::to_value(&json).unwrap();
        assert_eq!(value["tags"][0]["name"], "_lib");
        assert_eq!(value["crc"], "00000000");
    }
}
