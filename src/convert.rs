//! SDAT to NCSF conversion
//!
//! The whole SDAT goes into one `.ncsflib`; every sequence gets a
//! `.minincsf` that names the library and carries its sequence number in
//! the reserved section, plus `length` and `fade` tags when timing is on.

use crate::error::{Error, Result};
use crate::ncsf::{write_ncsf, SequenceReport, TagList, LIB_EXTENSION, MINI_EXTENSION};
use crate::player::{resolve_length, LengthConfig, SequenceProgram};
use crate::sdat::{RecordKind, Sdat};
use log::{info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Conversion settings
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Detect sequence lengths and write `length`/`fade` tags
    pub time: bool,
    /// Only convert these sequence numbers
    pub sequences: Option<Vec<usize>>,
    pub length: LengthConfig,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            time: true,
            sequences: None,
            length: LengthConfig::default(),
        }
    }
}

/// SDAT to NCSF converter
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Convert `input` into an `.ncsflib` plus one `.minincsf` per sequence
    /// in `out_dir`. Returns one report per written sequence.
    pub fn convert_file(&self, input: &Path, out_dir: &Path) -> Result<Vec<SequenceReport>> {
        let data = fs::read(input).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open '{}': {}", input.display(), e),
            ))
        })?;
        let sdat = Sdat::read(data)?;

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sdat".to_string());
        fs::create_dir_all(out_dir)?;

        let lib_name = format!("{}.{}", sanitize_file_name(&stem), LIB_EXTENSION);
        write_ncsf(&out_dir.join(&lib_name), &[], sdat.as_bytes(), &TagList::new())?;
        info!("Wrote {}", lib_name);

        self.convert_sequences(&sdat, &lib_name, out_dir)
    }

    fn convert_sequences(
        &self,
        sdat: &Sdat,
        lib_name: &str,
        out_dir: &Path,
    ) -> Result<Vec<SequenceReport>> {
        let indices: Vec<usize> = match &self.options.sequences {
            Some(selected) => selected.clone(),
            None => (0..sdat.sequence_count()).collect(),
        };

        let mut used_names = HashSet::new();
        let mut reports = Vec::new();
        for index in indices {
            let Some(seq_info) = sdat.seq_info(index) else {
                if self.options.sequences.is_some() {
                    return Err(Error::MissingSequence(index));
                }
                continue;
            };
            let name = sdat.entry_name(RecordKind::Seq, index);

            let mut file_name = format!("{}.{}", sanitize_file_name(&name), MINI_EXTENSION);
            if !used_names.insert(file_name.to_ascii_lowercase()) {
                file_name = format!("{}_{:04}.{}", sanitize_file_name(&name), index, MINI_EXTENSION);
                used_names.insert(file_name.to_ascii_lowercase());
            }

            let mut tags = TagList::new();
            tags.set("_lib", lib_name);

            let report = if self.options.time {
                match SequenceProgram::load(sdat, index) {
                    Ok(program) => Some(resolve_length(
                        &name,
                        &program,
                        seq_info.vol,
                        &mut tags,
                        &self.options.length,
                    )),
                    Err(e) => {
                        warn!("{}: unable to load sequence: {}", name, e);
                        None
                    }
                }
            } else {
                None
            };

            let reserved = (index as u32).to_le_bytes();
            write_ncsf(&out_dir.join(&file_name), &reserved, &[], &tags)?;
            info!("Wrote {}", file_name);
            reports.push(SequenceReport::new(index, &name, &file_name, report.as_ref()));
        }
        Ok(reports)
    }
}

/// Replace characters that are not valid in file names
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ncsf::NcsfFile;
    use crate::sdat::testing::build_sdat;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("BGM_TITLE"), "BGM_TITLE");
        assert_eq!(sanitize_file_name("a/b:c"), "a_b_c");
        assert_eq!(sanitize_file_name(" .. "), "_");
    }

    #[test]
    fn test_convert_without_timing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("game.sdat");
        fs::write(
            &input,
            build_sdat(&[("SEQ_A", vec![0xFF], 127), ("SEQ_A", vec![0xFF], 100)]),
        )
        .unwrap();

        let converter = Converter::new(ConvertOptions {
            time: false,
            ..Default::default()
        });
        let out = dir.path().join("out");
        let reports = converter.convert_file(&input, &out).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].file, "SEQ_A.minincsf");
        assert_eq!(reports[1].file, "SEQ_A_0001.minincsf");
        assert!(out.join("game.ncsflib").exists());

        let mini = NcsfFile::from_path(&out.join("SEQ_A_0001.minincsf")).unwrap();
        assert_eq!(mini.sequence_number(), Some(1));
        assert_eq!(mini.tags.get("_lib"), Some("game.ncsflib"));
        assert!(!mini.tags.contains("length"));
    }

    #[test]
    fn test_convert_with_timing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("game.sdat");
        let looping = vec![0xD4, 0x00, 0x80, 0x20, 0xFC];
        fs::write(
            &input,
            build_sdat(&[("BGM", looping, 127), ("SE", vec![0xFF], 127)]),
        )
        .unwrap();

        let mut options = ConvertOptions::default();
        options.length.poll_interval = std::time::Duration::from_millis(20);
        options.length.scan_polls = 50;
        options.length.render_polls = 50;
        let reports = Converter::new(options)
            .convert_file(&input, dir.path())
            .unwrap();

        assert_eq!(reports[0].length.as_deref(), Some("0:01"));
        let bgm = NcsfFile::from_path(&dir.path().join("BGM.minincsf")).unwrap();
        assert_eq!(bgm.tags.get("fade"), Some("10"));

        let se = NcsfFile::from_path(&dir.path().join("SE.minincsf")).unwrap();
        assert_eq!(se.tags.get("length"), Some("0:01"));
        assert_eq!(se.tags.get("fade"), Some("0"));
        assert!(reports[1].silence_detected);
    }

    #[test]
    fn test_missing_selected_sequence() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("game.sdat");
        fs::write(&input, build_sdat(&[("SEQ", vec![0xFF], 127)])).unwrap();

        let converter = Converter::new(ConvertOptions {
            time: false,
            sequences: Some(vec![5]),
            ..Default::default()
        });
        assert!(matches!(
            converter.convert_file(&input, dir.path()),
            Err(Error::MissingSequence(5))
        ));
    }
}
