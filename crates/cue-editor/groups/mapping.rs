//! Mapping micro-format: one `KEY=path` per line.
//!
//! ```text
//! AUDIO=take1.wav
//! TRANSCRIPT=take1.transcript
//! SCRIPT=../shared/take1.script
//! ```
//!
//! Keys are `AUDIO`, `VIDEO`, `TRANSCRIPT`, `SCRIPT`, case-insensitive.
//! `AUDIO`/`VIDEO` may repeat; `TRANSCRIPT` and `SCRIPT` are unique per
//! mapping. Blank lines are skipped. Relative paths resolve against the
//! mapping file's directory. Diagnostics carry 1-based line numbers.

use std::path::{Path, PathBuf};

use crate::core::errors::{EditorError, Result};
use crate::groups::ListenerRole;

/// One parsed mapping line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub role: ListenerRole,
    pub path: PathBuf,
}

/// Parse mapping text, resolving relative paths against `base_dir`.
pub fn parse(text: &str, base_dir: &Path) -> Result<Vec<MappingEntry>> {
    let mut entries: Vec<MappingEntry> = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(EditorError::mapping_syntax(line_no, "expected KEY=path"));
        };
        let key = key.trim();
        let Some(role) = ListenerRole::from_key(key) else {
            return Err(EditorError::mapping_syntax(
                line_no,
                format!("unknown key '{key}'"),
            ));
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(EditorError::mapping_syntax(line_no, "empty path"));
        }
        if !role.is_passive() && entries.iter().any(|entry| entry.role == role) {
            return Err(EditorError::mapping_syntax(
                line_no,
                format!("duplicate {} entry", role.as_str()),
            ));
        }
        let path = Path::new(value);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };
        entries.push(MappingEntry { role, path });
    }
    Ok(entries)
}

/// Read and parse a mapping file.
pub fn load(path: &Path) -> Result<Vec<MappingEntry>> {
    let text = std::fs::read_to_string(path).map_err(|err| EditorError::io(path, &err))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    parse(&text, base)
}

/// The conventional mapping-file path next to an artifact: same stem,
/// `.mapping` extension.
#[must_use]
pub fn sibling_mapping_path(artifact: &Path) -> PathBuf {
    artifact.with_extension("mapping")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_roles_and_resolves_relative_paths() {
        let text = "AUDIO=take.wav\n\nTRANSCRIPT=words/take.transcript\nSCRIPT=/abs/take.script\n";
        let entries = parse(text, Path::new("/media")).unwrap();
        assert_eq!(
            entries,
            vec![
                MappingEntry {
                    role: ListenerRole::Audio,
                    path: PathBuf::from("/media/take.wav"),
                },
                MappingEntry {
                    role: ListenerRole::Transcript,
                    path: PathBuf::from("/media/words/take.transcript"),
                },
                MappingEntry {
                    role: ListenerRole::Script,
                    path: PathBuf::from("/abs/take.script"),
                },
            ]
        );
    }

    #[test]
    fn keys_are_case_insensitive_and_media_may_repeat() {
        let text = "audio=a.wav\nAudio=b.wav\nvideo=c.mp4\n";
        let entries = parse(text, Path::new(".")).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn duplicate_transcript_reports_its_line() {
        let text = "TRANSCRIPT=a.transcript\nAUDIO=a.wav\nTRANSCRIPT=b.transcript\n";
        let err = parse(text, Path::new(".")).unwrap_err();
        assert_eq!(
            err,
            EditorError::mapping_syntax(3, "duplicate TRANSCRIPT entry")
        );
    }

    #[test]
    fn missing_equals_sign_reports_its_line() {
        let err = parse("AUDIO a.wav\n", Path::new(".")).unwrap_err();
        assert_eq!(err, EditorError::mapping_syntax(1, "expected KEY=path"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = parse("SUBTITLES=a.srt\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, EditorError::MappingSyntax { line: 1, .. }));
    }

    #[test]
    fn sibling_mapping_swaps_the_extension() {
        assert_eq!(
            sibling_mapping_path(Path::new("/takes/one.transcript")),
            PathBuf::from("/takes/one.mapping")
        );
    }
}
