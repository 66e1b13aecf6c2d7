//! Model dump reader for XGBoost text and JSON dumps.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads the per-tree dump strings of one booster.
///
/// Two layouts are accepted:
/// - text, as written by `Booster.dump_model`: each tree is introduced by a
///   `booster[<i>]:` header line, numbered from 0 in order;
/// - JSON (`.json` extension): an array of per-tree dump strings, as
///   returned by `Booster.get_dump()`.
///
/// Tree bodies are returned verbatim; grammar checks happen when the
/// ensemble is parsed.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`]         | File doesn't exist or is unreadable |
/// | [`IoError::JsonParse`]            | JSON file is not an array of strings |
/// | [`IoError::MissingBoosterHeader`] | Text before the first header |
/// | [`IoError::BoosterOutOfOrder`]    | Header index is not the next in sequence |
/// | [`IoError::EmptyModel`]           | No trees in the file |
pub struct DumpReader {
    path: PathBuf,
}

impl DumpReader {
    /// Create a new reader for the given dump file.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read the file and return one dump string per tree.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<String>, IoError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let is_json = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let dumps = if is_json {
            debug!("reading JSON dump");
            serde_json::from_str::<Vec<String>>(&text).map_err(|e| IoError::JsonParse {
                path: self.path.clone(),
                source: e,
            })?
        } else {
            split_boosters(&text, &self.path)?
        };

        if dumps.is_empty() {
            return Err(IoError::EmptyModel {
                path: self.path.clone(),
            });
        }

        info!(n_trees = dumps.len(), "model dump loaded");
        Ok(dumps)
    }
}

/// Split a `dump_model` text file into per-tree bodies.
fn split_boosters(text: &str, path: &Path) -> Result<Vec<String>, IoError> {
    let mut dumps: Vec<String> = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line_number = i + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some(found) = booster_header(line) {
            if found != dumps.len() {
                return Err(IoError::BoosterOutOfOrder {
                    path: path.to_path_buf(),
                    line_number,
                    expected: dumps.len(),
                    found,
                });
            }
            dumps.push(String::new());
            continue;
        }

        match dumps.last_mut() {
            Some(body) => {
                body.push_str(line);
                body.push('\n');
            }
            None if line.trim().is_empty() => {}
            None => {
                return Err(IoError::MissingBoosterHeader {
                    path: path.to_path_buf(),
                    line_number,
                });
            }
        }
    }
    Ok(dumps)
}

/// Parse a `booster[<i>]:` header line.
fn booster_header(line: &str) -> Option<usize> {
    let digits = line
        .trim()
        .strip_prefix("booster[")?
        .strip_suffix("]:")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TWO_TREES: &str = "\
booster[0]:
0:[f0<0.5] yes=1,no=2,missing=1
\t1:leaf=-0.2
\t2:leaf=0.4
booster[1]:
0:leaf=0.1
";

    fn write_file(content: &str, suffix: &str) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_text_dump() {
        let f = write_file(TWO_TREES, ".txt");
        let dumps = DumpReader::new(f.path()).read().unwrap();
        assert_eq!(dumps.len(), 2);
        assert_eq!(
            dumps[0],
            "0:[f0<0.5] yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t2:leaf=0.4\n"
        );
        assert_eq!(dumps[1], "0:leaf=0.1\n");
    }

    #[test]
    fn read_text_dump_with_crlf() {
        let f = write_file(&TWO_TREES.replace('\n', "\r\n"), ".txt");
        let dumps = DumpReader::new(f.path()).read().unwrap();
        assert_eq!(dumps[1], "0:leaf=0.1\n");
    }

    #[test]
    fn leading_blank_lines_are_ignored() {
        let f = write_file(&format!("\n\n{TWO_TREES}"), ".txt");
        assert_eq!(DumpReader::new(f.path()).read().unwrap().len(), 2);
    }

    #[test]
    fn read_json_dump() {
        let json = r#"["0:leaf=0.5\n", "0:[f1<2] yes=1,no=2,missing=1\n\t1:leaf=1\n\t2:leaf=2\n"]"#;
        let f = write_file(json, ".json");
        let dumps = DumpReader::new(f.path()).read().unwrap();
        assert_eq!(dumps.len(), 2);
        assert_eq!(dumps[0], "0:leaf=0.5\n");
        assert!(dumps[1].starts_with("0:[f1<2]"));
    }

    #[test]
    fn error_file_not_found() {
        let result = DumpReader::new(Path::new("/nonexistent/model.txt")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_text_before_header() {
        let f = write_file("0:leaf=0.1\nbooster[0]:\n0:leaf=0.2\n", ".txt");
        let result = DumpReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::MissingBoosterHeader { line_number: 1, .. })
        ));
    }

    #[test]
    fn error_out_of_order_header() {
        let f = write_file("booster[0]:\n0:leaf=0.1\nbooster[2]:\n0:leaf=0.2\n", ".txt");
        let result = DumpReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::BoosterOutOfOrder {
                line_number: 3,
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn error_empty_model() {
        let f = write_file("\n", ".txt");
        assert!(matches!(
            DumpReader::new(f.path()).read(),
            Err(IoError::EmptyModel { .. })
        ));
        let f = write_file("[]", ".json");
        assert!(matches!(
            DumpReader::new(f.path()).read(),
            Err(IoError::EmptyModel { .. })
        ));
    }

    #[test]
    fn error_bad_json() {
        let f = write_file(r#"{"trees": 3}"#, ".json");
        assert!(matches!(
            DumpReader::new(f.path()).read(),
            Err(IoError::JsonParse { .. })
        ));
    }

    #[test]
    fn header_parsing() {
        assert_eq!(booster_header("booster[12]:"), Some(12));
        assert_eq!(booster_header("  booster[0]:  "), Some(0));
        assert_eq!(booster_header("booster[]:"), None);
        assert_eq!(booster_header("booster[1]"), None);
        assert_eq!(booster_header("0:leaf=1"), None);
    }
}
