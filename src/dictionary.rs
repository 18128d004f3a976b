//! Structured editing of OpenFOAM dictionary files.
//!
//! Only top-level `keyword value;` entries are addressable. Comments, quoted
//! strings, `#` directives and `{ }` sub-dictionaries (including the
//! `FoamFile` header) are skipped while scanning, so a keyword mentioned in
//! any of them is never edited. All text outside the edited values is
//! preserved byte for byte.

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DictionaryError {
    #[error("unterminated block comment starting at byte {0}")]
    UnterminatedComment(usize),

    #[error("unterminated string starting at byte {0}")]
    UnterminatedString(usize),

    #[error("unbalanced '{{' starting at byte {0}")]
    UnterminatedBlock(usize),

    #[error("unexpected '}}' at byte {0}")]
    UnexpectedBrace(usize),

    #[error("entry '{0}' is missing its terminating ';'")]
    UnterminatedEntry(String),
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    value: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct FoamDictionary {
    text: String,
    entries: Vec<Entry>,
}

impl FoamDictionary {
    pub fn parse(text: impl Into<String>) -> Result<Self, DictionaryError> {
        let text = text.into();
        let entries = scan_entries(&text)?;
        Ok(FoamDictionary { text, entries })
    }

    /// Raw value text of the last top-level entry named `key`, the one
    /// OpenFOAM applies when a keyword is repeated.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rfind(|e| e.key == key)
            .map(|e| &self.text[e.value.clone()])
    }

    /// Replaces the value of every top-level `key`, or appends a new entry
    /// at the end of the text when there is none.
    pub fn set(&mut self, key: &str, value: &str) {
        if !self.entries.iter().any(|e| e.key == key) {
            self.append(key, value);
            return;
        }

        // entries are kept in text order
        let mut text = String::with_capacity(self.text.len());
        let mut copied = 0;
        for entry in &mut self.entries {
            text.push_str(&self.text[copied..entry.value.start]);
            let start = text.len();
            if entry.key == key {
                text.push_str(value);
            } else {
                text.push_str(&self.text[entry.value.clone()]);
            }
            copied = entry.value.end;
            entry.value = start..text.len();
        }
        text.push_str(&self.text[copied..]);
        self.text = text;
    }

    fn append(&mut self, key: &str, value: &str) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }

        let prefix = format!("{:<15} ", key);
        let start = self.text.len() + prefix.len();
        self.text.push_str(&prefix);
        self.text.push_str(value);
        self.text.push_str(";\n");

        self.entries.push(Entry {
            key: key.to_string(),
            value: start..start + value.len(),
        });
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for FoamDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Applies `edits` to the dictionary at `path` in place.
pub fn edit_dictionary_file(path: &Path, edits: &[(&str, String)]) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dictionary: {:?}", path))?;
    let mut dict = FoamDictionary::parse(text)
        .with_context(|| format!("Failed to parse dictionary: {:?}", path))?;

    for (key, value) in edits {
        match dict.get(key) {
            Some(old) => info!("{:?}: {} {} -> {}", path, key, old, value),
            None => info!("{:?}: adding {} {}", path, key, value),
        }
        dict.set(key, value);
    }

    fs::write(path, dict.into_string())
        .with_context(|| format!("Failed to write dictionary: {:?}", path))?;
    Ok(())
}

fn scan_entries(text: &str) -> Result<Vec<Entry>, DictionaryError> {
    let bytes = text.as_bytes();
    let mut entries = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if let Some(next) = skip_comment(bytes, i)? {
            i = next;
            continue;
        }
        match bytes[i] {
            b'#' => {
                i = line_end(bytes, i);
                continue;
            }
            b'}' => return Err(DictionaryError::UnexpectedBrace(i)),
            b';' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let key_start = i;
        i = if bytes[i] == b'"' {
            skip_string(bytes, i)?
        } else {
            token_end(bytes, i)
        };
        let key = text[key_start..i].to_string();

        i = skip_trivia(bytes, i)?;
        if i < bytes.len() && bytes[i] == b'{' {
            i = skip_block(bytes, i)?;
            continue;
        }

        let value_start = i;
        let terminator =
            find_terminator(bytes, i)?.ok_or_else(|| DictionaryError::UnterminatedEntry(key.clone()))?;
        let value_end = value_start + text[value_start..terminator].trim_end().len();
        entries.push(Entry {
            key,
            value: value_start..value_end,
        });
        i = terminator + 1;
    }

    Ok(entries)
}

fn line_end(bytes: &[u8], i: usize) -> usize {
    bytes[i..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| i + offset)
}

// Position after the comment starting at `i`, if one does
fn skip_comment(bytes: &[u8], i: usize) -> Result<Option<usize>, DictionaryError> {
    if bytes[i] != b'/' || i + 1 >= bytes.len() {
        return Ok(None);
    }
    match bytes[i + 1] {
        b'/' => Ok(Some(line_end(bytes, i))),
        b'*' => bytes[i + 2..]
            .windows(2)
            .position(|w| w == b"*/")
            .map(|offset| Some(i + 2 + offset + 2))
            .ok_or(DictionaryError::UnterminatedComment(i)),
        _ => Ok(None),
    }
}

fn skip_trivia(bytes: &[u8], mut i: usize) -> Result<usize, DictionaryError> {
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
        } else if let Some(next) = skip_comment(bytes, i)? {
            i = next;
        } else {
            break;
        }
    }
    Ok(i)
}

fn skip_string(bytes: &[u8], i: usize) -> Result<usize, DictionaryError> {
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'"' => return Ok(j + 1),
            _ => j += 1,
        }
    }
    Err(DictionaryError::UnterminatedString(i))
}

fn token_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        let b = bytes[i];
        let comment = b == b'/' && matches!(bytes.get(i + 1), Some(b'/' | b'*'));
        if b.is_ascii_whitespace() || matches!(b, b'{' | b'}' | b';' | b'"') || comment {
            break;
        }
        i += 1;
    }
    i
}

fn skip_block(bytes: &[u8], start: usize) -> Result<usize, DictionaryError> {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        if let Some(next) = skip_comment(bytes, i)? {
            i = next;
            continue;
        }
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(DictionaryError::UnterminatedBlock(start))
}

// Index of the `;` closing the value that starts at `i`
fn find_terminator(bytes: &[u8], mut i: usize) -> Result<Option<usize>, DictionaryError> {
    let mut depth = 0usize;
    while i < bytes.len() {
        if let Some(next) = skip_comment(bytes, i)? {
            i = next;
            continue;
        }
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'(' | b'{' => depth += 1,
            b')' | b'}' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => return Ok(Some(i)),
            _ => {}
        }
        i += 1;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONTROL_DICT: &str = r#"/*--------------------------------*- C++ -*----------------------------------*\
  =========                 |
  \\      /  F ield         | OpenFOAM
\*---------------------------------------------------------------------------*/
FoamFile
{
    version     2.0;
    format      ascii;
    class       dictionary;
    location    "system";
    object      controlDict;
}
// * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * //

application     icoFoam;

startFrom       startTime;

startTime       0;

stopAt          endTime;

// endTime      99;
endTime         0.5;

deltaT          0.005;

writeControl    timeStep;

writeInterval   20;

functions
{
    forces
    {
        type        forceCoeffs;
        deltaT      1;
    }
}

// ************************************************************************* //
"#;

    #[test]
    fn reads_top_level_entries_only() {
        let dict = FoamDictionary::parse(CONTROL_DICT).expect("parse");
        assert_eq!(dict.get("endTime"), Some("0.5"));
        assert_eq!(dict.get("stopAt"), Some("endTime"));
        assert_eq!(dict.get("deltaT"), Some("0.005"));
        assert_eq!(dict.get("object"), None);
        assert_eq!(dict.get("type"), None);
        assert_eq!(dict.get("application"), Some("icoFoam"));
        assert_eq!(dict.get("writeInterval"), Some("20"));
        assert_eq!(dict.get("functions"), None);
        assert_eq!(dict.get("forces"), None);
    }

    #[test]
    fn set_replaces_values_and_keeps_everything_else() {
        let mut dict = FoamDictionary::parse(CONTROL_DICT).expect("parse");
        dict.set("endTime", "12.5");
        dict.set("deltaT", "0.01");
        dict.set("writeControl", "runTime");
        dict.set("writeInterval", "0.1");

        assert_eq!(dict.get("writeInterval"), Some("0.1"));
        assert_eq!(dict.get("stopAt"), Some("endTime"));

        let text = dict.to_string();
        assert!(text.contains("endTime         12.5;\n"));
        assert!(text.contains("// endTime      99;"));
        assert!(text.contains("deltaT          0.01;\n"));
        assert!(text.contains("        deltaT      1;"));
        assert!(text.contains("writeControl    runTime;"));

        let expected = CONTROL_DICT
            .replace("0.5;", "12.5;")
            .replace("0.005;", "0.01;")
            .replace("timeStep;", "runTime;")
            .replace("writeInterval   20;", "writeInterval   0.1;");
        assert_eq!(text, expected);
    }

    #[test]
    fn set_appends_missing_entries() {
        let mut dict = FoamDictionary::parse("transportModel  Newtonian;").expect("parse");
        dict.set("nu", "[0 2 -1 0 0 0 0] 1e-05");

        assert_eq!(
            dict.to_string(),
            "transportModel  Newtonian;\nnu              [0 2 -1 0 0 0 0] 1e-05;\n"
        );
        assert_eq!(dict.get("nu"), Some("[0 2 -1 0 0 0 0] 1e-05"));

        let reparsed = FoamDictionary::parse(dict.into_string()).expect("reparse");
        assert_eq!(reparsed.get("nu"), Some("[0 2 -1 0 0 0 0] 1e-05"));
    }

    #[test]
    fn repeated_keywords_are_all_replaced() {
        let mut dict = FoamDictionary::parse("endTime 1;\ndeltaT 0.1;\nendTime 5;\n").expect("parse");
        assert_eq!(dict.get("endTime"), Some("5"));

        dict.set("endTime", "2.5");
        dict.set("deltaT", "0.05");
        assert_eq!(dict.get("endTime"), Some("2.5"));
        assert_eq!(dict.to_string(), "endTime 2.5;\ndeltaT 0.05;\nendTime 2.5;\n");
    }

    #[test]
    fn list_values_span_to_their_terminator() {
        let dict = FoamDictionary::parse("points ( (0 0 0) (1 0 0) );\nnext 1;").expect("parse");
        assert_eq!(dict.get("points"), Some("( (0 0 0) (1 0 0) )"));
        assert_eq!(dict.get("next"), Some("1"));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            FoamDictionary::parse("a 1; /* open").unwrap_err(),
            DictionaryError::UnterminatedComment(5)
        );
        assert_eq!(
            FoamDictionary::parse("FoamFile { a 1;").unwrap_err(),
            DictionaryError::UnterminatedBlock(9)
        );
        assert_eq!(
            FoamDictionary::parse("endTime 1").unwrap_err(),
            DictionaryError::UnterminatedEntry("endTime".to_string())
        );
        assert_eq!(
            FoamDictionary::parse("}").unwrap_err(),
            DictionaryError::UnexpectedBrace(0)
        );
    }

    #[test]
    fn edits_file_in_place() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("transportProperties");
        fs::write(
            &path,
            "FoamFile\n{\n    object transportProperties;\n}\n\ntransportModel  Newtonian;\n\nnu              [0 2 -1 0 0 0 0] 0.01;\n",
        )
        .expect("write");

        edit_dictionary_file(&path, &[("nu", "[0 2 -1 0 0 0 0] 0.0001".to_string())])
            .expect("edit");

        let text = fs::read_to_string(&path).expect("read");
        assert!(text.ends_with("nu              [0 2 -1 0 0 0 0] 0.0001;\n"));
        assert!(text.contains("transportModel  Newtonian;"));
    }
}
