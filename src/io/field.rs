use crate::config::FieldKind;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads one field dump and returns its samples in file order.
///
/// Vector samples are reduced to their magnitude. A file without a
/// `(` ... `)` data block yields an empty vector; only I/O failures are errors.
pub fn read_field_file(path: &Path, kind: FieldKind) -> Result<Vec<f64>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read field file: {:?}", path))?;

    let values = parse_field(&content, kind);
    debug!("Extracted {} {:?} values from {:?}", values.len(), kind, path);
    Ok(values)
}

pub fn parse_field(content: &str, kind: FieldKind) -> Vec<f64> {
    let Some((start, end)) = data_block(content) else {
        debug!("Could not find data section markers");
        return Vec::new();
    };

    let lines = content.lines().skip(start).take(end - start);
    match kind {
        FieldKind::Vector => lines.filter_map(vector_magnitude).collect(),
        FieldKind::Scalar => lines.filter_map(|line| line.trim().parse::<f64>().ok()).collect(),
    }
}

// Line range between the last bare "(" and the first bare ")" after it
fn data_block(content: &str) -> Option<(usize, usize)> {
    let mut start = None;
    for (idx, line) in content.lines().enumerate() {
        match line.trim() {
            "(" => start = Some(idx + 1),
            ")" => return start.map(|s| (s, idx)),
            _ => {}
        }
    }
    None
}

fn vector_magnitude(line: &str) -> Option<f64> {
    if !(line.contains('(') && line.contains(')')) {
        return None;
    }

    let inner = line.trim().trim_matches(|c| c == '(' || c == ')');
    let mut components = 0;
    let mut sum_sq = 0.0;
    for token in inner.split_whitespace() {
        let value = token.parse::<f64>().ok()?;
        components += 1;
        sum_sq += value * value;
    }

    (components == 3).then(|| sum_sq.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VECTOR_FIELD: &str = r#"/*--------------------------------*- C++ -*----------------------------------*\
FoamFile
{
    version     2.0;
    format      ascii;
    class       volVectorField;
    object      U;
}
// * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * //

dimensions      [0 1 -1 0 0 0 0];

internalField   nonuniform List<vector>
4
(
(3 4 0)
(1 2 2)
(oops 1 1)
(0.5 0.5 0.5 0.5)
(-1e-3 0 0)
)
;

boundaryField
{
    inlet
    {
        type            fixedValue;
        value           uniform (1 0 0);
    }
}
"#;

    const SCALAR_FIELD: &str = r#"FoamFile
{
    class       volScalarField;
    object      p;
}
dimensions      [0 2 -2 0 0 0 0];

internalField   nonuniform List<scalar>
3
(
0.25
-1.5
not-a-number
3e-2
)
;
"#;

    #[test]
    fn vector_field_yields_magnitudes_in_order() {
        let values = parse_field(VECTOR_FIELD, FieldKind::Vector);
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], 5.0);
        assert_eq!(values[1], 3.0);
        assert!((values[2] - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn scalar_field_skips_unparseable_lines() {
        let values = parse_field(SCALAR_FIELD, FieldKind::Scalar);
        assert_eq!(values, vec![0.25, -1.5, 3e-2]);
    }

    #[test]
    fn missing_markers_give_empty_result() {
        let uniform = "internalField   uniform (0 0 0);\nboundaryField\n{\n}\n";
        assert!(parse_field(uniform, FieldKind::Vector).is_empty());
        assert!(parse_field("(\n1\n2\n", FieldKind::Scalar).is_empty());
        assert!(parse_field(")\n1\n(\n", FieldKind::Scalar).is_empty());
    }

    #[test]
    fn only_first_block_is_read() {
        let content = "(\n1\n)\n(\n2\n)\n";
        assert_eq!(parse_field(content, FieldKind::Scalar), vec![1.0]);
    }

    #[test]
    fn reads_from_disk() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("p");
        fs::write(&path, SCALAR_FIELD).expect("write");

        let values = read_field_file(&path, FieldKind::Scalar).expect("read");
        assert_eq!(values.len(), 3);

        assert!(read_field_file(&tmp.path().join("U"), FieldKind::Vector).is_err());
    }
}
