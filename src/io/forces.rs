use crate::config::{DRAG_KEY, FORCE_COEFFS_FILE, LIFT_KEY};
use crate::series::ForceCoefficients;
use crate::time_dirs::TimeDir;
use std::fs;
use tracing::debug;

/// Collects drag and lift coefficients from the given time steps of a case.
/// Steps without a coefficients file, or without both entries, are skipped.
pub fn collect_force_coefficients(time_dirs: &[TimeDir]) -> ForceCoefficients {
    let mut samples = Vec::new();

    for step in time_dirs {
        let path = step.path.join(FORCE_COEFFS_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No force coefficients for time {}: {}", step.name, e);
                continue;
            }
        };

        match (
            find_coefficient(&content, DRAG_KEY),
            find_coefficient(&content, LIFT_KEY),
        ) {
            (Some(drag), Some(lift)) => samples.push((step.time, drag, lift)),
            _ => debug!("Incomplete force coefficients in {:?}", path),
        }
    }

    ForceCoefficients::from_samples(samples)
}

/// Finds the first `<key> <number>;` entry where `key` stands as a whole word.
pub fn find_coefficient(content: &str, key: &str) -> Option<f64> {
    let mut search_from = 0;

    while let Some(offset) = content[search_from..].find(key) {
        let start = search_from + offset;
        let end = start + key.len();
        search_from = end;

        let preceded_by_word = content[..start]
            .chars()
            .next_back()
            .is_some_and(is_word_char);
        let rest = &content[end..];
        if preceded_by_word || !rest.starts_with(char::is_whitespace) {
            continue;
        }

        let Some(terminator) = rest.find(';') else {
            continue;
        };
        if let Ok(value) = rest[..terminator].trim().parse::<f64>() {
            return Some(value);
        }
    }

    None
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
