//! Pipe-delimited compact device listing
//!
//! Each line holds at least three `|`-separated columns; extra columns are
//! ignored and shorter lines are dropped.

use std::fs;
use std::path::Path;

/// One row of the compact listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactRow {
    pub first: String,
    pub second: String,
    pub third: String,
}

/// Parse compact listing text
pub fn parse_compact(content: &str) -> Vec<CompactRow> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if parts.len() >= 3 {
                Some(CompactRow {
                    first: parts[0].to_string(),
                    second: parts[1].to_string(),
                    third: parts[2].to_string(),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Load the compact listing; a missing file yields no rows
pub fn load_compact(path: impl AsRef<Path>) -> std::io::Result<Vec<CompactRow>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(parse_compact(&content))
}
