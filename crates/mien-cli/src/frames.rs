//! JSON-lines frame streams: one landmark array per line.

use anyhow::{Context, Result};
use mien_core::LandmarkSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Open `path` for reading, or stdin when `path` is `-`.
pub fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("opening frame stream {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Parse one frame line. `null` and `[]` mean no face was found.
pub fn parse_frame(line: &str) -> Result<Option<LandmarkSet>, serde_json::Error> {
    let frame: Option<LandmarkSet> = serde_json::from_str(line)?;
    Ok(frame.filter(|set| !set.is_empty()))
}

/// Yields one entry per non-blank line; errors carry the 1-based line number.
pub fn read_frames<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Option<LandmarkSet>>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line_no = i + 1;
            match line {
                Ok(text) if text.trim().is_empty() => None,
                Ok(text) => Some(
                    parse_frame(text.trim()).with_context(|| format!("malformed frame on line {line_no}")),
                ),
                Err(e) => Some(Err(e).with_context(|| format!("reading line {line_no}"))),
            }
        })
}
