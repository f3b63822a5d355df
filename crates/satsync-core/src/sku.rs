//! Loading article lists from plain-text files.

use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Read a newline-delimited SKU list.
///
/// Blank lines and lines starting with `#` are ignored; surrounding
/// whitespace is trimmed.
///
/// # Errors
///
/// Returns [`io::Error`] if the file cannot be opened or read.
pub fn load_skus_from_file(path: &Path) -> Result<Vec<String>, io::Error> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut skus = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let sku = line.trim();
        if sku.is_empty() || sku.starts_with('#') {
            continue;
        }
        skus.push(sku.to_string());
    }
    Ok(skus)
}
