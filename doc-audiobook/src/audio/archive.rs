//! ZIP packaging of individual fragments, used when merging fails.

use super::CombineError;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Pack the given files into an in-memory ZIP archive.
///
/// Entries are stored uncompressed under their file names, in input order.
pub fn build_zip_archive(files: &[&Path]) -> Result<Vec<u8>, CombineError> {
    if files.is_empty() {
        return Err(CombineError::NoInputs);
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CombineError::Archive(format!("{} has no file name", path.display())))?;

        let bytes = std::fs::read(path)?;
        zip.start_file(name, options)
            .map_err(|e| CombineError::Archive(e.to_string()))?;
        zip.write_all(&bytes)?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| CombineError::Archive(e.to_string()))?;
    Ok(cursor.into_inner())
}
