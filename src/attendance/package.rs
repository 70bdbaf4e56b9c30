use std::io::{Cursor, Write};

use chrono::NaiveDateTime;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::attendance::error::ProcessError;

pub fn archive_name(at: NaiveDateTime) -> String {
    format!("attendance_reports_{}.zip", at.format("%Y%m%d_%H%M%S"))
}

/// Bundle the generated files into one deflated archive held in memory.
pub fn zip_files(files: &[(&str, Vec<u8>)]) -> Result<Vec<u8>, ProcessError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in files {
        zip.start_file(*name, options).map_err(ProcessError::report)?;
        zip.write_all(bytes).map_err(ProcessError::report)?;
    }

    let cursor = zip.finish().map_err(ProcessError::report)?;
    Ok(cursor.into_inner())
}
