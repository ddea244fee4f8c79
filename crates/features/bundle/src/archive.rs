//! Zip packaging of a rendered bundle.

use crate::error::{BundleError, BundleErrorExt};
use crate::renderer::RenderedBundle;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Deflate level used for every entry (maximum).
pub const COMPRESSION_LEVEL: i64 = 9;

/// Builds the complete archive in memory, entries in bundle order.
///
/// Nothing is handed out before the archive is finished, so a failure can never leak a
/// truncated archive.
///
/// # Errors
/// Returns [`BundleError::Zip`] if the encoder fails or [`BundleError::Archive`] if an entry
/// cannot be written.
pub fn assemble(bundle: &RenderedBundle) -> Result<Vec<u8>, BundleError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for document in bundle.documents() {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL))
            .unix_permissions(document.kind.unix_mode());

        writer
            .start_file(document.entry_name.as_str(), options)
            .context(format!("Failed to start entry {}", document.entry_name))?;
        writer
            .write_all(&document.content)
            .context(format!("Failed to write entry {}", document.entry_name))?;
    }

    let bytes = writer.finish().context("Failed to finalize archive")?.into_inner();
    debug!(entries = bundle.len(), bytes = bytes.len(), "Archive assembled");
    Ok(bytes)
}
