//! Zip bundle of the generated documents.

use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Build an in-memory zip archive from `(file name, contents)` pairs.
pub fn build_bundle(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in entries {
        writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {} to bundle", name))?;
        writer.write_all(data)?;
    }

    let cursor = writer.finish().context("Failed to finish bundle")?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_bundle_contains_entries() {
        let entries = vec![
            ("NTCB_COA_Niacinamide.pdf".to_string(), b"coa".to_vec()),
            ("NTCB_MSDS_Niacinamide.pdf".to_string(), b"msds".to_vec()),
            ("NTCB_TDS_Niacinamide.pdf".to_string(), b"tds".to_vec()),
        ];
        let bytes = build_bundle(&entries).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);

        let mut contents = String::new();
        archive
            .by_name("NTCB_MSDS_Niacinamide.pdf")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "msds");
    }
}
