//! Packed response bundles.

use std::io::{Cursor, Read};

use entsoe_shared::{EntsoeError, Result};

/// Leading bytes of a zip local file header.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Whether a response carries a zip bundle, by content type or signature.
pub fn is_archive(content_type: Option<&str>, body: &[u8]) -> bool {
    let declared = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("zip"));
    declared || body.starts_with(ZIP_MAGIC)
}

/// Unpack every file of a zip bundle as `(name, bytes)`, in archive order.
pub fn unpack(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| EntsoeError::Archive(format!("not a readable zip: {e}")))?;

    let mut files = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| EntsoeError::Archive(format!("entry {i}: {e}")))?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| EntsoeError::Archive(format!("{name}: {e}")))?;
        files.push((name, content));
    }
    Ok(files)
}

#[cfg(test)]
pub(crate) fn pack(files: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(content.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_returns_files_in_order() {
        let bytes = pack(&[("a.xml", "<a/>"), ("b.xml", "<b/>")]);
        assert!(is_archive(None, &bytes));

        let files = unpack(&bytes).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].0, "a.xml");
        assert_eq!(files[1].1, b"<b/>");
    }

    #[test]
    fn xml_is_not_an_archive() {
        assert!(!is_archive(Some("text/xml"), b"<doc/>"));
        assert!(!is_archive(None, b"<doc/>"));
        assert!(is_archive(Some("application/zip"), b"PK\x03\x04"));
    }

    #[test]
    fn garbage_fails_to_unpack() {
        assert!(matches!(
            unpack(b"PK not really"),
            Err(EntsoeError::Archive(_))
        ));
    }
}
