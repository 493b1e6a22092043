//! `.gem` extraction.
//!
//! A `.gem` is a plain tar holding `data.tar.gz` (the payload), `metadata.gz`
//! (the gzipped YAML gemspec) and usually `checksums.yaml.gz`. Extraction
//! runs in three steps: the outer tar into the unpack root, the payload into
//! `data/`, then `metadata.gz` is gunzipped in place.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::{GemError, GemLayout};

/// Counts from a finished unpack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackReport {
    /// Regular files written from the outer archive.
    pub outer_entries: usize,
    /// Regular files written into `data/`.
    pub data_files: usize,
    /// Entries skipped because they would land outside the destination.
    pub skipped_entries: usize,
}

/// Unpack the downloaded archive for `layout` into a fresh unpack root.
///
/// Blocking; async callers go through `tokio::task::spawn_blocking`.
///
/// # Errors
///
/// Returns [`GemError::Extraction`] if any archive is unreadable or a
/// required member is missing, and [`GemError::Io`] for filesystem failures.
pub fn unpack(layout: &GemLayout) -> Result<UnpackReport, GemError> {
    let archive_path = layout.archive_path();
    let file = File::open(&archive_path)
        .map_err(|e| GemError::extraction(&archive_path, e))?;

    layout.reset_unpack_dir()?;

    let mut report = UnpackReport::default();
    let outer = unpack_tar(BufReader::new(file), &layout.unpack_dir())
        .map_err(|e| GemError::extraction(&archive_path, e))?;
    report.outer_entries = outer.files;
    report.skipped_entries += outer.skipped;

    let data_archive = layout.data_archive();
    if !data_archive.is_file() {
        return Err(GemError::extraction(
            &archive_path,
            "archive has no data.tar.gz member",
        ));
    }
    let data = File::open(&data_archive).map_err(|e| GemError::extraction(&data_archive, e))?;
    let payload = unpack_tar(GzDecoder::new(BufReader::new(data)), &layout.data_dir())
        .map_err(|e| GemError::extraction(&data_archive, e))?;
    report.data_files = payload.files;
    report.skipped_entries += payload.skipped;

    gunzip_in_place(&layout.metadata_archive(), &layout.metadata_file())?;

    if report.skipped_entries > 0 {
        tracing::warn!(
            archive = %archive_path.display(),
            skipped = report.skipped_entries,
            "skipped archive entries outside the unpack root"
        );
    }
    tracing::debug!(
        archive = %archive_path.display(),
        outer = report.outer_entries,
        data = report.data_files,
        "archive unpacked"
    );
    Ok(report)
}

struct TarCounts {
    files: usize,
    skipped: usize,
}

/// Extract every entry of a tar stream into `dest`. Entries that would escape
/// `dest` (absolute paths, `..`) are skipped by `unpack_in` and counted.
fn unpack_tar<R: Read>(reader: R, dest: &Path) -> io::Result<TarCounts> {
    fs::create_dir_all(dest)?;
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(false);
    archive.set_overwrite(true);

    let mut counts = TarCounts {
        files: 0,
        skipped: 0,
    };
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_file = entry.header().entry_type().is_file();
        if entry.unpack_in(dest)? {
            if is_file {
                counts.files += 1;
            }
        } else {
            counts.skipped += 1;
        }
    }
    Ok(counts)
}

/// Decompress `archive` into `output` and delete `archive`.
fn gunzip_in_place(archive: &Path, output: &Path) -> Result<(), GemError> {
    if !archive.is_file() {
        return Err(GemError::extraction(
            archive,
            "archive has no metadata.gz member",
        ));
    }

    let input = File::open(archive).map_err(|e| GemError::extraction(archive, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(input));
    let mut out = BufWriter::new(File::create(output)?);
    io::copy(&mut decoder, &mut out).map_err(|e| GemError::extraction(archive, e))?;
    drop(out);
    fs::remove_file(archive)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, body) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *body).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn write_gem(layout: &GemLayout, outer: &[(&str, &[u8])]) {
        layout.ensure_download_dir().unwrap();
        fs::write(layout.archive_path(), tar_bytes(outer)).unwrap();
    }

    #[test]
    fn unpacks_data_and_metadata() {
        let temp = tempfile::tempdir().unwrap();
        let layout = GemLayout::new(temp.path(), "beta", "2.0.0").unwrap();
        let data = gzip(&tar_bytes(&[
            ("lib/beta.rb", b"module Beta; end\n"),
            ("README.md", b"# Beta\n"),
        ]));
        let metadata = gzip(b"--- !ruby/object:Gem::Specification\nname: beta\n");
        write_gem(
            &layout,
            &[("metadata.gz", &metadata), ("data.tar.gz", &data)],
        );

        let report = unpack(&layout).unwrap();

        assert_eq!(report.outer_entries, 2);
        assert_eq!(report.data_files, 2);
        assert_eq!(report.skipped_entries, 0);
        assert_eq!(
            fs::read_to_string(layout.data_file("lib/beta.rb")).unwrap(),
            "module Beta; end\n"
        );
        assert!(
            fs::read_to_string(layout.metadata_file())
                .unwrap()
                .contains("name: beta")
        );
        assert!(!layout.metadata_archive().exists());
    }

    #[test]
    fn missing_data_archive_is_an_extraction_failure() {
        let temp = tempfile::tempdir().unwrap();
        let layout = GemLayout::new(temp.path(), "beta", "2.0.0").unwrap();
        let metadata = gzip(b"---\nname: beta\n");
        write_gem(&layout, &[("metadata.gz", &metadata)]);

        let err = unpack(&layout).unwrap_err();
        assert!(matches!(err, GemError::Extraction { .. }));
        assert!(err.to_string().contains("data.tar.gz"));
    }

    #[test]
    fn corrupt_archive_is_an_extraction_failure() {
        let temp = tempfile::tempdir().unwrap();
        let layout = GemLayout::new(temp.path(), "beta", "2.0.0").unwrap();
        let data = gzip(&tar_bytes(&[("lib/beta.rb", b"x")]));
        let mut truncated = data;
        truncated.truncate(8);
        write_gem(
            &layout,
            &[("metadata.gz", &gzip(b"---\n")), ("data.tar.gz", &truncated)],
        );

        assert!(matches!(
            unpack(&layout),
            Err(GemError::Extraction { .. })
        ));
    }

    #[test]
    fn missing_archive_file_is_an_extraction_failure() {
        let temp = tempfile::tempdir().unwrap();
        let layout = GemLayout::new(temp.path(), "beta", "2.0.0").unwrap();
        assert!(matches!(
            unpack(&layout),
            Err(GemError::Extraction { .. })
        ));
    }
}
