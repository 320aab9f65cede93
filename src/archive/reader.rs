//! Zip and tar container readers.
//!
//! Listing reads headers only. Entry data is streamed later by reopening the
//! container, seeking to the entry's data offset and, for deflated zip
//! entries, inflating on the fly. A gzip stream cannot seek, so reads from a
//! compressed tarball decompress from the start and skip to the entry.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use flate2::read::{DeflateDecoder, GzDecoder};

use crate::{ByteString, FileType, FsError, Path};

use super::ArchiveConfig;
use super::item::{ArchiveEntry, EntryData};

/// Bytes needed to recognize every format.
const SNIFF_LEN: usize = 262;
const TAR_MAGIC_OFFSET: usize = 257;
const GZIP_MAGIC: &[u8] = b"\x1f\x8b";

/// Container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Zip,
    Tar,
    TarGz,
}

/// Recognize the container format from its leading bytes.
pub(crate) fn sniff(header: &[u8]) -> Option<Format> {
    if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
        Some(Format::Zip)
    } else if header.get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5) == Some(&b"ustar"[..]) {
        Some(Format::Tar)
    } else if header.starts_with(GZIP_MAGIC) {
        Some(Format::TarGz)
    } else {
        None
    }
}

/// List every entry of the archive stored at `file`, in archive order.
pub(crate) fn read_entries(
    file: &std::path::Path,
    root: &Path,
    config: &ArchiveConfig,
) -> Result<Vec<ArchiveEntry>, FsError> {
    let mut reader = File::open(file).map_err(|e| FsError::io("open archive", root, e))?;
    let mut header = Vec::with_capacity(SNIFF_LEN);
    (&mut reader)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| FsError::io("read archive", root, e))?;
    reader
        .seek(SeekFrom::Start(0))
        .map_err(|e| FsError::io("seek archive", root, e))?;

    match sniff(&header) {
        Some(Format::Zip) => zip_entries(reader, root, config),
        Some(Format::Tar) => {
            let mut archive = tar::Archive::new(BufReader::new(reader));
            let entries = archive
                .entries_with_seek()
                .map_err(|e| FsError::io("read archive", root, e))?;
            tar_entries(entries, root, config, |offset, size| EntryData::Stored { offset, size })
        }
        Some(Format::TarGz) => {
            let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(reader)));
            let entries = archive
                .entries()
                .map_err(|e| FsError::io("read archive", root, e))?;
            tar_entries(entries, root, config, |offset, size| EntryData::Gzipped { offset, size })
        }
        None => Err(FsError::NotSupported {
            operation: "archive format",
        }),
    }
}

/// Stream the bytes of an entry.
pub(crate) fn open_data(
    file: &std::path::Path,
    data: EntryData,
    path: &Path,
) -> Result<Box<dyn Read + Send>, FsError> {
    match data {
        EntryData::Empty => Ok(Box::new(io::empty())),
        EntryData::Unsupported(operation) => Err(FsError::NotSupported { operation }),
        EntryData::Stored { offset, size } => Ok(Box::new(open_at(file, offset, path)?.take(size))),
        EntryData::Deflated {
            offset,
            compressed_size,
        } => Ok(Box::new(DeflateDecoder::new(
            open_at(file, offset, path)?.take(compressed_size),
        ))),
        EntryData::Gzipped { offset, size } => {
            let mut reader = GzDecoder::new(open_at(file, 0, path)?);
            let skipped = io::copy(&mut (&mut reader).take(offset), &mut io::sink())
                .map_err(|e| FsError::io("read archive", path, e))?;
            if skipped < offset {
                return Err(FsError::io(
                    "read archive",
                    path,
                    io::Error::from(io::ErrorKind::UnexpectedEof),
                ));
            }
            Ok(Box::new(reader.take(size)))
        }
    }
}

fn open_at(file: &std::path::Path, offset: u64, path: &Path) -> Result<BufReader<File>, FsError> {
    let mut reader = File::open(file).map_err(|e| FsError::io("open archive", path, e))?;
    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|e| FsError::io("seek archive", path, e))?;
    Ok(BufReader::new(reader))
}

fn zip_error(root: &Path, error: zip::result::ZipError) -> FsError {
    match error {
        zip::result::ZipError::Io(e) => FsError::io("read archive", root, e),
        other => FsError::Backend(format!("{root}: {other}")),
    }
}

fn zip_entries(file: File, root: &Path, config: &ArchiveConfig) -> Result<Vec<ArchiveEntry>, FsError> {
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(root, e))?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive.by_index_raw(index).map_err(|e| zip_error(root, e))?;
        let mode = file.unix_mode();
        let file_type = match mode {
            Some(mode) if mode & 0o170000 != 0 => FileType::from_mode(mode),
            _ if file.is_dir() => FileType::Directory,
            _ => FileType::File,
        };
        let data = if file.encrypted() {
            EntryData::Unsupported("read encrypted entry")
        } else {
            match file.compression() {
                zip::CompressionMethod::Stored => EntryData::Stored {
                    offset: file.data_start(),
                    size: file.compressed_size(),
                },
                zip::CompressionMethod::Deflated => EntryData::Deflated {
                    offset: file.data_start(),
                    compressed_size: file.compressed_size(),
                },
                _ => EntryData::Unsupported("read entry with this compression method"),
            }
        };

        let mut entry = ArchiveEntry::new(config.decode_name(file.name_raw()))
            .with_type(file_type)
            .with_size(file.size())
            .with_data(data);
        entry.compressed_size = file.compressed_size();
        entry.encrypted = file.encrypted();
        entry.mode = mode.map(|m| m & 0o7777);
        entry.modified = file.last_modified().map_or(SystemTime::UNIX_EPOCH, dos_time);
        entry.comment = Some(file.comment().to_owned()).filter(|c| !c.is_empty());
        entries.push(entry);
    }
    Ok(entries)
}

/// Zip timestamps carry no zone; they are read as UTC.
fn dos_time(time: zip::DateTime) -> SystemTime {
    NaiveDate::from_ymd_opt(i32::from(time.year()), u32::from(time.month()), u32::from(time.day()))
        .and_then(|date| {
            date.and_hms_opt(
                u32::from(time.hour()),
                u32::from(time.minute()),
                u32::from(time.second()),
            )
        })
        .map_or(SystemTime::UNIX_EPOCH, |naive| naive.and_utc().into())
}

/// Collect tar entries; `locate` maps a data offset and size to [`EntryData`].
fn tar_entries<R: Read>(
    listing: tar::Entries<'_, R>,
    root: &Path,
    config: &ArchiveConfig,
    locate: impl Fn(u64, u64) -> EntryData,
) -> Result<Vec<ArchiveEntry>, FsError> {
    let io_error = |e| FsError::io("read archive", root, e);
    let mut entries = Vec::new();
    // Data location of every regular entry, for resolving hard links.
    let mut stored: HashMap<ByteString, (EntryData, u64)> = HashMap::new();

    for entry in listing {
        let entry = entry.map_err(io_error)?;
        let header = entry.header();
        let entry_type = header.entry_type();
        let name = config.decode_name(&entry.path_bytes());
        let link_name = entry
            .link_name_bytes()
            .map(|link| config.decode_name(&link));

        let (file_type, data, size) = match entry_type {
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                let size = entry.size();
                let data = locate(entry.raw_file_position(), size);
                stored.insert(name.clone(), (data, size));
                (FileType::File, data, size)
            }
            tar::EntryType::GNUSparse => (
                FileType::File,
                EntryData::Unsupported("read sparse entry"),
                entry.size(),
            ),
            tar::EntryType::Link => match link_name.as_ref().and_then(|target| stored.get(target)) {
                Some(&(data, size)) => (FileType::File, data, size),
                None => {
                    tracing::warn!(%root, %name, "hard link to an unknown entry");
                    (FileType::File, EntryData::Unsupported("read dangling hard link"), 0)
                }
            },
            tar::EntryType::Directory => (FileType::Directory, EntryData::Empty, 0),
            tar::EntryType::Symlink => (FileType::Symlink, EntryData::Empty, 0),
            tar::EntryType::Char => (FileType::CharDevice, EntryData::Empty, 0),
            tar::EntryType::Block => (FileType::BlockDevice, EntryData::Empty, 0),
            tar::EntryType::Fifo => (FileType::Fifo, EntryData::Empty, 0),
            other => {
                tracing::debug!(%root, %name, entry_type = ?other, "skipping tar entry");
                continue;
            }
        };

        let mut item = ArchiveEntry::new(name)
            .with_type(file_type)
            .with_size(size)
            .with_data(data);
        item.compressed_size = size;
        item.mode = header.mode().ok().map(|m| m & 0o7777);
        item.modified = header
            .mtime()
            .map_or(SystemTime::UNIX_EPOCH, |secs| {
                SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
            });
        item.uid = header.uid().ok().and_then(|id| u32::try_from(id).ok());
        item.gid = header.gid().ok().and_then(|id| u32::try_from(id).ok());
        item.owner = header.username().ok().flatten().map(str::to_owned);
        item.group = header.groupname().ok().flatten().map(str::to_owned);
        if file_type == FileType::Symlink {
            item.link_name = link_name;
        }
        entries.push(item);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_zip_and_tar_magic() {
        assert_eq!(sniff(b"PK\x03\x04rest"), Some(Format::Zip));
        assert_eq!(sniff(b"PK\x05\x06"), Some(Format::Zip));
        let mut tar_header = vec![0u8; 512];
        tar_header[257..263].copy_from_slice(b"ustar\0");
        assert_eq!(sniff(&tar_header), Some(Format::Tar));
        assert_eq!(sniff(b"\x1f\x8b\x08\x00"), Some(Format::TarGz));
        assert_eq!(sniff(b"plain text"), None);
    }

    #[test]
    fn zip_timestamps_convert_to_utc() {
        let time = zip::DateTime::from_date_and_time(2000, 3, 1, 12, 30, 10).unwrap();
        assert_eq!(
            dos_time(time),
            SystemTime::UNIX_EPOCH + Duration::from_secs(11_017 * 86_400 + 12 * 3_600 + 30 * 60 + 10)
        );
        let epoch = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(dos_time(epoch), SystemTime::UNIX_EPOCH + Duration::from_secs(3_652 * 86_400));
    }

    #[test]
    fn reads_tar_entries_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("t.tar");
        {
            let mut builder = tar::Builder::new(File::create(&file).unwrap());
            let mut header = tar::Header::new_gnu();
            header.set_size(5);
            header.set_mode(0o640);
            header.set_mtime(1_000);
            builder.append_data(&mut header, "dir/hello.txt", &b"hello"[..]).unwrap();

            let mut link = tar::Header::new_gnu();
            link.set_entry_type(tar::EntryType::Symlink);
            link.set_size(0);
            builder.append_link(&mut link, "dir/link", "hello.txt").unwrap();

            let mut hard = tar::Header::new_gnu();
            hard.set_entry_type(tar::EntryType::Link);
            hard.set_size(0);
            builder.append_link(&mut hard, "copy.txt", "dir/hello.txt").unwrap();
            builder.finish().unwrap();
        }

        let root = Path::archive_root(&file);
        let entries = read_entries(&file, &root, &ArchiveConfig::default()).unwrap();
        assert_eq!(entries.len(), 3);

        let hello = &entries[0];
        assert_eq!(hello.name, "dir/hello.txt");
        assert_eq!(hello.size, 5);
        assert_eq!(hello.mode, Some(0o640));
        assert_eq!(hello.modified, SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let mut out = String::new();
        open_data(&file, hello.data, &root).unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello");

        assert_eq!(entries[1].file_type, FileType::Symlink);
        assert_eq!(entries[1].link_name.as_ref().unwrap(), "hello.txt");

        let mut out = String::new();
        open_data(&file, entries[2].data, &root).unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn reads_gzipped_tar_entries_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("t.tar.gz");
        {
            let gz = flate2::write::GzEncoder::new(File::create(&file).unwrap(), flate2::Compression::default());
            let mut builder = tar::Builder::new(gz);
            for (name, data) in [("first.txt", &b"one"[..]), ("nested/second.txt", &b"second entry"[..])] {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                builder.append_data(&mut header, name, data).unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap();
        }

        let root = Path::archive_root(&file);
        let entries = read_entries(&file, &root, &ArchiveConfig::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, "nested/second.txt");
        assert_eq!(entries[1].size, 12);
        assert_eq!(entries[1].compressed_size, 12);
        assert!(!entries[1].encrypted);

        for (entry, expected) in entries.iter().zip(["one", "second entry"]) {
            let mut out = String::new();
            open_data(&file, entry.data, &root).unwrap().read_to_string(&mut out).unwrap();
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn zip_entries_report_stored_size() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("z.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&file).unwrap());
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            zip.start_file("zeros.bin", options).unwrap();
            std::io::Write::write_all(&mut zip, &[0u8; 4096]).unwrap();
            zip.finish().unwrap();
        }

        let entries = read_entries(&file, &Path::archive_root(&file), &ArchiveConfig::default()).unwrap();
        assert_eq!(entries[0].size, 4096);
        assert!(entries[0].compressed_size < 4096);
        assert!(!entries[0].encrypted);
    }

    #[test]
    fn unknown_format_is_not_supported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.bin");
        std::fs::write(&file, b"definitely not an archive").unwrap();
        let err = read_entries(&file, &Path::archive_root(&file), &ArchiveConfig::default()).unwrap_err();
        assert!(err.is_not_supported());
    }
}
