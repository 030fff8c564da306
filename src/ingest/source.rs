//! Transparent plain-text / gzip source detection.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{SieveError, SieveResult};

/// First two bytes of a gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Open a log file as a byte stream, decompressing gzip transparently.
///
/// The first two bytes are sniffed for the gzip magic number and the file is rewound
/// before the stream is handed back, so callers always read from the start.
///
/// Returns `Ok(None)` when the file does not exist: a stale filename contributes zero
/// lines instead of failing a whole batch. Any other I/O error is fatal for this file
/// and carries the offending path. A corrupt gzip stream passes the sniff but fails on
/// first read, which surfaces through the same per-file error path.
pub fn open_source(path: &Path) -> SieveResult<Option<Box<dyn Read + Send>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(file_error(path, err)),
    };

    let mut magic = [0u8; 2];
    let sniffed = read_up_to(&mut file, &mut magic).map_err(|err| file_error(path, err))?;
    file.seek(SeekFrom::Start(0))
        .map_err(|err| file_error(path, err))?;

    if sniffed == 2 && magic == GZIP_MAGIC {
        Ok(Some(Box::new(GzDecoder::new(file))))
    } else {
        Ok(Some(Box::new(file)))
    }
}

/// Read up to `buf.len()` bytes, stopping early at EOF. Files shorter than the gzip
/// magic are valid plain-text inputs (possibly empty).
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

fn file_error(path: &Path, source: std::io::Error) -> SieveError {
    SieveError::File {
        path: path.to_path_buf(),
        source,
    }
}
