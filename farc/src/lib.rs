//! Flat archive file format
//!
//! An archive is one file holding a sequence of members. Each member is a
//! fixed size directory entry immediately followed by the raw bytes of the
//! member (the payload). There is no header, footer or member count, the
//! directory is recovered by scanning records from the start of the file
//! until less than one full record is left.
//!
//! ```text
//! | Entry(0) | Payload(0) | Entry(1) | Payload(1) | ...
//! ```
//!
//! # Entry
//!
//! Everything is stored in Little Endian format. A record is
//! [`entry::ENTRY_SIZE`] (280) bytes long.
//!
//! | Type      | Name     | Description |
//! | --------: | -------- | ----------- |
//! | [u8; 256] | name     | Member name, zero padded, at most 255 bytes |
//! | u64       | offset   | Start of the payload, always the record start + 280 |
//! | u64       | size     | Length of the payload, is allowed to be 0 bytes |
//! | u8        | flags    | `0x01` active, `0x00` deleted, anything else is corrupt |
//! | [u8; 7]   | reserved | Written as zero, ignored on read |
//!
//! # Deleting
//!
//! Deleting a member rewrites its record in place as a tombstone: the flag
//! is cleared and the name zeroed, but offset and size are kept so a scan
//! can still step over the payload. The payload bytes are never reclaimed.
//!
//! # Concurrency
//!
//! Every operation opens the archive, does its work and closes it again.
//! There is no locking, running two writers against the same archive at once
//! is not supported. An interrupted write can leave a record without its full
//! payload, the next scan reports that as [`ArcError::Corrupt`] and the next
//! append cuts that record off before writing its own.
pub mod archive;
pub mod entry;
pub mod error;
pub mod scan;
pub mod walk;

use std::ffi::OsStr;
use std::path::Path;

use fcore::name::EntryName;

pub use crate::archive::{AddOutcome, Archive, Listing, Report, Skipped};
pub use crate::error::{ArcError, Result};
pub use crate::walk::WalkOptions;

/// Build a new archive at `archive` out of the regular files directly inside
/// `src`.
pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, src: Q) -> Result<Report> {
    let walker = WalkOptions::default().walk(src)?;
    Archive::create(archive)?.pack_walk(walker)
}

/// Extract every active member of `archive` into `dest`.
pub fn unpack<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, dest: Q) -> Result<Report> {
    Archive::open_read(archive)?.unpack_to(dest)
}

pub fn add<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, file: Q) -> Result<AddOutcome> {
    Archive::open(archive)?.add_file(file)
}

pub fn delete<P: AsRef<Path>, S: AsRef<OsStr>>(archive: P, name: S) -> Result<()> {
    let name = EntryName::from_os_str(name.as_ref())?;
    Archive::open(archive)?.remove(&name)
}

pub fn list<P: AsRef<Path>>(archive: P) -> Result<Vec<Listing>> {
    Archive::open_read(archive)?.list()
}
