use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use fcore::buf::{copy_exact, CopyError};
use fcore::name::{EntryName, NameError};

use crate::entry::{DirEntry, ENTRY_SIZE};
use crate::error::{ArcError, Result};
use crate::scan::{Scanner, Slot, PAST_EOF};

// Payload copy buffer
const BUFFER_SIZE: usize = 8 * 1024;

/// An active member as reported by [`Archive::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub name: EntryName,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// A member a bulk operation had to leave out, and why.
#[derive(Debug)]
pub struct Skipped {
    pub name: String,
    pub error: ArcError,
}

/// Result of a bulk operation, members that failed on their own do not fail
/// the whole operation.
#[derive(Debug, Default)]
pub struct Report {
    pub processed: usize,
    pub skipped: Vec<Skipped>,
}

impl Report {
    fn skip(&mut self, name: String, error: ArcError) {
        warn!("skipping {}: {}", name, error);
        self.skipped.push(Skipped { name, error });
    }
}

/// An open archive file.
///
/// The file handle lives as long as the session and is released on drop.
/// Nothing guards against other processes writing the same archive, callers
/// must keep to one writer at a time.
pub struct Archive {
    path: PathBuf,
    file: File,
    buf: Vec<u8>,
}

impl Archive {
    fn with_file(path: &Path, file: File) -> Self {
        Archive {
            path: path.to_path_buf(),
            file,
            buf: vec![0; BUFFER_SIZE],
        }
    }

    /// Create an empty archive, truncating whatever was at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Archive::with_file(path, file))
    }

    /// Open an existing archive for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Archive::with_file(path, file))
    }

    pub fn open_read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Ok(Archive::with_file(path, File::open(path)?))
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buf = vec![0; size.max(1)];
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scan(&mut self) -> Result<Scanner<&mut File>> {
        Scanner::new(&mut self.file)
    }

    /// Every record in on-disk order, tombstones included.
    pub fn entries(&mut self) -> Result<Vec<Slot>> {
        self.scan()?.collect()
    }

    pub fn list(&mut self) -> Result<Vec<Listing>> {
        let mut listing = Vec::new();
        for slot in self.scan()? {
            let slot = slot?;
            if let Some(name) = slot.entry.name() {
                listing.push(Listing {
                    name: name.clone(),
                    size: slot.entry.size,
                });
            }
        }
        Ok(listing)
    }

    /// First active entry called `name`.
    pub fn find(&mut self, name: &EntryName) -> Result<Option<Slot>> {
        for slot in self.scan()? {
            let slot = slot?;
            if slot.entry.name() == Some(name) {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    // End of the payload region. Whatever an interrupted write left behind,
    // a partial record or a final record missing part of its payload, is cut
    // off so the next append lands on a record boundary
    fn tail(&mut self) -> Result<u64> {
        let mut scan = self.scan()?;
        for slot in scan.by_ref() {
            match slot {
                Ok(_) => (),
                Err(ArcError::Corrupt { reason: PAST_EOF, .. }) => (),
                Err(e) => return Err(e),
            }
        }
        let (end, len) = (scan.end(), scan.file_len());

        if len > end {
            warn!("{}: truncating {} trailing bytes", self.path.display(), len - end);
            self.file.set_len(end)?;
        }
        Ok(end)
    }

    fn rollback(&mut self, pos: u64) -> Result<()> {
        self.file.set_len(pos)?;
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    // Rollback on the archive error path, the caller gets the original error
    fn discard(&mut self, pos: u64) {
        if let Err(e) = self.rollback(pos) {
            warn!("{}: could not truncate to {}: {}", self.path.display(), pos, e);
        }
    }

    // Write entry + payload at `pos`, returns where the next record goes.
    // Any failure undoes the partial write, archive side failures come back
    // as ArcError::Io.
    fn append_at<R: Read>(
        &mut self,
        pos: u64,
        name: &EntryName,
        reader: &mut R,
        size: u64,
    ) -> Result<u64> {
        let entry = DirEntry::active(name.clone(), pos + ENTRY_SIZE as u64, size);

        self.file.seek(SeekFrom::Start(pos))?;
        if let Err(e) = self.file.write_all(&entry.encode()) {
            self.discard(pos);
            return Err(e.into());
        }

        match copy_exact(reader, &mut self.file, size, &mut self.buf) {
            Ok(copied) if copied == size => {
                debug!("APPEND {} <{}+{}>", name, entry.offset, size);
                Ok(entry.offset + size)
            }
            Ok(copied) => {
                self.rollback(pos)?;
                Err(ArcError::SizeMismatch {
                    name: name.to_string(),
                    expected: size,
                    actual: copied,
                })
            }
            Err(CopyError::Read(e)) => {
                self.rollback(pos)?;
                Err(ArcError::Read {
                    name: name.to_string(),
                    source: e,
                })
            }
            Err(CopyError::Write(e)) => {
                self.discard(pos);
                Err(e.into())
            }
        }
    }

    /// Append a member after the last record without looking for a name
    /// collision.
    pub fn append<R: Read>(&mut self, name: &EntryName, reader: &mut R, size: u64) -> Result<()> {
        let pos = self.tail()?;
        self.append_at(pos, name, reader, size)?;
        self.file.flush()?;
        Ok(())
    }

    /// Add the file at `path` under its base name, unless an active member
    /// already has that name.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<AddOutcome> {
        let path = path.as_ref();
        let read_err = |source| ArcError::Read {
            name: path.display().to_string(),
            source,
        };

        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArcError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(read_err(e)),
        };
        if !meta.is_file() {
            return Err(read_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let name = EntryName::from_os_str(path.file_name().ok_or(NameError::Empty)?)?;
        let pos = self.tail()?;
        if self.find(&name)?.is_some() {
            debug!("{} already in {}", name, self.path.display());
            return Ok(AddOutcome::AlreadyPresent);
        }

        let mut src = File::open(path).map_err(read_err)?;
        self.append_at(pos, &name, &mut src, meta.len())?;
        self.file.flush()?;

        debug!("added {} to {}", name, self.path.display());
        Ok(AddOutcome::Added)
    }

    /// Tombstone the first active member called `name`. Its payload stays
    /// where it is, nothing is moved or renumbered.
    pub fn remove(&mut self, name: &EntryName) -> Result<()> {
        let slot = self
            .find(name)?
            .ok_or_else(|| ArcError::NotFound(name.to_string()))?;

        self.file.seek(SeekFrom::Start(slot.pos))?;
        self.file.write_all(&slot.entry.tombstone().encode())?;
        self.file.flush()?;

        debug!("deleted {} from {}", name, self.path.display());
        Ok(())
    }

    /// Append every regular file the walker yields, in walk order.
    ///
    /// Members that cannot be read are skipped and reported, a failure to
    /// write the archive aborts.
    pub fn pack_walk(&mut self, walker: ignore::Walk) -> Result<Report> {
        let own = fs::canonicalize(&self.path).ok();
        let mut pos = self.tail()?;
        let mut report = Report::default();

        for entry in walker {
            let e = match entry {
                Ok(e) => e,
                Err(err) => {
                    report.skip("<walk>".to_string(), err.into());
                    continue;
                }
            };

            if !e.file_type().is_some_and(|ft| ft.is_file()) {
                debug!("SKIP: {}", e.path().display());
                continue;
            }
            if own.is_some() && fs::canonicalize(e.path()).ok() == own {
                debug!("SKIP (archive itself): {}", e.path().display());
                continue;
            }

            let display = e.path().display().to_string();
            let name = match EntryName::from_os_str(e.file_name()) {
                Ok(name) => name,
                Err(err) => {
                    report.skip(display, err.into());
                    continue;
                }
            };

            let opened = File::open(e.path()).and_then(|f| {
                let len = f.metadata()?.len();
                Ok((f, len))
            });
            let (mut src, size) = match opened {
                Ok(x) => x,
                Err(err) => {
                    report.skip(
                        display.clone(),
                        ArcError::Read {
                            name: display,
                            source: err,
                        },
                    );
                    continue;
                }
            };

            match self.append_at(pos, &name, &mut src, size) {
                Ok(end) => {
                    pos = end;
                    report.processed += 1;
                }
                Err(err @ ArcError::Io(_)) => return Err(err),
                Err(err) => report.skip(display, err),
            }
        }

        self.file.flush()?;
        debug!(
            "{} file(s) packed into {}",
            report.processed,
            self.path.display()
        );
        Ok(report)
    }

    /// Extract every active member below `dest`, creating it when missing.
    pub fn unpack_to<P: AsRef<Path>>(&mut self, dest: P) -> Result<Report> {
        let dest = dest.as_ref();

        match fs::metadata(dest) {
            Ok(meta) if meta.is_dir() => debug!("{} already exists", dest.display()),
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", dest.display()),
                )
                .into())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dest)?,
            Err(e) => return Err(e.into()),
        }

        let mut report = Report::default();
        for slot in self.entries()? {
            let Some(name) = slot.entry.name() else {
                debug!("SKIP tombstone at {}", slot.pos);
                continue;
            };

            match self.extract(&slot.entry, name, dest) {
                Ok(()) => report.processed += 1,
                Err(err @ ArcError::Io(_)) => return Err(err),
                Err(err) => report.skip(name.to_string(), err),
            }
        }

        debug!(
            "{} file(s) unpacked from {} to {}",
            report.processed,
            self.path.display(),
            dest.display()
        );
        Ok(report)
    }

    // Write failures on the output are the member's own, a failed read of
    // the archive is not
    fn extract(&mut self, entry: &DirEntry, name: &EntryName, dest: &Path) -> Result<()> {
        let out_path = dest.join(name.to_os_string());
        let write_err = |source| ArcError::Write {
            name: name.to_string(),
            source,
        };

        self.file.seek(SeekFrom::Start(entry.offset))?;

        // Replace a link instead of writing through it
        if fs::symlink_metadata(&out_path).is_ok_and(|meta| meta.file_type().is_symlink()) {
            debug!("replacing link {}", out_path.display());
            fs::remove_file(&out_path).map_err(write_err)?;
        }
        let mut out = File::create(&out_path).map_err(write_err)?;

        let copied = copy_exact(&mut self.file, &mut out, entry.size, &mut self.buf);
        drop(out);

        let err = match copied {
            Ok(n) if n == entry.size => return Ok(()),
            Ok(n) => ArcError::SizeMismatch {
                name: name.to_string(),
                expected: entry.size,
                actual: n,
            },
            Err(CopyError::Write(e)) => write_err(e),
            Err(CopyError::Read(e)) => e.into(),
        };

        // Leave no half written member behind
        if let Err(e) = fs::remove_file(&out_path) {
            warn!("could not remove {}: {}", out_path.display(), e);
        }
        Err(err)
    }
}
