use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use fcore::buf::fill_buf;

use crate::entry::{DirEntry, ENTRY_SIZE};
use crate::error::{ArcError, Result};

/// Reason given for a record whose payload is cut short by the end of the
/// file, what an interrupted append leaves behind.
pub const PAST_EOF: &str = "payload runs past end of file";

/// A directory entry along with the position of its record in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub pos: u64,
    pub entry: DirEntry,
}

/// Walks the directory records of an archive from the first byte onward.
///
/// There is no count stored anywhere, a read that comes back with less than
/// one full record ends the scan. Every record must be followed directly by
/// its payload, the next record starts where that payload ends. Anything
/// else is reported as [`ArcError::Corrupt`] and stops the iteration.
pub struct Scanner<R: Read + Seek> {
    inner: R,
    pos: u64,
    len: u64,
    done: bool,
}

impl<R: Read + Seek> Scanner<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;

        Ok(Scanner {
            inner: reader,
            pos: 0,
            len,
            done: false,
        })
    }

    /// Where the next record would start. Once the scan ran to completion
    /// this is the end of the payload region.
    pub fn end(&self) -> u64 {
        self.pos
    }

    /// Physical length of the archive when the scan began.
    pub fn file_len(&self) -> u64 {
        self.len
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_slot(&mut self) -> Result<Option<Slot>> {
        self.inner.seek(SeekFrom::Start(self.pos))?;

        let mut buf = [0u8; ENTRY_SIZE];
        let (_, read) = fill_buf(&mut self.inner, &mut buf)?;
        if read < ENTRY_SIZE {
            if read > 0 {
                warn!("ignoring {} trailing bytes at {}", read, self.pos);
            }
            return Ok(None);
        }

        let entry = DirEntry::decode(self.pos, &buf)?;
        let corrupt = |reason| ArcError::Corrupt {
            pos: self.pos,
            reason,
        };

        if entry.offset != self.pos + ENTRY_SIZE as u64 {
            return Err(corrupt("payload does not follow its entry"));
        }
        let end = entry
            .offset
            .checked_add(entry.size)
            .ok_or_else(|| corrupt("payload size overflows"))?;
        if end > self.len {
            return Err(corrupt(PAST_EOF));
        }

        match entry.name() {
            Some(name) => debug!("ENTRY {} <{}+{}>", name, entry.offset, entry.size),
            None => debug!("TOMBSTONE <{}+{}>", entry.offset, entry.size),
        }

        let slot = Slot {
            pos: self.pos,
            entry,
        };
        self.pos = end;
        Ok(Some(slot))
    }
}

impl<R: Read + Seek> Iterator for Scanner<R> {
    type Item = Result<Slot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_slot() {
            Ok(Some(slot)) => Some(Ok(slot)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod test_scanner {
    use super::*;
    use fcore::name::EntryName;
    use std::io::Cursor;

    // Interleaved archive image: entry, payload, entry, payload...
    fn image(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut data = Vec::new();
        for (name, payload) in members {
            let offset = (data.len() + ENTRY_SIZE) as u64;
            let entry = DirEntry::active(
                EntryName::try_from(*name).unwrap(),
                offset,
                payload.len() as u64,
            );
            data.extend_from_slice(&entry.encode());
            data.extend_from_slice(payload);
        }
        data
    }

    fn names(data: Vec<u8>) -> Vec<String> {
        Scanner::new(Cursor::new(data))
            .unwrap()
            .map(|slot| slot.unwrap().entry.name().unwrap().to_string())
            .collect()
    }

    #[test]
    fn empty_archive() {
        let mut scan = Scanner::new(Cursor::new(Vec::new())).unwrap();

        assert!(scan.next().is_none());
        assert_eq!(scan.end(), 0);
    }

    #[test]
    fn two_members() {
        let data = image(&[("a.txt", b"hello"), ("b.txt", b"")]);
        let total = data.len() as u64;
        let mut scan = Scanner::new(Cursor::new(data)).unwrap();

        let a = scan.next().unwrap().unwrap();
        assert_eq!(a.pos, 0);
        assert_eq!(a.entry.offset, ENTRY_SIZE as u64);
        assert_eq!(a.entry.size, 5);

        let b = scan.next().unwrap().unwrap();
        assert_eq!(b.pos, ENTRY_SIZE as u64 + 5);
        assert_eq!(b.entry.size, 0);

        assert!(scan.next().is_none());
        assert_eq!(scan.end(), total);
    }

    #[test]
    fn payload_looking_like_an_entry() {
        // A payload that is itself an archive image must not be read as records
        let inner = image(&[("inner", b"x")]);
        let data = image(&[("outer", &inner[..]), ("after", b"yz")]);

        assert_eq!(names(data), vec!["outer", "after"]);
    }

    #[test]
    fn tombstone_is_stepped_over() {
        let mut data = image(&[("a", b"1234"), ("b", b"56")]);
        let tomb = DirEntry::decode(0, data[..ENTRY_SIZE].try_into().unwrap())
            .unwrap()
            .tombstone();
        data[..ENTRY_SIZE].copy_from_slice(&tomb.encode());

        let slots: Vec<Slot> = Scanner::new(Cursor::new(data))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(slots.len(), 2);
        assert!(!slots[0].entry.is_active());
        assert_eq!(slots[1].entry.name().unwrap().to_string(), "b");
    }

    #[test]
    fn trailing_partial_record() {
        let mut data = image(&[("a", b"abc")]);
        let complete = data.len() as u64;
        data.extend_from_slice(&[0xAA; 17]);

        let mut scan = Scanner::new(Cursor::new(data)).unwrap();
        assert!(scan.next().unwrap().is_ok());
        assert!(scan.next().is_none());
        assert_eq!(scan.end(), complete);
        assert_eq!(scan.file_len(), complete + 17);
    }

    #[test]
    fn truncated_payload() {
        let mut data = image(&[("a", b"abcdef")]);
        data.truncate(data.len() - 2);

        let mut scan = Scanner::new(Cursor::new(data)).unwrap();
        assert!(matches!(
            scan.next(),
            Some(Err(ArcError::Corrupt { pos: 0, reason: "payload runs past end of file" }))
        ));
        assert!(scan.next().is_none());
    }

    #[test]
    fn misplaced_offset() {
        let mut data = image(&[("a", b"abc"), ("b", b"def")]);
        let second = ENTRY_SIZE + 3;
        data[second + 256..second + 264].copy_from_slice(&0u64.to_le_bytes());

        let mut scan = Scanner::new(Cursor::new(data)).unwrap();
        assert!(scan.next().unwrap().is_ok());
        assert!(matches!(
            scan.next(),
            Some(Err(ArcError::Corrupt { reason: "payload does not follow its entry", .. }))
        ));
        assert!(scan.next().is_none());
    }

    #[test]
    fn oversized_payload() {
        let mut data = image(&[("a", b"abc")]);
        data[264..272].copy_from_slice(&u64::MAX.to_le_bytes());

        let mut scan = Scanner::new(Cursor::new(data)).unwrap();
        assert!(matches!(
            scan.next(),
            Some(Err(ArcError::Corrupt { reason: "payload size overflows", .. }))
        ));
    }
}
