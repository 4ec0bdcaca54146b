use byteorder::{ByteOrder, LittleEndian};

use fcore::name::{EntryName, MAX_NAME_LEN};

use crate::error::{ArcError, Result};

// Field layout of one on-disk entry record
const NAME_FIELD: usize = MAX_NAME_LEN + 1;
const OFFSET_AT: usize = NAME_FIELD;
const SIZE_AT: usize = OFFSET_AT + 8;
const FLAGS_AT: usize = SIZE_AT + 8;
const RESERVED: usize = 7;

/// Size in bytes of one directory entry record.
pub const ENTRY_SIZE: usize = FLAGS_AT + 1 + RESERVED;

const FLAG_DELETED: u8 = 0x00;
const FLAG_ACTIVE: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Active(EntryName),
    Deleted,
}

/// One directory entry, the metadata record written right before a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub state: State,
    pub offset: u64,
    pub size: u64,
}

impl DirEntry {
    pub fn active(name: EntryName, offset: u64, size: u64) -> Self {
        DirEntry {
            state: State::Active(name),
            offset,
            size,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    pub fn name(&self) -> Option<&EntryName> {
        match &self.state {
            State::Active(name) => Some(name),
            State::Deleted => None,
        }
    }

    /// The tombstone for this entry. Offset and size stay so a scan can
    /// still step over the dead payload.
    pub fn tombstone(&self) -> Self {
        DirEntry {
            state: State::Deleted,
            offset: self.offset,
            size: self.size,
        }
    }

    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];

        let flags = match &self.state {
            State::Active(name) => {
                let name = name.as_bytes();
                buf[..name.len()].copy_from_slice(name);
                FLAG_ACTIVE
            }
            State::Deleted => FLAG_DELETED,
        };

        LittleEndian::write_u64(&mut buf[OFFSET_AT..SIZE_AT], self.offset);
        LittleEndian::write_u64(&mut buf[SIZE_AT..FLAGS_AT], self.size);
        buf[FLAGS_AT] = flags;

        buf
    }

    /// Decode the record read from byte `pos` of the archive.
    pub fn decode(pos: u64, buf: &[u8; ENTRY_SIZE]) -> Result<Self> {
        let corrupt = |reason| ArcError::Corrupt { pos, reason };

        let offset = LittleEndian::read_u64(&buf[OFFSET_AT..SIZE_AT]);
        let size = LittleEndian::read_u64(&buf[SIZE_AT..FLAGS_AT]);

        let state = match buf[FLAGS_AT] {
            FLAG_DELETED => State::Deleted,
            FLAG_ACTIVE => {
                let field = &buf[..NAME_FIELD];
                let len = field
                    .iter()
                    .position(|b| *b == 0)
                    .ok_or_else(|| corrupt("name is not zero terminated"))?;
                let name = EntryName::new(&field[..len]).map_err(|_| corrupt("invalid member name"))?;
                State::Active(name)
            }
            _ => return Err(corrupt("unknown entry flags")),
        };

        Ok(DirEntry {
            state,
            offset,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> EntryName {
        EntryName::try_from(s).unwrap()
    }

    #[test]
    fn record_size() {
        assert_eq!(ENTRY_SIZE, 280);
    }

    #[test]
    fn layout() {
        let buf = DirEntry::active(name("a.txt"), 280, 5).encode();

        assert_eq!(&buf[..5], b"a.txt");
        assert!(buf[5..256].iter().all(|b| *b == 0));
        assert_eq!(&buf[256..264], &280u64.to_le_bytes());
        assert_eq!(&buf[264..272], &5u64.to_le_bytes());
        assert_eq!(buf[272], 0x01);
        assert_eq!(&buf[273..], &[0u8; 7]);
    }

    #[test]
    fn active_decodes() {
        let entry = DirEntry::active(name("b.txt"), 1000, 0);
        let decoded = DirEntry::decode(720, &entry.encode()).unwrap();

        assert_eq!(decoded, entry);
        assert_eq!(decoded.name(), Some(&name("b.txt")));
    }

    #[test]
    fn max_length_name() {
        let long = "n".repeat(MAX_NAME_LEN);
        let entry = DirEntry::active(name(&long), 280, 1);
        let buf = entry.encode();

        // Last byte of the name field is always the terminator
        assert_eq!(buf[MAX_NAME_LEN], 0);
        assert_eq!(DirEntry::decode(0, &buf).unwrap(), entry);
    }

    #[test]
    fn tombstone_keeps_extent() {
        let entry = DirEntry::active(name("gone"), 560, 42);
        let tomb = entry.tombstone();
        let buf = tomb.encode();

        assert!(buf[..256].iter().all(|b| *b == 0));
        assert_eq!(buf[272], 0x00);

        let decoded = DirEntry::decode(280, &buf).unwrap();
        assert!(!decoded.is_active());
        assert_eq!(decoded.name(), None);
        assert_eq!((decoded.offset, decoded.size), (560, 42));
    }

    #[test]
    fn bad_flags() {
        let mut buf = DirEntry::active(name("a"), 280, 1).encode();
        buf[FLAGS_AT] = 0x7f;

        assert!(matches!(
            DirEntry::decode(0, &buf),
            Err(ArcError::Corrupt { pos: 0, reason: "unknown entry flags" })
        ));
    }

    #[test]
    fn unterminated_name() {
        let mut buf = DirEntry::active(name("a"), 280, 1).encode();
        buf[..NAME_FIELD].fill(b'x');

        assert!(matches!(
            DirEntry::decode(0, &buf),
            Err(ArcError::Corrupt { reason: "name is not zero terminated", .. })
        ));
    }

    #[test]
    fn active_with_empty_name() {
        let mut buf = [0u8; ENTRY_SIZE];
        buf[FLAGS_AT] = FLAG_ACTIVE;

        assert!(matches!(
            DirEntry::decode(0, &buf),
            Err(ArcError::Corrupt { reason: "invalid member name", .. })
        ));
    }

    #[test]
    fn path_traversal_name() {
        let mut buf = DirEntry::active(name("a"), 280, 1).encode();
        buf[..5].copy_from_slice(b"../x\0");

        assert!(matches!(
            DirEntry::decode(0, &buf),
            Err(ArcError::Corrupt { reason: "invalid member name", .. })
        ));
    }
}
