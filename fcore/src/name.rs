use std::ffi::{OsStr, OsString};
use std::fmt;

use thiserror::Error;

/// Longest name an archive entry can hold, the on-disk field keeps one extra
/// byte so a stored name is always zero terminated.
pub const MAX_NAME_LEN: usize = 255;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NameError {
    #[error("name is {0} bytes long, the limit is {MAX_NAME_LEN}")]
    TooLong(usize),
    #[error("name is empty")]
    Empty,
    #[error("name {0:?} is not a single path component")]
    Invalid(String),
}

/// Name of an archive member.
///
/// Always a single, non empty path component of at most [`MAX_NAME_LEN`]
/// bytes, so extracting it below a directory can never escape that directory.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EntryName(Vec<u8>);

impl EntryName {
    pub fn new(bytes: &[u8]) -> Result<Self, NameError> {
        if bytes.is_empty() {
            return Err(NameError::Empty);
        }
        if bytes.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong(bytes.len()));
        }
        if bytes == b"." || bytes == b".." || bytes.iter().any(|b| matches!(b, b'/' | b'\\' | 0)) {
            return Err(NameError::Invalid(String::from_utf8_lossy(bytes).into_owned()));
        }
        Ok(EntryName(bytes.to_vec()))
    }

    #[cfg(unix)]
    pub fn from_os_str(name: &OsStr) -> Result<Self, NameError> {
        use std::os::unix::ffi::OsStrExt;
        EntryName::new(name.as_bytes())
    }

    #[cfg(not(unix))]
    pub fn from_os_str(name: &OsStr) -> Result<Self, NameError> {
        match name.to_str() {
            Some(s) => EntryName::new(s.as_bytes()),
            None => Err(NameError::Invalid(name.to_string_lossy().into_owned())),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[cfg(unix)]
    pub fn to_os_string(&self) -> OsString {
        use std::os::unix::ffi::OsStrExt;
        OsStr::from_bytes(&self.0).to_os_string()
    }

    #[cfg(not(unix))]
    pub fn to_os_string(&self) -> OsString {
        OsString::from(String::from_utf8_lossy(&self.0).into_owned())
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryName({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl TryFrom<&str> for EntryName {
    type Error = NameError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        EntryName::new(name.as_bytes())
    }
}
