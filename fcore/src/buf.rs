use std::io::{Read, Write};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
}

pub fn fill_buf<R: Read>(data: &mut R, buf: &mut [u8]) -> std::io::Result<(bool, usize)> {
    let mut buf_read = 0;

    while buf_read < buf.len() {
        match data.read(&mut buf[buf_read..]) {
            Ok(0) => return Ok((true, buf_read)),
            Ok(x) => buf_read += x,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
    }
    Ok((false, buf_read))
}

/// Copy at most `len` bytes from `src` to `dst`, staging through `buf`.
///
/// The source is wrapped in [`Read::take`] so nothing past `len` is ever
/// consumed, whatever the size of `buf`. Returns the number of bytes copied,
/// which is only smaller than `len` when `src` ran dry first.
pub fn copy_exact<R: Read, W: Write>(
    src: &mut R,
    dst: &mut W,
    len: u64,
    buf: &mut [u8],
) -> Result<u64, CopyError> {
    if buf.is_empty() {
        return Err(CopyError::Read(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "copy buffer is empty",
        )));
    }

    let mut limited = src.take(len);
    let mut copied = 0;

    loop {
        match fill_buf(&mut limited, buf).map_err(CopyError::Read)? {
            (true, 0) => break,
            (eof, n) => {
                dst.write_all(&buf[..n]).map_err(CopyError::Write)?;
                copied += n as u64;
                if eof {
                    break;
                }
            }
        }
    }
    Ok(copied)
}
