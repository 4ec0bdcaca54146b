use std::fs;
use std::io;
use std::path::Path;

use ignore::WalkBuilder;

use crate::error::Result;

/// How a source directory is enumerated for packing.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    pub follow_links: bool,
    pub same_fs: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        WalkOptions {
            follow_links: false,
            same_fs: true,
        }
    }
}

impl WalkOptions {
    /// Walker over the top level of `dir`, sorted by file name.
    ///
    /// Ignore files and hidden file filtering are off, every regular file in
    /// the directory is a member.
    pub fn walk<P: AsRef<Path>>(&self, dir: P) -> Result<ignore::Walk> {
        let dir = dir.as_ref();

        // Surface an unreadable source here rather than as a walk error
        if !fs::metadata(dir)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", dir.display()),
            )
            .into());
        }
        fs::read_dir(dir)?;

        Ok(WalkBuilder::new(dir)
            .max_depth(Some(1))
            .follow_links(self.follow_links)
            .standard_filters(false)
            .same_file_system(self.same_fs)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build())
    }
}
