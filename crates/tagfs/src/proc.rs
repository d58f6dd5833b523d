//! The per-process view of the file system: a working directory and an
//! open-file table. Nothing else about processes is known here.

use alloc::sync::Arc;

use crate::{
    error::FsError,
    file::File,
    fs::{inode::Inode, FileSystem},
    param::NOFILE,
};

pub struct Process<'fs> {
    cwd: Inode<'fs>,
    files: [Option<Arc<File<'fs>>>; NOFILE],
}

impl<'fs> Process<'fs> {
    /// A fresh process whose working directory is the root.
    pub fn new(fs: &'fs FileSystem) -> Self {
        Self {
            cwd: fs.root(),
            files: [const { None }; NOFILE],
        }
    }

    #[must_use]
    pub fn cwd(&self) -> &Inode<'fs> {
        &self.cwd
    }

    pub(crate) fn chdir(&mut self, to: Inode<'fs>) {
        self.cwd = to;
    }

    /// Installs `file` in the lowest free descriptor slot.
    pub(crate) fn fd_alloc(&mut self, file: Arc<File<'fs>>) -> Result<usize, FsError> {
        for (fd, slot) in self.files.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(file);
                return Ok(fd);
            }
        }
        Err(FsError::TooManyOpenFiles)
    }

    /// The open file at `fd`.
    pub(crate) fn file(&self, fd: usize) -> Result<&Arc<File<'fs>>, FsError> {
        self.files
            .get(fd)
            .and_then(Option::as_ref)
            .ok_or(FsError::BadFileDescriptor)
    }

    pub(crate) fn fd_close(&mut self, fd: usize) -> Result<(), FsError> {
        self.files
            .get_mut(fd)
            .and_then(Option::take)
            .map(|_| ())
            .ok_or(FsError::BadFileDescriptor)
    }
}
