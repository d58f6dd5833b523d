//! Thin system-call entry points.
//!
//! Argument marshalling (user pointers, C string copies, the -1 return
//! convention) belongs to the embedding kernel; these functions take
//! checked Rust arguments and return [`Result`]. Each one validates its
//! descriptor against the calling process's table, then leans on the
//! layers below.

use alloc::sync::Arc;

use bitflags::bitflags;

use crate::{
    error::FsError,
    file::File,
    fs::{ops, path, repr::InodeType, stat::Stat, FileSystem},
    proc::Process,
};

bitflags! {
    /// Open mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const WRONLY = 0x001;
        const RDWR = 0x002;
        const CREATE = 0x200;
    }
}

impl OpenFlags {
    /// Read-only is the absence of every other mode bit.
    pub const RDONLY: Self = Self::empty();
}

/// Opens `path`, returning the new file descriptor.
pub fn open<'fs>(
    fs: &'fs FileSystem,
    proc: &mut Process<'fs>,
    path: &[u8],
    flags: OpenFlags,
) -> Result<usize, FsError> {
    let ip = if flags.contains(OpenFlags::CREATE) {
        ops::create(fs, proc, path, InodeType::File, 0, 0)?
    } else {
        path::resolve(fs, proc, path)?
    };

    let lip = ip.lock();
    let ty = lip.ty();
    let major = lip.major();
    if ty == InodeType::Dir && flags != OpenFlags::RDONLY {
        return Err(FsError::IsADirectory);
    }
    if ty == InodeType::Device {
        fs.device(major)?;
    }
    drop(lip);

    let readable = !flags.contains(OpenFlags::WRONLY);
    let writable = flags.contains(OpenFlags::WRONLY) || flags.contains(OpenFlags::RDWR);
    let file = match ty {
        InodeType::Device => File::new_device(ip, readable, writable),
        _ => File::new_inode(ip, readable, writable),
    };
    proc.fd_alloc(Arc::new(file))
}

/// Releases the descriptor `fd`.
pub fn close(proc: &mut Process<'_>, fd: usize) -> Result<(), FsError> {
    proc.fd_close(fd)
}

/// Duplicates `fd` onto the lowest free descriptor.
pub fn dup(proc: &mut Process<'_>, fd: usize) -> Result<usize, FsError> {
    let file = Arc::clone(proc.file(fd)?);
    proc.fd_alloc(file)
}

/// Reads from `fd` into `dst`, returning the byte count.
pub fn read(proc: &Process<'_>, fd: usize, dst: &mut [u8]) -> Result<usize, FsError> {
    proc.file(fd)?.read(dst)
}

/// Writes `src` to `fd`, returning the byte count.
pub fn write(proc: &Process<'_>, fd: usize, src: &[u8]) -> Result<usize, FsError> {
    proc.file(fd)?.write(src)
}

/// Reports metadata of the file open at `fd`.
pub fn fstat(proc: &Process<'_>, fd: usize) -> Result<Stat, FsError> {
    Ok(proc.file(fd)?.stat())
}

/// Creates the directory `path`.
pub fn mkdir<'fs>(fs: &'fs FileSystem, proc: &Process<'fs>, path: &[u8]) -> Result<(), FsError> {
    ops::create(fs, proc, path, InodeType::Dir, 0, 0).map(|ip| ip.put())
}

/// Creates the device node `path` with the given device numbers.
pub fn mknod<'fs>(
    fs: &'fs FileSystem,
    proc: &Process<'fs>,
    path: &[u8],
    major: i16,
    minor: i16,
) -> Result<(), FsError> {
    ops::create(fs, proc, path, InodeType::Device, major, minor).map(|ip| ip.put())
}

/// Links `new` to the file at `old`.
pub fn link<'fs>(
    fs: &'fs FileSystem,
    proc: &Process<'fs>,
    old: &[u8],
    new: &[u8],
) -> Result<(), FsError> {
    ops::link(fs, proc, old, new)
}

/// Removes the directory entry at `path`.
pub fn unlink(fs: &FileSystem, proc: &Process<'_>, path: &[u8]) -> Result<(), FsError> {
    ops::unlink(fs, proc, path)
}

/// Moves the process working directory to `path`.
pub fn chdir<'fs>(
    fs: &'fs FileSystem,
    proc: &mut Process<'fs>,
    path: &[u8],
) -> Result<(), FsError> {
    let ip = path::resolve(fs, proc, path)?;
    let lip = ip.lock();
    if !lip.is_dir() {
        return Err(FsError::NotADirectory);
    }
    drop(lip);
    proc.chdir(ip);
    Ok(())
}

/// Attaches `key` -> `value` to the file open at `fd`.
///
/// The descriptor must be open for writing and inode-backed; the key
/// must be 1 to 9 bytes.
pub fn tag_file(proc: &Process<'_>, fd: usize, key: &[u8], value: &[u8]) -> Result<(), FsError> {
    let file = proc.file(fd)?;
    if !file.writable() {
        return Err(FsError::NotWritable);
    }
    let inode = file.backing_inode().ok_or(FsError::BadFileDescriptor)?;
    inode.lock().set_tag(key, value)
}

/// Detaches the tag `key` from the file open at `fd`.
///
/// The descriptor must be open for writing and inode-backed.
pub fn remove_file_tag(proc: &Process<'_>, fd: usize, key: &[u8]) -> Result<(), FsError> {
    let file = proc.file(fd)?;
    if !file.writable() {
        return Err(FsError::NotWritable);
    }
    let inode = file.backing_inode().ok_or(FsError::BadFileDescriptor)?;
    inode.lock().remove_tag(key)
}

/// Copies the value tagged `key` on the file open at `fd` into `dst`.
///
/// The descriptor must be open for reading and inode-backed. Returns
/// the stored length even when it exceeds `dst.len()`, so a caller can
/// retry with a larger buffer.
pub fn get_file_tag(
    proc: &Process<'_>,
    fd: usize,
    key: &[u8],
    dst: &mut [u8],
) -> Result<usize, FsError> {
    let file = proc.file(fd)?;
    if !file.readable() {
        return Err(FsError::NotReadable);
    }
    let inode = file.backing_inode().ok_or(FsError::BadFileDescriptor)?;
    inode.lock().get_tag(key, dst)
}
