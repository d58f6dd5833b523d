//! Composite namespace operations: create, link, unlink.
//!
//! Each one resolves paths, then locks at most a parent and one child,
//! always parent first, releasing child before parent. Mutations of
//! several inodes revert on a later failure so a failed call leaves the
//! namespace as it found it.

use dataview::PodMethods as _;

use crate::{error::FsError, proc::Process};

use super::{
    inode::Inode,
    path,
    repr::{DirEntry, InodeType, DIRSIZ},
    FileSystem,
};

/// Creates `path` as an inode of type `ty`.
///
/// Opening an existing regular file with `ty` regular is idempotent and
/// returns the existing inode; any other collision fails. A new
/// directory gets `.` and `..` entries, and the parent's link count
/// accounts the new `..`. `.` does not count toward the new
/// directory's own links, or removal could never bring them to zero.
pub fn create<'fs>(
    fs: &'fs FileSystem,
    proc: &Process<'fs>,
    path: &[u8],
    ty: InodeType,
    major: i16,
    minor: i16,
) -> Result<Inode<'fs>, FsError> {
    let mut name_buf = [0; DIRSIZ];
    let (parent_ip, name) = path::resolve_parent(fs, proc, path, &mut name_buf)?;

    let mut parent_lip = parent_ip.lock();
    let Some(mut parent_dp) = parent_lip.as_dir() else {
        return Err(FsError::NotADirectory);
    };

    if let Some((child_ip, _off)) = parent_dp.lookup(name) {
        drop(parent_lip);
        parent_ip.put();

        let child_lip = child_ip.lock();
        if ty == InodeType::File && child_lip.ty() == InodeType::File {
            drop(child_lip);
            return Ok(child_ip);
        }
        return Err(FsError::AlreadyExists);
    }

    let child_ip = Inode::alloc(fs, parent_dp.dev(), ty);
    let mut child_lip = child_ip.lock();
    child_lip.data_mut().major = major;
    child_lip.data_mut().minor = minor;
    child_lip.data_mut().nlink = 1;
    child_lip.update();

    if ty == InodeType::Dir {
        let child_ino = child_lip.ino();
        let parent_ino = parent_dp.ino();
        let mut child_dp = child_lip.as_dir().expect("created as a directory");
        let dots = child_dp
            .link(b".", child_ino)
            .and_then(|()| child_dp.link(b"..", parent_ino));
        if let Err(err) = dots {
            child_lip.data_mut().nlink = 0;
            child_lip.update();
            return Err(err);
        }
    }

    if let Err(err) = parent_dp.link(name, child_lip.ino()) {
        child_lip.data_mut().nlink = 0;
        child_lip.update();
        return Err(err);
    }

    if ty == InodeType::Dir {
        // Success is guaranteed; account the child's "..".
        parent_dp.inner().data_mut().nlink += 1;
        parent_dp.inner().update();
    }

    drop(child_lip);
    Ok(child_ip)
}

/// Creates the hard link `new` naming the inode at `old`.
///
/// Directories cannot be linked, and the new name must live on the same
/// device. The bumped link count is reverted when linking fails.
pub fn link<'fs>(
    fs: &'fs FileSystem,
    proc: &Process<'fs>,
    old: &[u8],
    new: &[u8],
) -> Result<(), FsError> {
    let old_ip = path::resolve(fs, proc, old)?;

    let mut old_lip = old_ip.lock();
    if old_lip.is_dir() {
        return Err(FsError::IsADirectory);
    }
    old_lip.data_mut().nlink += 1;
    old_lip.update();
    drop(old_lip);

    let res = (|| {
        let mut name_buf = [0; DIRSIZ];
        let (parent_ip, name) = path::resolve_parent(fs, proc, new, &mut name_buf)?;
        let mut parent_lip = parent_ip.lock();
        if parent_lip.dev() != old_ip.dev() {
            return Err(FsError::CrossDeviceLink);
        }
        let Some(mut parent_dp) = parent_lip.as_dir() else {
            return Err(FsError::NotADirectory);
        };
        parent_dp.link(name, old_ip.ino())
    })();

    if res.is_err() {
        let mut old_lip = old_ip.lock();
        old_lip.data_mut().nlink -= 1;
        old_lip.update();
    }
    res
}

/// Removes the directory entry at `path`.
///
/// `.` and `..` cannot be unlinked and a directory must be empty. The
/// inode itself is reclaimed when its last reference goes away.
pub fn unlink(fs: &FileSystem, proc: &Process<'_>, path: &[u8]) -> Result<(), FsError> {
    let mut name_buf = [0; DIRSIZ];
    let (parent_ip, name) = path::resolve_parent(fs, proc, path, &mut name_buf)?;

    if name == b"." || name == b".." {
        return Err(FsError::InvalidName);
    }

    let mut parent_lip = parent_ip.lock();
    let Some(mut parent_dp) = parent_lip.as_dir() else {
        return Err(FsError::NotADirectory);
    };

    let Some((child_ip, off)) = parent_dp.lookup(name) else {
        return Err(FsError::EntryNotFound);
    };
    let mut child_lip = child_ip.lock();

    assert!(child_lip.nlink() > 0, "directory entry with no links");
    if child_lip.is_dir() {
        let mut child_dp = child_lip.as_dir().expect("checked directory");
        if !child_dp.is_empty() {
            return Err(FsError::DirectoryNotEmpty);
        }
    }

    parent_dp.inner().write_data(off, &DirEntry::zeroed()).unwrap();
    if child_lip.is_dir() {
        // The removed directory's ".." no longer names the parent.
        parent_dp.inner().data_mut().nlink -= 1;
        parent_dp.inner().update();
    }
    drop(parent_lip);
    parent_ip.put();

    child_lip.data_mut().nlink -= 1;
    child_lip.update();
    Ok(())
}
