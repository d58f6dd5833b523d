//! Path name resolution.

use crate::{error::FsError, proc::Process};

use super::{inode::Inode, repr::DIRSIZ, FileSystem};

/// Splits the next element off `path`.
///
/// Leading and separating slashes are consumed; the remainder comes
/// back with no leading slashes. Returns `None` when no element
/// remains.
fn skip_elem(path: &[u8]) -> Option<(&[u8], &[u8])> {
    let start = path.iter().position(|&c| c != b'/')?;
    let path = &path[start..];
    let end = path.iter().position(|&c| c == b'/').unwrap_or(path.len());
    let (elem, rest) = path.split_at(end);
    let next = rest.iter().position(|&c| c != b'/').unwrap_or(rest.len());
    Some((elem, &rest[next..]))
}

/// Walks `path` from the root (absolute) or the process working
/// directory (relative).
///
/// With `parent` set, stops one element early and leaves the final
/// element in `name_out`, truncated to [`DIRSIZ`] bytes and NUL-padded.
fn resolve_impl<'fs>(
    fs: &'fs FileSystem,
    proc: &Process<'fs>,
    path: &[u8],
    parent: bool,
    mut name_out: Option<&mut [u8; DIRSIZ]>,
) -> Result<Inode<'fs>, FsError> {
    let mut ip = if path.first() == Some(&b'/') {
        fs.root()
    } else {
        proc.cwd().clone()
    };

    let mut rest = path;
    while let Some((elem, r)) = skip_elem(rest) {
        rest = r;
        if let Some(out) = name_out.as_mut() {
            let n = usize::min(elem.len(), DIRSIZ);
            out[..n].copy_from_slice(&elem[..n]);
            out[n..].fill(0);
        }

        let mut lip = ip.lock();
        let Some(mut dip) = lip.as_dir() else {
            return Err(FsError::NotADirectory);
        };
        if parent && rest.is_empty() {
            // Stop one level early.
            drop(lip);
            return Ok(ip);
        }
        let Some((next, _off)) = dip.lookup(elem) else {
            return Err(FsError::EntryNotFound);
        };
        drop(lip);
        ip = next;
    }

    if parent {
        // The walk ran out of elements, so there is no final name;
        // this is nameiparent("/") and the like.
        return Err(FsError::EntryNotFound);
    }
    Ok(ip)
}

/// Resolves `path` to its inode.
pub fn resolve<'fs>(
    fs: &'fs FileSystem,
    proc: &Process<'fs>,
    path: &[u8],
) -> Result<Inode<'fs>, FsError> {
    resolve_impl(fs, proc, path, false, None)
}

/// Resolves `path` to the inode of its parent directory and the final
/// path element.
pub fn resolve_parent<'fs, 'n>(
    fs: &'fs FileSystem,
    proc: &Process<'fs>,
    path: &[u8],
    name: &'n mut [u8; DIRSIZ],
) -> Result<(Inode<'fs>, &'n [u8]), FsError> {
    let ip = resolve_impl(fs, proc, path, true, Some(name))?;
    let len = name.iter().position(|&b| b == 0).unwrap_or(DIRSIZ);
    Ok((ip, &name[..len]))
}
