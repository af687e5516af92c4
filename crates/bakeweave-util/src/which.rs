use std::io;
use std::path::{Path, PathBuf};

/// Searches each entry of the colon-separated `path` for `item`, returning the canonical path of
/// the first hit. Empty entries are skipped; an absolute `item` is only checked for existence.
pub fn which<P: AsRef<str>, I: AsRef<Path>>(path: P, item: I) -> io::Result<Option<PathBuf>> {
    let item = item.as_ref();
    if item.is_absolute() {
        return match item.exists() {
            true => item.canonicalize().map(Some),
            false => Ok(None),
        };
    }

    let found = path
        .as_ref()
        .split(':')
        .filter(|entry| !entry.is_empty())
        .map(|entry| PathBuf::from(entry).join(item))
        .find(|candidate| candidate.exists());

    found.map(|p| p.canonicalize()).transpose()
}
