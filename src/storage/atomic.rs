use std::io::{self, Write};
use std::path::Path;

/// Replace `path` with `bytes` so readers see either the old or the new file.
///
/// The payload goes to a temporary sibling that is fsynced and then renamed
/// over the target; the rename is the only commit point. On Unix the parent
/// directory is synced afterwards so the rename itself survives a crash.
/// On Windows the rename is `MoveFileExW(MOVEFILE_REPLACE_EXISTING)`, which
/// does not promise atomicity; a crash there can lose the new contents but
/// never leaves a truncated target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".propbook-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;

    sync_dir(parent)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
