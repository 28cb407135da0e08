use std::fs;
use std::io;
use std::path::Path;

/// Unlink a file, treating NotFound as success. Run files may already be
/// gone when cleanup runs twice or an external sweeper beat us to them.
pub(crate) fn remove_file_quiet(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
