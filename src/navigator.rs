//! Listing, directory management, deletion and existence checks over one
//! session.
//!
//! `delete` and `path_exists` report failure as `false` instead of an error:
//! a missing file and a file that could not be removed look the same to the
//! caller.

use crate::client::RemoteSession;
use crate::error::NavigationError;
use crate::listing::{DirectoryListing, EntryKind};
use crate::path;
use tracing::{debug, info};

/// Immediate entries of one kind at `path`, or at the working directory when
/// `path` is `None`. Never recurses.
pub fn list(
    session: &mut dyn RemoteSession,
    path: Option<&str>,
    kind: EntryKind,
) -> Result<Vec<String>, NavigationError> {
    let path = match path {
        Some(path) => path.to_string(),
        None => session.pwd().map_err(NavigationError::WorkingDirectory)?,
    };

    let lines = session
        .list(&path)
        .map_err(|source| NavigationError::List {
            path: path.clone(),
            source,
        })?;

    let listing = DirectoryListing::parse(path, &lines);
    debug!(
        path = %listing.path,
        entries = listing.entries.len(),
        "listed remote directory"
    );
    Ok(listing.names(kind))
}

/// Creates one directory relative to the working directory. Parents are not
/// created.
pub fn make_directory(session: &mut dyn RemoteSession, name: &str) -> Result<(), NavigationError> {
    session
        .mkdir(name)
        .map_err(|source| NavigationError::MakeDirectory {
            name: name.to_string(),
            source,
        })?;
    info!(name, "created remote directory");
    Ok(())
}

pub fn change_directory(
    session: &mut dyn RemoteSession,
    name: &str,
) -> Result<(), NavigationError> {
    session
        .cwd(name)
        .map_err(|source| NavigationError::ChangeDirectory {
            name: name.to_string(),
            source,
        })
}

/// Deletes `directory/file_name`, returning whether the server removed it.
pub fn delete(session: &mut dyn RemoteSession, directory: &str, file_name: &str) -> bool {
    let path = path::join(directory, file_name);
    match session.rm(&path) {
        Ok(()) => {
            info!(path = %path, "deleted remote file");
            true
        }
        Err(err) => {
            debug!(path = %path, error = %err, "delete failed");
            false
        }
    }
}

/// Checks a multi-segment path by changing into each prefix from the root.
///
/// One round-trip per segment; stops at the first segment that does not
/// resolve.
pub fn path_exists(session: &mut dyn RemoteSession, path: &str) -> bool {
    for prefix in path::prefixes(path) {
        if let Err(err) = session.cwd(&prefix) {
            debug!(path, missing = %prefix, error = %err, "path does not exist");
            return false;
        }
    }
    true
}
