//! Persistent owner identity
//!
//! The owner id is read from a small text file so the same user keeps seeing
//! their links across menu sessions. A fresh UUID is generated (and written
//! back) when the file is missing or empty.

use std::io::ErrorKind;
use std::path::Path;
use uuid::Uuid;

/// Default location of the owner id file
pub const DEFAULT_USER_FILE: &str = "user_id.txt";

/// Returns the owner id stored at `path`, creating one if needed.
///
/// Never fails: if the file can't be read or written the id is still
/// returned, it just won't survive a restart.
pub fn load_or_create_owner_id(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => return contents.trim().to_string(),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read owner id file, using a temporary id");
            return Uuid::new_v4().to_string();
        }
    }

    let owner_id = Uuid::new_v4().to_string();
    if let Err(e) = std::fs::write(path, &owner_id) {
        tracing::warn!(path = %path.display(), error = %e, "could not persist owner id");
    } else {
        tracing::info!(path = %path.display(), "created new owner id");
    }
    owner_id
}
