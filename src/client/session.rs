//! Client-side session: a single opaque token persisted in a file.

use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

const SESSION_DIR: &str = ".bookshelf";
const SESSION_FILE: &str = "token";

/// Holds the current session token and the file it lives in.
#[derive(Debug, Clone)]
pub struct Session {
    path: PathBuf,
    token: Option<String>,
}

impl Session {
    /// `$HOME/.bookshelf/token`, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(SESSION_DIR).join(SESSION_FILE))
    }

    /// Read the token stored at `path`. A missing or empty file is an empty session.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let token = match fs::read_to_string(&path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err),
        };
        debug!(path = %path.display(), present = token.is_some(), "Loaded session");
        Ok(Self { path, token })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Persist `token`, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&mut self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        write_private(&self.path, token)?;
        self.token = Some(token.to_string());
        Ok(())
    }

    /// Forget the token and remove the file.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be removed.
    pub fn clear(&mut self) -> io::Result<()> {
        self.token = None;
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    use std::{io::Write, os::unix::fs::OpenOptionsExt};
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}
