use crate::ssh_session::{RemoteCredentials, SshSession, SshSessionError};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};

/// Local directory name used when the remote directory has no last segment
pub const DEFAULT_LOCAL_DIRECTORY: &str = "downloads";

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("Session error: {0}")]
    Session(#[from] SshSessionError),

    #[error("Could not list remote directory {directory}: {source}")]
    Listing {
        directory: String,
        #[source]
        source: SshSessionError,
    },

    #[error("Could not copy {remote}: {source}")]
    Transfer {
        remote: String,
        #[source]
        source: SshSessionError,
    },

    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Could not create local directory {}: {source}", .path.display())]
    LocalDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A directory on the device that can be listed and copied from
pub trait RemoteDirectory {
    fn list(&mut self, directory: &str) -> Result<Vec<String>, RetrieveError>;

    fn copy_to(&mut self, remote_path: &str, local_path: &Path) -> Result<u64, RetrieveError>;
}

impl RemoteDirectory for SshSession {
    fn list(&mut self, directory: &str) -> Result<Vec<String>, RetrieveError> {
        self.list_dir(directory)
            .map_err(|source| RetrieveError::Listing {
                directory: directory.to_string(),
                source,
            })
    }

    fn copy_to(&mut self, remote_path: &str, local_path: &Path) -> Result<u64, RetrieveError> {
        self.download(remote_path, local_path)
            .map_err(|source| RetrieveError::Transfer {
                remote: remote_path.to_string(),
                source,
            })
    }
}

/// Which files to fetch and where to put them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    pub remote_directory: String,
    /// Literal file names or shell-style wildcards such as `*.png`
    pub patterns: Vec<String>,
    /// Directory the local copy directory is created in
    pub local_root: PathBuf,
}

impl FileRequest {
    pub fn new(remote_directory: impl Into<String>, patterns: Vec<String>) -> Self {
        Self {
            remote_directory: remote_directory.into(),
            patterns,
            local_root: PathBuf::from("."),
        }
    }

    pub fn with_local_root(mut self, local_root: impl Into<PathBuf>) -> Self {
        self.local_root = local_root.into();
        self
    }

    /// The last segment of the remote directory, or [`DEFAULT_LOCAL_DIRECTORY`]
    /// when it is empty (`/root/` or `""`), under `local_root`.
    pub fn local_directory(&self) -> PathBuf {
        let segment = self.remote_directory.rsplit('/').next().unwrap_or("");
        let name = if segment.is_empty() {
            DEFAULT_LOCAL_DIRECTORY
        } else {
            segment
        };
        self.local_root.join(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    pub remote: String,
    pub local: PathBuf,
    pub bytes: u64,
}

fn join_remote(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        name.to_string()
    } else if directory.ends_with('/') {
        format!("{}{}", directory, name)
    } else {
        format!("{}/{}", directory, name)
    }
}

/// Copy every remote entry matching any of the request's patterns.
///
/// The remote directory is listed once. Every pattern is matched against that
/// listing independently, so a file matched by two patterns is copied twice.
/// An invalid pattern or a failed copy is logged and skipped; failing to
/// create the local directory or to list the remote one aborts.
pub fn fetch_matching<R: RemoteDirectory + ?Sized>(
    remote: &mut R,
    request: &FileRequest,
) -> Result<Vec<CopiedFile>, RetrieveError> {
    let local_directory = request.local_directory();
    fs::create_dir_all(&local_directory).map_err(|source| RetrieveError::LocalDirectory {
        path: local_directory.clone(),
        source,
    })?;

    let remote_files = remote.list(&request.remote_directory)?;
    log::debug!(
        "Found {} entries in {}",
        remote_files.len(),
        request.remote_directory
    );

    let mut copied = Vec::new();
    for pattern in &request.patterns {
        let matcher = match Pattern::new(pattern) {
            Ok(matcher) => matcher,
            Err(source) => {
                let e = RetrieveError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                };
                log::error!("{}", e);
                continue;
            }
        };

        for name in remote_files.iter().filter(|name| matcher.matches(name)) {
            let remote_path = join_remote(&request.remote_directory, name);
            let local_path = local_directory.join(name);

            match remote.copy_to(&remote_path, &local_path) {
                Ok(bytes) => {
                    println!(
                        "File successfully copied: {} -> {}",
                        remote_path,
                        local_path.display()
                    );
                    copied.push(CopiedFile {
                        remote: remote_path,
                        local: local_path,
                        bytes,
                    });
                }
                Err(e) => log::error!("Error fetching file: {}", e),
            }
        }
    }

    if copied.is_empty() && !request.patterns.is_empty() {
        log::warn!(
            "No file in {} matched {:?}",
            request.remote_directory,
            request.patterns
        );
    }

    Ok(copied)
}

/// [`fetch_matching`] that logs and swallows its error instead of returning it
pub fn fetch_best_effort<R: RemoteDirectory + ?Sized>(
    remote: &mut R,
    request: &FileRequest,
) -> Vec<CopiedFile> {
    fetch_matching(remote, request).unwrap_or_else(|e| {
        log::error!("Error fetching files: {}", e);
        Vec::new()
    })
}

/// Connect to the device and fetch the requested files, best effort.
///
/// Every failure is logged and swallowed; the files copied before a failure
/// are returned. The session is closed on return whether or not an error
/// occurred.
pub fn fetch_files_from_directory(
    credentials: &RemoteCredentials,
    request: &FileRequest,
) -> Vec<CopiedFile> {
    match SshSession::connect(credentials) {
        Ok(mut session) => fetch_best_effort(&mut session, request),
        Err(e) => {
            log::error!("Error fetching files: {}", RetrieveError::from(e));
            Vec::new()
        }
    }
}
