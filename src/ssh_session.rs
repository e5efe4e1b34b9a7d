use ssh2::{Session, Sftp};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Where and as whom to log in on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl RemoteCredentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SshSessionError {
    #[error("Could not reach {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Authentication failed for user '{username}': {source}")]
    Authentication {
        username: String,
        #[source]
        source: ssh2::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// An authenticated SSH connection with an open SFTP channel.
///
/// The connection is closed when the session is dropped, so every exit path
/// of the caller releases it.
pub struct SshSession {
    session: Session,
    sftp: Sftp,
    host: String,
}

impl SshSession {
    /// Connect, authenticate with a password and open SFTP
    pub fn connect(credentials: &RemoteCredentials) -> Result<Self, SshSessionError> {
        log::debug!(
            "Connecting to {}:{} as {}",
            credentials.host,
            credentials.port,
            credentials.username
        );
        let tcp = TcpStream::connect((credentials.host.as_str(), credentials.port)).map_err(
            |source| SshSessionError::Connect {
                host: credentials.host.clone(),
                port: credentials.port,
                source,
            },
        )?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;

        // Host keys are accepted as presented.
        session
            .userauth_password(&credentials.username, &credentials.password)
            .map_err(|source| SshSessionError::Authentication {
                username: credentials.username.clone(),
                source,
            })?;

        log::debug!("Authenticated, opening SFTP channel");
        let sftp = session.sftp()?;

        Ok(Self {
            session,
            sftp,
            host: credentials.host.clone(),
        })
    }

    /// Names of the entries in a remote directory, without `.` and `..`
    pub fn list_dir(&self, directory: &str) -> Result<Vec<String>, SshSessionError> {
        let entries = self.sftp.readdir(Path::new(directory))?;

        Ok(entries
            .into_iter()
            .filter_map(|(path, _stat)| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .collect())
    }

    /// Copy one remote file to a local path, returning the number of bytes written
    pub fn download(&self, remote_path: &str, local_path: &Path) -> Result<u64, SshSessionError> {
        let mut remote_file = self.sftp.open(Path::new(remote_path))?;
        Ok(write_complete(&mut remote_file, local_path)?)
    }
}

/// `<name>.part` next to `path`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map_or_else(OsString::new, OsString::from);
    name.push(".part");
    path.with_file_name(name)
}

/// Stream `reader` into `path`.
///
/// Data lands in a `.part` sibling that is renamed over `path` once the copy
/// finished, so `path` never holds a truncated file. The partial file is
/// removed when the copy fails.
pub(crate) fn write_complete(reader: &mut impl Read, path: &Path) -> io::Result<u64> {
    let partial = partial_path(path);
    let copied = File::create(&partial).and_then(|mut file| {
        let bytes = io::copy(reader, &mut file)?;
        file.sync_all()?;
        Ok(bytes)
    });

    match copied {
        Ok(bytes) => {
            fs::rename(&partial, path)?;
            Ok(bytes)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&partial) {
                log::debug!("Could not remove {}: {}", partial.display(), cleanup);
            }
            Err(e)
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        log::debug!("Closing SSH session to {}", self.host);
        if let Err(e) = self.session.disconnect(None, "closing", None) {
            log::warn!("Failed to close SSH session to {}: {}", self.host, e);
        }
    }
}
