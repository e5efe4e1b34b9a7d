use std::fmt;
use std::io;
use std::process::{Command, ExitStatus};

pub const DEFAULT_PID_EXECUTABLE: &str = "/root/PhaseStabilization/RedPitayaPid/pid";
pub const DEFAULT_PID_USER: &str = "root";

/// Gains and setpoint forwarded verbatim to the controller
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidParameters {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub setpoint: f64,
}

impl PidParameters {
    pub fn new(p: f64, i: f64, d: f64, setpoint: f64) -> Self {
        Self { p, i, d, setpoint }
    }

    /// All gains and the setpoint at zero
    pub fn cleared() -> Self {
        Self::default()
    }
}

impl fmt::Display for PidParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P={}, I={}, D={}, Setpoint={}",
            self.p, self.i, self.d, self.setpoint
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PidError {
    #[error("Could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{command}' on {destination} returned non-zero {status}")]
    NonZeroExit {
        destination: String,
        command: String,
        status: ExitStatus,
    },
}

/// Client for the PID program on a Red Pitaya.
///
/// Commands go through the system `ssh` client, so authentication is whatever
/// the caller's SSH configuration provides (keys, agent, `~/.ssh/config`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpPid {
    host: String,
    user: String,
    pid_executable: String,
    ssh_program: String,
}

impl RpPid {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: DEFAULT_PID_USER.to_string(),
            pid_executable: DEFAULT_PID_EXECUTABLE.to_string(),
            ssh_program: "ssh".to_string(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_pid_executable(mut self, pid_executable: impl Into<String>) -> Self {
        self.pid_executable = pid_executable.into();
        self
    }

    /// Program used in place of `ssh`
    pub fn with_ssh_program(mut self, ssh_program: impl Into<String>) -> Self {
        self.ssh_program = ssh_program.into();
        self
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// The command line run on the device
    pub fn remote_command(&self, parameters: &PidParameters) -> String {
        format!(
            "{} {} {} {} {}",
            self.pid_executable, parameters.p, parameters.i, parameters.d, parameters.setpoint
        )
    }

    /// Send new gains and setpoint to the controller
    pub fn set_pid(&self, parameters: PidParameters) -> Result<(), PidError> {
        let destination = self.destination();
        let command = self.remote_command(&parameters);
        log::debug!("Running {} {} '{}'", self.ssh_program, destination, command);

        let status = Command::new(&self.ssh_program)
            .arg(&destination)
            .arg(&command)
            .status()
            .map_err(|source| PidError::Spawn {
                program: self.ssh_program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(PidError::NonZeroExit {
                destination,
                command,
                status,
            });
        }

        println!("PID set: {}", parameters);
        Ok(())
    }

    /// Zero all gains and the setpoint
    pub fn clear_pid(&self) -> Result<(), PidError> {
        self.set_pid(PidParameters::cleared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_command() {
        let pid = RpPid::new("rp-f0a1b2.local");
        let parameters = PidParameters::new(1.5, 0.25, 0.0, 1756.0);
        assert_eq!(
            pid.remote_command(&parameters),
            "/root/PhaseStabilization/RedPitayaPid/pid 1.5 0.25 0 1756"
        );
    }

    #[test]
    fn test_cleared_parameters() {
        let pid = RpPid::new("rp-f0a1b2.local").with_pid_executable("/opt/pid");
        assert_eq!(
            pid.remote_command(&PidParameters::cleared()),
            "/opt/pid 0 0 0 0"
        );
    }

    #[test]
    fn test_display() {
        let parameters = PidParameters::new(2.0, -0.5, 0.0, 10.0);
        assert_eq!(parameters.to_string(), "P=2, I=-0.5, D=0, Setpoint=10");
    }

    #[test]
    fn test_destination() {
        let pid = RpPid::new("10.0.0.7").with_user("admin");
        assert_eq!(pid.destination(), "admin@10.0.0.7");
    }

    #[test]
    fn test_set_pid_success() {
        let pid = RpPid::new("10.0.0.7").with_ssh_program("true");
        assert!(pid.set_pid(PidParameters::new(1.0, 0.1, 0.01, 0.0)).is_ok());
    }

    #[test]
    fn test_clear_pid_non_zero_exit() {
        let pid = RpPid::new("10.0.0.7").with_ssh_program("false");

        match pid.clear_pid() {
            Err(PidError::NonZeroExit {
                destination,
                command,
                status,
            }) => {
                assert_eq!(destination, "root@10.0.0.7");
                assert_eq!(command, format!("{} 0 0 0 0", DEFAULT_PID_EXECUTABLE));
                assert!(!status.success());
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_ssh_program() {
        let pid = RpPid::new("10.0.0.7").with_ssh_program("/nonexistent/ssh");
        assert!(matches!(
            pid.clear_pid(),
            Err(PidError::Spawn { .. })
        ));
    }
}
