//! Virtual machine records and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transcript::Turn;

/// Default processor count for newly created machines.
pub const DEFAULT_PROCESSORS: u32 = 2;
/// Default video memory for newly created machines, in MB.
pub const DEFAULT_VIDEO_MEMORY_MB: u32 = 128;
/// Default virtual disk size for newly created machines, in GB.
pub const DEFAULT_DISK_GB: u32 = 50;

/// Operating system family of a simulated machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Linux distributions (bash shell, GRUB boot script).
    Linux,
    /// Windows (cmd.exe shell, EFI/boot manager script).
    Windows,
}

impl OsFamily {
    /// Version label used when the caller does not supply one.
    pub fn default_version(self) -> &'static str {
        match self {
            Self::Linux => "Ubuntu 22.04 LTS",
            Self::Windows => "Windows 11 Pro",
        }
    }

    /// Human-readable shell flavor used when priming the text generator.
    pub fn shell_flavor(self) -> &'static str {
        match self {
            Self::Linux => "Linux bash",
            Self::Windows => "Windows command prompt (cmd.exe)",
        }
    }

    /// Suffix the login banner ends with.
    pub fn prompt_suffix(self) -> &'static str {
        match self {
            Self::Linux => "$ ",
            Self::Windows => ">",
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Power state stored on a machine record.
///
/// `Saved` and `Aborted` are display-only; nothing in the simulation
/// transitions into them, but seeded machines may carry them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VmStatus {
    /// Powered off.
    #[default]
    Off,
    /// Booted and accepting shell commands.
    Running,
    /// State saved to disk.
    Saved,
    /// Crashed or killed.
    Aborted,
}

impl std::fmt::Display for VmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Running => write!(f, "running"),
            Self::Saved => write!(f, "saved"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Resource knobs. Displayed only, never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Base memory in MB.
    pub memory_mb: u32,
    /// Virtual processor count.
    pub processors: u32,
    /// Video memory in MB.
    pub video_memory_mb: u32,
    /// Virtual disk size in GB.
    pub disk_gb: u32,
}

impl Resources {
    /// Default resources with the given memory size.
    pub fn with_memory(memory_mb: u32) -> Self {
        Self {
            memory_mb,
            processors: DEFAULT_PROCESSORS,
            video_memory_mb: DEFAULT_VIDEO_MEMORY_MB,
            disk_gb: DEFAULT_DISK_GB,
        }
    }
}

/// Frozen copy of a transcript taken while a machine was running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Transcript at capture time.
    pub transcript: Vec<Turn>,
}

impl Snapshot {
    /// Capture a snapshot from the given transcript turns.
    pub fn capture(name: impl Into<String>, turns: &[Turn]) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            transcript: turns.to_vec(),
        }
    }
}

/// One simulated machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    /// Unique machine identifier.
    pub id: String,
    /// Display name; also used as the guest host name.
    pub name: String,
    /// OS family.
    pub os_family: OsFamily,
    /// OS version label, e.g. "Ubuntu 22.04 LTS".
    pub os_version: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stored power state.
    pub status: VmStatus,
    /// Resource knobs.
    pub resources: Resources,
    /// Append-only diagnostic log.
    pub logs: Vec<String>,
    /// Snapshots in capture order.
    pub snapshots: Vec<Snapshot>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl VirtualMachine {
    /// Create a powered-off machine with default resources.
    pub fn new(name: impl Into<String>, os_family: OsFamily, memory_mb: u32) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            logs: vec![log_line(now, &format!("Virtual machine '{name}' created"))],
            name,
            os_family,
            os_version: os_family.default_version().to_string(),
            description: None,
            status: VmStatus::Off,
            resources: Resources::with_memory(memory_mb),
            snapshots: Vec::new(),
            created_at: now,
        }
    }

    /// Set the OS version label.
    #[must_use]
    pub fn with_version(mut self, os_version: impl Into<String>) -> Self {
        self.os_version = os_version.into();
        self
    }

    /// Set the stored status.
    #[must_use]
    pub fn with_status(mut self, status: VmStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Return a copy with `message` appended to the log.
    #[must_use]
    pub fn logged(mut self, message: &str) -> Self {
        self.logs.push(log_line(Utc::now(), message));
        self
    }

    /// Guest account name derived from the machine name.
    pub fn account_name(&self) -> String {
        let account: String = self
            .name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if account.is_empty() {
            "user".to_string()
        } else {
            account
        }
    }

    /// Working directory reported to the text generator.
    pub fn working_directory(&self) -> String {
        match self.os_family {
            OsFamily::Linux => format!("/home/{}", self.account_name()),
            OsFamily::Windows => format!("C:\\Users\\{}", self.account_name()),
        }
    }

    /// Login banner seeded into the transcript once the machine is running.
    pub fn login_banner(&self, at: DateTime<Utc>) -> String {
        let account = self.account_name();
        match self.os_family {
            OsFamily::Linux => format!(
                "{version} {host} tty1\n\n\
                 Welcome to {version} (GNU/Linux x86_64)\n\n\
                 Last login: {time} on tty1\n\
                 {account}@{host}:~{suffix}",
                version = self.os_version,
                host = self.name,
                time = at.format("%a %b %e %H:%M:%S %Y"),
                suffix = OsFamily::Linux.prompt_suffix(),
            ),
            OsFamily::Windows => format!(
                "Microsoft Windows [Version 10.0.22631]\n\
                 (c) Microsoft Corporation. All rights reserved.\n\n\
                 {host} signed in at {time}\n\n\
                 C:\\Users\\{account}{suffix}",
                host = self.name,
                time = at.format("%Y-%m-%d %H:%M:%S"),
                suffix = OsFamily::Windows.prompt_suffix(),
            ),
        }
    }
}

fn log_line(at: DateTime<Utc>, message: &str) -> String {
    format!("[{}] {message}", at.format("%Y-%m-%d %H:%M:%S"))
}
