//! Boot script playback.
//!
//! Playback is a pure function of elapsed ticks, so the same script can be
//! driven by a tokio interval in the service or by hand in tests.

use std::time::Duration;

use serde::Serialize;

use crate::domain::OsFamily;

const LINUX_SCRIPT: &[&str] = &[
    "BIOS v2.1.0 - Virtual Platform Firmware",
    "Detecting IDE drives... Primary master: VBOX HARDDISK",
    "Booting from Hard Disk...",
    "GRUB loading.",
    "Welcome to GRUB!",
    "Loading Linux 5.15.0-91-generic ...",
    "Loading initial ramdisk ...",
    "[    0.000000] Linux version 5.15.0-91-generic (buildd@lcy02-amd64-045)",
    "[    0.004512] ACPI: RSDP 0x00000000000E0000 000024 (v02 VBOX  )",
    "[    0.812301] PCI: Using configuration type 1 for base access",
    "[    1.402917] EXT4-fs (sda1): mounted filesystem with ordered data mode",
    "[    2.118004] systemd[1]: Detected virtualization oracle.",
    "[  OK  ] Started Journal Service.",
    "[  OK  ] Reached target Network.",
    "[  OK  ] Started OpenSSH server daemon.",
    "[  OK  ] Reached target Multi-User System.",
];

const WINDOWS_SCRIPT: &[&str] = &[
    "UEFI Interactive Shell v2.2",
    "EDK II",
    "UEFI v2.70 (EDK II, 0x00010000)",
    "Mapping table",
    "      FS0: Alias(s):HD0a1:;BLK1:",
    "Press ESC in 1 seconds to skip startup.nsh or any other key to continue.",
    "Shell> fs0:\\EFI\\Microsoft\\Boot\\bootmgfw.efi",
    "Windows Boot Manager",
    "Loading Windows...",
    "Starting Windows",
    "Preparing devices...",
    "Getting ready...",
    "Welcome",
];

/// Post-script delay for the Linux boot script.
const LINUX_SETTLE: Duration = Duration::from_millis(1500);
/// Post-script delay for the Windows boot script.
const WINDOWS_SETTLE: Duration = Duration::from_millis(2500);

/// The fixed ordered list of log lines played back while booting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootScript {
    lines: &'static [&'static str],
    settle: Duration,
}

impl BootScript {
    /// Script for the given OS family.
    pub fn for_family(family: OsFamily) -> Self {
        match family {
            OsFamily::Linux => Self {
                lines: LINUX_SCRIPT,
                settle: LINUX_SETTLE,
            },
            OsFamily::Windows => Self {
                lines: WINDOWS_SCRIPT,
                settle: WINDOWS_SETTLE,
            },
        }
    }

    /// Script lines in order.
    pub fn lines(&self) -> &'static [&'static str] {
        self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the script is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Default delay between the last line and the machine reaching Running.
    pub fn settle_delay(&self) -> Duration {
        self.settle
    }
}

/// Playback position after some number of ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playback {
    /// Lines revealed so far, in script order.
    pub revealed: Vec<&'static str>,
    /// Whether every line has been revealed.
    pub done: bool,
}

/// Reveal one line per elapsed tick.
pub fn playback(elapsed_ticks: usize, script: &BootScript) -> Playback {
    let shown = elapsed_ticks.min(script.len());
    Playback {
        revealed: script.lines[..shown].to_vec(),
        done: shown == script.len(),
    }
}
