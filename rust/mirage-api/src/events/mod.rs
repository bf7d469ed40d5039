//! Simulator event model.
//!
//! Every state change the read model cares about is broadcast as a
//! [`SimEvent`] so a front-end can re-render without polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{OsFamily, Turn, VmStatus};

/// A change in simulator state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    /// A machine was added to the catalog.
    MachineCreated {
        /// New machine id.
        vm_id: String,
        /// Display name.
        name: String,
    },
    /// The selected machine changed.
    SelectionChanged {
        /// Newly selected machine.
        vm_id: String,
    },
    /// A machine's settings were replaced.
    SettingsUpdated {
        /// Machine id.
        vm_id: String,
    },
    /// Boot playback began.
    BootStarted {
        /// Machine id.
        vm_id: String,
        /// OS family, which determines the script.
        os_family: OsFamily,
    },
    /// One boot line was revealed.
    BootLine {
        /// Machine id.
        vm_id: String,
        /// Zero-based line index.
        index: usize,
        /// Line text.
        line: String,
    },
    /// A machine's stored status changed.
    StatusChanged {
        /// Machine id.
        vm_id: String,
        /// New status.
        status: VmStatus,
    },
    /// The live transcript changed.
    TranscriptChanged {
        /// Machine id.
        vm_id: String,
        /// Full transcript after the change.
        turns: Vec<Turn>,
    },
    /// The disk activity indicator toggled.
    DiskActivity {
        /// Machine id.
        vm_id: String,
        /// Whether the indicator is lit.
        active: bool,
    },
    /// A snapshot was captured.
    SnapshotTaken {
        /// Machine id.
        vm_id: String,
        /// Snapshot id.
        snapshot_id: String,
        /// Snapshot display name.
        name: String,
        /// Capture time.
        created_at: DateTime<Utc>,
    },
}

impl SimEvent {
    /// Event type name used as the SSE `event:` field.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MachineCreated { .. } => "machine_created",
            Self::SelectionChanged { .. } => "selection_changed",
            Self::SettingsUpdated { .. } => "settings_updated",
            Self::BootStarted { .. } => "boot_started",
            Self::BootLine { .. } => "boot_line",
            Self::StatusChanged { .. } => "status_changed",
            Self::TranscriptChanged { .. } => "transcript_changed",
            Self::DiskActivity { .. } => "disk_activity",
            Self::SnapshotTaken { .. } => "snapshot_taken",
        }
    }

    /// Machine the event concerns.
    pub fn vm_id(&self) -> &str {
        match self {
            Self::MachineCreated { vm_id, .. }
            | Self::SelectionChanged { vm_id }
            | Self::SettingsUpdated { vm_id }
            | Self::BootStarted { vm_id, .. }
            | Self::BootLine { vm_id, .. }
            | Self::StatusChanged { vm_id, .. }
            | Self::TranscriptChanged { vm_id, .. }
            | Self::DiskActivity { vm_id, .. }
            | Self::SnapshotTaken { vm_id, .. } => vm_id,
        }
    }
}
