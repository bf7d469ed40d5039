//! Lifecycle controller and session state.
//!
//! [`VmController`] owns the registry and the single active session. It is a
//! plain synchronous value: every operation either applies completely or is a
//! no-op, and none of them fail. Timers and network calls live in
//! [`Simulator`](super::Simulator), which feeds results back through the
//! generation-tagged entry points here.
//!
//! Session state machine:
//!
//! ```text
//! Idle --start--> Booting --(script done + settle)--> Running --stop--> Idle
//!                    |                                               ^
//!                    +----------------------stop---------------------+
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::boot::{playback, BootScript, Playback};
use super::registry::{Registry, SettingsPatch};
use super::shell::{build_prompt, interpret_reply, ShellReply, DEFAULT_TAIL_CHARS, SHELL_FAILURE_MESSAGE};
use crate::domain::{OsFamily, Snapshot, Transcript, Turn, VirtualMachine, VmStatus};
use crate::error::GenerateResult;

/// Phase of the single session slot.
#[derive(Debug, Clone, Default)]
pub enum SessionPhase {
    /// No machine is booting or running.
    #[default]
    Idle,
    /// Boot script playback in progress.
    Booting(BootState),
    /// Machine running with a live transcript.
    Running(RunningSession),
}

/// Playback state of a booting machine.
#[derive(Debug, Clone)]
pub struct BootState {
    /// Machine being booted.
    pub vm_id: String,
    /// Session generation this boot belongs to.
    pub generation: u64,
    /// Script being played.
    pub script: BootScript,
    /// Ticks elapsed so far.
    pub ticks: usize,
}

impl BootState {
    /// Current playback position.
    pub fn playback(&self) -> Playback {
        playback(self.ticks, &self.script)
    }
}

/// Live shell session of a running machine.
#[derive(Debug, Clone)]
pub struct RunningSession {
    /// Machine that is running.
    pub vm_id: String,
    /// Session generation.
    pub generation: u64,
    /// Live transcript.
    pub transcript: Transcript,
    /// Cosmetic disk activity indicator.
    pub disk_active: bool,
    disk_token: u64,
}

/// Handed out by [`VmController::start`]; identifies the boot to drive.
#[derive(Debug, Clone)]
pub struct BootTicket {
    /// Machine being booted.
    pub vm_id: String,
    /// Session generation of the boot.
    pub generation: u64,
    /// OS family of the machine.
    pub os_family: OsFamily,
    /// Script to play.
    pub script: BootScript,
}

/// One in-flight shell request.
#[derive(Debug, Clone)]
pub struct ShellRequest {
    /// Target machine.
    pub vm_id: String,
    /// Session generation the request targets.
    pub generation: u64,
    /// Prompt for the text generator.
    pub prompt: String,
    /// Disk activity token set by this submission.
    pub disk_token: u64,
}

/// What happened to a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellOutcome {
    /// Empty input or no running machine; nothing was sent.
    Ignored,
    /// Generator output appended as an assistant turn.
    Appended,
    /// Generator asked for a screen clear; transcript emptied.
    Cleared,
    /// Request failed; one error turn appended.
    Failed,
    /// The session moved on before the reply arrived; reply dropped.
    Stale,
}

/// Tunables for the controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Trailing transcript characters included in each shell prompt.
    pub prompt_tail_chars: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            prompt_tail_chars: DEFAULT_TAIL_CHARS,
        }
    }
}

/// Application state: the registry plus the single session slot.
#[derive(Debug, Clone, Default)]
pub struct VmController {
    registry: Registry,
    phase: SessionPhase,
    generation: u64,
    options: ControllerOptions,
}

impl VmController {
    /// Create a controller over an existing registry.
    pub fn new(registry: Registry, options: ControllerOptions) -> Self {
        Self {
            registry,
            phase: SessionPhase::Idle,
            generation: 0,
            options,
        }
    }

    // === Queries ===

    /// The machine catalog.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current session phase.
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Id of the machine occupying the session slot, if any.
    pub fn session_vm_id(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Idle => None,
            SessionPhase::Booting(boot) => Some(&boot.vm_id),
            SessionPhase::Running(run) => Some(&run.vm_id),
        }
    }

    /// Whether a machine is booting or running.
    pub fn is_session_active(&self) -> bool {
        !matches!(self.phase, SessionPhase::Idle)
    }

    /// Live transcript of the running machine.
    pub fn transcript(&self) -> Option<&Transcript> {
        match &self.phase {
            SessionPhase::Running(run) => Some(&run.transcript),
            _ => None,
        }
    }

    /// Boot lines revealed so far.
    pub fn boot_lines(&self) -> Vec<&'static str> {
        match &self.phase {
            SessionPhase::Booting(boot) => boot.playback().revealed,
            _ => Vec::new(),
        }
    }

    /// Whether the disk activity indicator is lit.
    pub fn is_disk_active(&self) -> bool {
        matches!(&self.phase, SessionPhase::Running(run) if run.disk_active)
    }

    /// Current session generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // === Registry commands ===

    /// Create a powered-off machine and select it.
    ///
    /// While a session is active the record is still appended, but the
    /// selection stays on the session machine.
    pub fn create_vm(&mut self, name: &str, os_family: OsFamily, memory_mb: u32) -> VirtualMachine {
        let vm = VirtualMachine::new(name, os_family, memory_mb);
        let id = self.registry.insert(vm.clone());
        if !self.is_session_active() {
            self.registry.select(&id);
        }
        tracing::info!(vm_id = %id, name = %name, os = %os_family, memory_mb, "Machine created");
        vm
    }

    /// Move the selection. No-op while a session is active.
    pub fn select_vm(&mut self, id: &str) -> bool {
        if self.is_session_active() {
            tracing::debug!(vm_id = %id, "Selection locked while a machine is active");
            return false;
        }
        self.registry.select(id)
    }

    /// Replace a machine's editable settings. No-op while it is booting or
    /// running, or when the patch is empty.
    pub fn update_settings(&mut self, id: &str, patch: &SettingsPatch) -> bool {
        if patch.is_empty() || self.session_vm_id() == Some(id) {
            return false;
        }
        let updated = self
            .registry
            .update(id, |vm| patch.apply(vm).logged("Settings changed"));
        if updated {
            tracing::info!(vm_id = %id, "Machine settings updated");
        }
        updated
    }

    // === Lifecycle ===

    /// Begin booting the selected machine.
    pub fn start_selected(&mut self) -> Option<BootTicket> {
        let id = self.registry.selected_id()?.to_string();
        self.start(&id)
    }

    /// Begin booting `id`.
    ///
    /// No-op if the machine is unknown, already running, or another machine
    /// occupies the session slot.
    pub fn start(&mut self, id: &str) -> Option<BootTicket> {
        let vm = self.registry.get(id)?;
        if vm.status == VmStatus::Running {
            return None;
        }
        if self.is_session_active() {
            tracing::warn!(
                vm_id = %id,
                active = ?self.session_vm_id(),
                "Start rejected: another machine is active"
            );
            return None;
        }

        let os_family = vm.os_family;
        let script = BootScript::for_family(os_family);
        self.generation += 1;
        self.phase = SessionPhase::Booting(BootState {
            vm_id: id.to_string(),
            generation: self.generation,
            script,
            ticks: 0,
        });
        self.registry.select(id);

        tracing::info!(vm_id = %id, generation = self.generation, os = %os_family, "Boot started");
        Some(BootTicket {
            vm_id: id.to_string(),
            generation: self.generation,
            os_family,
            script,
        })
    }

    /// Reveal the next boot line. Returns `None` once the boot is stale.
    pub fn advance_boot(&mut self, generation: u64) -> Option<Playback> {
        match &mut self.phase {
            SessionPhase::Booting(boot) if boot.generation == generation => {
                if boot.ticks < boot.script.len() {
                    boot.ticks += 1;
                }
                Some(boot.playback())
            }
            _ => None,
        }
    }

    /// Flip a fully played boot to Running and seed the login banner.
    ///
    /// Returns `false` if the boot is stale or its script is not done.
    pub fn finish_boot(&mut self, generation: u64, now: DateTime<Utc>) -> bool {
        let vm_id = match &self.phase {
            SessionPhase::Booting(boot) if boot.generation == generation && boot.playback().done => {
                boot.vm_id.clone()
            }
            _ => return false,
        };

        let Some(vm) = self.registry.get(&vm_id) else {
            self.phase = SessionPhase::Idle;
            return false;
        };
        let banner = vm.login_banner(now);
        self.registry.update(&vm_id, |vm| {
            vm.clone().with_status(VmStatus::Running).logged("Powered on")
        });

        let mut transcript = Transcript::new();
        transcript.push(Turn::system(banner));
        self.phase = SessionPhase::Running(RunningSession {
            vm_id: vm_id.clone(),
            generation,
            transcript,
            disk_active: false,
            disk_token: 0,
        });

        tracing::info!(vm_id = %vm_id, generation, "Machine running");
        true
    }

    /// Power off the active machine. Cancels a boot in progress.
    ///
    /// Returns the id of the machine that was stopped.
    pub fn stop(&mut self) -> Option<String> {
        let phase = std::mem::take(&mut self.phase);
        let (vm_id, note) = match phase {
            SessionPhase::Idle => return None,
            SessionPhase::Booting(boot) => (boot.vm_id, "Boot cancelled"),
            SessionPhase::Running(run) => (run.vm_id, "Powered off"),
        };
        self.generation += 1;
        self.registry
            .update(&vm_id, |vm| vm.clone().with_status(VmStatus::Off).logged(note));

        tracing::info!(vm_id = %vm_id, generation = self.generation, "{}", note);
        Some(vm_id)
    }

    // === Session shell ===

    /// Record a typed command and build its shell request.
    ///
    /// Returns `None` for empty/whitespace input or when nothing is running.
    pub fn begin_command(&mut self, line: &str) -> Option<ShellRequest> {
        if line.trim().is_empty() {
            return None;
        }
        let SessionPhase::Running(run) = &mut self.phase else {
            return None;
        };
        let vm = self.registry.get(&run.vm_id)?;

        let prompt = build_prompt(vm, &run.transcript, line, self.options.prompt_tail_chars);
        run.transcript.push(Turn::user(line));
        run.disk_active = true;
        run.disk_token += 1;

        Some(ShellRequest {
            vm_id: run.vm_id.clone(),
            generation: run.generation,
            prompt,
            disk_token: run.disk_token,
        })
    }

    /// Apply the generator result for `request`.
    pub fn complete_command(
        &mut self,
        request: &ShellRequest,
        result: GenerateResult<String>,
    ) -> ShellOutcome {
        let run = match &mut self.phase {
            SessionPhase::Running(run)
                if run.generation == request.generation && run.vm_id == request.vm_id =>
            {
                run
            }
            _ => {
                tracing::debug!(
                    vm_id = %request.vm_id,
                    generation = request.generation,
                    "Dropping stale shell reply"
                );
                return ShellOutcome::Stale;
            }
        };

        match result {
            Ok(text) => match interpret_reply(text) {
                ShellReply::Clear => {
                    run.transcript.clear();
                    ShellOutcome::Cleared
                }
                ShellReply::Output(text) => {
                    run.transcript.push(Turn::assistant(text));
                    ShellOutcome::Appended
                }
            },
            Err(e) => {
                tracing::warn!(vm_id = %request.vm_id, error = %e, "Shell request failed");
                run.transcript.push(Turn::error(SHELL_FAILURE_MESSAGE));
                ShellOutcome::Failed
            }
        }
    }

    /// Turn off the disk indicator if no later submission relit it.
    pub fn clear_disk_activity(&mut self, request: &ShellRequest) -> bool {
        match &mut self.phase {
            SessionPhase::Running(run)
                if run.generation == request.generation && run.disk_token == request.disk_token =>
            {
                let was_active = run.disk_active;
                run.disk_active = false;
                was_active
            }
            _ => false,
        }
    }

    // === Snapshots ===

    /// Freeze the live transcript into a new snapshot of the running machine.
    ///
    /// Returns the machine id alongside the snapshot.
    pub fn take_snapshot(&mut self) -> Option<(String, Snapshot)> {
        let SessionPhase::Running(run) = &self.phase else {
            return None;
        };
        let vm = self.registry.get(&run.vm_id)?;
        let snapshot = Snapshot::capture(
            format!("Snapshot {}", vm.snapshots.len() + 1),
            run.transcript.turns(),
        );

        let vm_id = run.vm_id.clone();
        let taken = snapshot.clone();
        self.registry.update(&vm_id, |vm| {
            let mut next = vm.clone().logged(&format!("Snapshot '{}' taken", taken.name));
            next.snapshots.push(taken);
            next
        });

        tracing::info!(vm_id = %vm_id, snapshot = %snapshot.name, "Snapshot taken");
        Some((vm_id, snapshot))
    }
}
