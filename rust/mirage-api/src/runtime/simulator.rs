//! Async simulator service.
//!
//! Wraps [`VmController`] behind a lock, drives boot playback on tokio
//! timers, runs shell requests against the text generator, and broadcasts
//! [`SimEvent`]s. The lock is never held across an `.await`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::boot::BootScript;
use super::controller::{BootTicket, ShellOutcome, VmController};
use super::registry::SettingsPatch;
use crate::domain::{OsFamily, Snapshot, Turn, VirtualMachine, VmStatus};
use crate::events::SimEvent;
use crate::llm::TextGenerator;
use crate::logging::OpTimer;

/// Event channel capacity.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Timer settings for boot playback and the disk indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTiming {
    /// Delay between boot lines.
    pub tick: Duration,
    /// Delay after the last Linux boot line.
    pub linux_settle: Duration,
    /// Delay after the last Windows boot line.
    pub windows_settle: Duration,
    /// How long the disk indicator stays lit after a command.
    pub disk_activity: Duration,
}

impl SimulationTiming {
    /// Post-script delay for the given family.
    pub fn settle(&self, family: OsFamily) -> Duration {
        match family {
            OsFamily::Linux => self.linux_settle,
            OsFamily::Windows => self.windows_settle,
        }
    }
}

impl Default for SimulationTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(200),
            linux_settle: BootScript::for_family(OsFamily::Linux).settle_delay(),
            windows_settle: BootScript::for_family(OsFamily::Windows).settle_delay(),
            disk_activity: Duration::from_millis(600),
        }
    }
}

/// Shared handle to the running simulation.
#[derive(Clone)]
pub struct Simulator {
    controller: Arc<RwLock<VmController>>,
    generator: Arc<dyn TextGenerator>,
    timing: SimulationTiming,
    events: broadcast::Sender<SimEvent>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let controller = self.controller.read();
        f.debug_struct("Simulator")
            .field("machines", &controller.registry().len())
            .field("session", &controller.session_vm_id())
            .field("generator", &self.generator.describe())
            .field("timing", &self.timing)
            .finish()
    }
}

impl Simulator {
    /// Create a simulator around a controller and a text generator.
    pub fn new(
        controller: VmController,
        generator: Arc<dyn TextGenerator>,
        timing: SimulationTiming,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            controller: Arc::new(RwLock::new(controller)),
            generator,
            timing,
            events,
        }
    }

    /// Subscribe to simulator events.
    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.events.subscribe()
    }

    /// Run a query against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&VmController) -> R) -> R {
        f(&self.controller.read())
    }

    /// Label of the configured text generator.
    pub fn generator_label(&self) -> String {
        self.generator.describe()
    }

    /// Timer settings in use.
    pub fn timing(&self) -> SimulationTiming {
        self.timing
    }

    fn emit(&self, event: SimEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn live_turns(&self) -> Option<(String, Vec<Turn>)> {
        let controller = self.controller.read();
        let vm_id = controller.session_vm_id()?.to_string();
        let turns = controller.transcript()?.turns().to_vec();
        Some((vm_id, turns))
    }

    fn emit_transcript(&self) {
        if let Some((vm_id, turns)) = self.live_turns() {
            self.emit(SimEvent::TranscriptChanged { vm_id, turns });
        }
    }

    // === Registry ===

    /// Create a machine and return its record.
    pub fn create_vm(&self, name: &str, os_family: OsFamily, memory_mb: u32) -> VirtualMachine {
        let (vm, selected) = {
            let mut controller = self.controller.write();
            let vm = controller.create_vm(name, os_family, memory_mb);
            let selected = controller.registry().selected_id() == Some(vm.id.as_str());
            (vm, selected)
        };

        self.emit(SimEvent::MachineCreated {
            vm_id: vm.id.clone(),
            name: vm.name.clone(),
        });
        if selected {
            self.emit(SimEvent::SelectionChanged {
                vm_id: vm.id.clone(),
            });
        }
        vm
    }

    /// Select a machine.
    pub fn select_vm(&self, id: &str) -> bool {
        let selected = self.controller.write().select_vm(id);
        if selected {
            self.emit(SimEvent::SelectionChanged {
                vm_id: id.to_string(),
            });
        }
        selected
    }

    /// Replace a machine's settings.
    pub fn update_settings(&self, id: &str, patch: &SettingsPatch) -> bool {
        let updated = self.controller.write().update_settings(id, patch);
        if updated {
            self.emit(SimEvent::SettingsUpdated {
                vm_id: id.to_string(),
            });
        }
        updated
    }

    // === Lifecycle ===

    /// Start the selected machine and schedule its boot playback.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Option<BootTicket> {
        let ticket = self.controller.write().start_selected()?;
        self.emit(SimEvent::BootStarted {
            vm_id: ticket.vm_id.clone(),
            os_family: ticket.os_family,
        });
        tokio::spawn(self.clone().play_boot(ticket.clone()));
        Some(ticket)
    }

    async fn play_boot(self, ticket: BootTicket) {
        // `interval` panics on a zero period.
        let mut interval = tokio::time::interval(self.timing.tick.max(Duration::from_millis(1)));
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            let Some(playback) = self.controller.write().advance_boot(ticket.generation) else {
                tracing::debug!(vm_id = %ticket.vm_id, generation = ticket.generation, "Boot playback abandoned");
                return;
            };
            if let Some(line) = playback.revealed.last() {
                self.emit(SimEvent::BootLine {
                    vm_id: ticket.vm_id.clone(),
                    index: playback.revealed.len() - 1,
                    line: (*line).to_string(),
                });
            }
            if playback.done {
                break;
            }
        }

        tokio::time::sleep(self.timing.settle(ticket.os_family)).await;

        let finished = self
            .controller
            .write()
            .finish_boot(ticket.generation, Utc::now());
        if finished {
            self.emit(SimEvent::StatusChanged {
                vm_id: ticket.vm_id.clone(),
                status: VmStatus::Running,
            });
            self.emit_transcript();
        }
    }

    /// Power off the active machine.
    pub fn stop(&self) -> Option<String> {
        let vm_id = self.controller.write().stop()?;
        self.emit(SimEvent::StatusChanged {
            vm_id: vm_id.clone(),
            status: VmStatus::Off,
        });
        Some(vm_id)
    }

    // === Session shell ===

    /// Submit one command line and wait for its reply to be applied.
    pub async fn submit(&self, line: &str) -> ShellOutcome {
        let Some(request) = self.controller.write().begin_command(line) else {
            return ShellOutcome::Ignored;
        };

        self.emit_transcript();
        self.emit(SimEvent::DiskActivity {
            vm_id: request.vm_id.clone(),
            active: true,
        });

        let this = self.clone();
        let disk_request = request.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.timing.disk_activity).await;
            let cleared = this.controller.write().clear_disk_activity(&disk_request);
            if cleared {
                this.emit(SimEvent::DiskActivity {
                    vm_id: disk_request.vm_id.clone(),
                    active: false,
                });
            }
        });

        // Detached so a dropped caller cannot leave the user turn unanswered.
        let this = self.clone();
        let reply = tokio::spawn(async move {
            let timer = OpTimer::new("shell", "generate");
            let result = this.generator.generate(&request.prompt).await;
            timer.finish_with_result(result.as_ref());

            let outcome = this.controller.write().complete_command(&request, result);
            if outcome != ShellOutcome::Stale {
                this.emit_transcript();
            }
            outcome
        });

        match reply.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Shell reply task failed");
                ShellOutcome::Failed
            }
        }
    }

    // === Snapshots ===

    /// Snapshot the running machine's transcript.
    pub fn take_snapshot(&self) -> Option<Snapshot> {
        let (vm_id, snapshot) = self.controller.write().take_snapshot()?;
        self.emit(SimEvent::SnapshotTaken {
            vm_id,
            snapshot_id: snapshot.id.clone(),
            name: snapshot.name.clone(),
            created_at: snapshot.created_at,
        });
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::GenerateResult;
    use crate::runtime::{ControllerOptions, Registry};

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait]
    impl TextGenerator for Unreachable {
        async fn generate(&self, _prompt: &str) -> GenerateResult<String> {
            panic!("generator should not be called");
        }

        fn describe(&self) -> String {
            "unreachable".to_string()
        }
    }

    fn simulator() -> Simulator {
        let controller = VmController::new(Registry::new(), ControllerOptions::default());
        Simulator::new(controller, Arc::new(Unreachable), SimulationTiming::default())
    }

    #[test]
    fn test_default_timing() {
        let timing = SimulationTiming::default();
        assert_eq!(timing.tick, Duration::from_millis(200));
        assert_eq!(timing.settle(OsFamily::Linux), Duration::from_millis(1500));
        assert_eq!(timing.settle(OsFamily::Windows), Duration::from_millis(2500));
        assert_eq!(timing.disk_activity, Duration::from_millis(600));
    }

    #[test]
    fn test_create_emits_created_and_selected() {
        let sim = simulator();
        let mut events = sim.subscribe();

        let first = sim.create_vm("First", OsFamily::Linux, 1024);
        let second = sim.create_vm("Second", OsFamily::Windows, 4096);

        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::MachineCreated {
                vm_id: first.id.clone(),
                name: "First".to_string(),
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::SelectionChanged {
                vm_id: first.id.clone(),
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::MachineCreated {
                vm_id: second.id.clone(),
                name: "Second".to_string(),
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::SelectionChanged { vm_id: second.id }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_settings_update_emits_event() {
        let sim = simulator();
        let vm = sim.create_vm("Box", OsFamily::Linux, 1024);
        let mut events = sim.subscribe();

        let patch = SettingsPatch {
            memory_mb: Some(2048),
            ..SettingsPatch::default()
        };
        assert!(sim.update_settings(&vm.id, &patch));
        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::SettingsUpdated { vm_id: vm.id.clone() }
        );

        assert!(!sim.update_settings(&vm.id, &SettingsPatch::default()));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_submit_without_session_is_ignored() {
        let sim = simulator();
        sim.create_vm("Box", OsFamily::Linux, 1024);

        let outcome = tokio_test::block_on(sim.submit("ls"));
        assert_eq!(outcome, ShellOutcome::Ignored);
        assert!(sim.take_snapshot().is_none());
        assert!(sim.stop().is_none());
    }

    #[test]
    fn test_snapshot_event_names_running_machine() {
        let sim = simulator();
        let vm = sim.create_vm("Box", OsFamily::Linux, 1024);
        {
            let mut controller = sim.controller.write();
            let ticket = controller.start_selected().expect("start should be accepted");
            while !controller.advance_boot(ticket.generation).unwrap().done {}
            assert!(controller.finish_boot(ticket.generation, chrono::Utc::now()));
        }
        let mut events = sim.subscribe();

        let snapshot = sim.take_snapshot().expect("Failed to take snapshot");
        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::SnapshotTaken {
                vm_id: vm.id,
                snapshot_id: snapshot.id,
                name: "Snapshot 1".to_string(),
                created_at: snapshot.created_at,
            }
        );
    }

    #[test]
    fn test_debug_shows_generator() {
        let sim = simulator();
        let debug = format!("{sim:?}");
        assert!(debug.contains("unreachable"));
        assert!(debug.contains("machines: 0"));
    }
}
