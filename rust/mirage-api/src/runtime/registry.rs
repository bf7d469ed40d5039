//! Ordered machine catalog with a single selection.

use serde::{Deserialize, Serialize};

use crate::domain::{OsFamily, VirtualMachine, VmStatus};

/// Partial update of a machine's editable settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    /// New display name.
    pub name: Option<String>,
    /// New OS version label.
    pub os_version: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New base memory in MB.
    pub memory_mb: Option<u32>,
    /// New processor count.
    pub processors: Option<u32>,
    /// New video memory in MB.
    pub video_memory_mb: Option<u32>,
    /// New disk size in GB.
    pub disk_gb: Option<u32>,
}

impl SettingsPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Return a copy of `vm` with the patch applied.
    pub fn apply(&self, vm: &VirtualMachine) -> VirtualMachine {
        let mut next = vm.clone();
        if let Some(ref name) = self.name {
            next.name.clone_from(name);
        }
        if let Some(ref version) = self.os_version {
            next.os_version.clone_from(version);
        }
        if let Some(ref description) = self.description {
            next.description = Some(description.clone());
        }
        if let Some(memory_mb) = self.memory_mb {
            next.resources.memory_mb = memory_mb;
        }
        if let Some(processors) = self.processors {
            next.resources.processors = processors;
        }
        if let Some(video_memory_mb) = self.video_memory_mb {
            next.resources.video_memory_mb = video_memory_mb;
        }
        if let Some(disk_gb) = self.disk_gb {
            next.resources.disk_gb = disk_gb;
        }
        next
    }
}

/// Ordered list of machines plus the selected id.
///
/// Records are replaced whole; nothing hands out `&mut VirtualMachine`.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    machines: Vec<VirtualMachine>,
    selected: Option<String>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding `machines`, with the first one selected.
    pub fn with_machines(machines: Vec<VirtualMachine>) -> Self {
        let selected = machines.first().map(|vm| vm.id.clone());
        Self { machines, selected }
    }

    /// Demo catalog used when the service starts.
    pub fn demo() -> Self {
        Self::with_machines(vec![
            VirtualMachine::new("Ubuntu Server", OsFamily::Linux, 4096)
                .with_description("Web and database host"),
            VirtualMachine::new("Windows 11", OsFamily::Windows, 8192)
                .with_status(VmStatus::Saved)
                .with_description("Office workstation"),
            VirtualMachine::new("Debian Lab", OsFamily::Linux, 2048)
                .with_version("Debian 12 (bookworm)")
                .with_status(VmStatus::Aborted),
        ])
    }

    /// Machines in catalog order.
    pub fn list(&self) -> &[VirtualMachine] {
        &self.machines
    }

    /// Number of machines.
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Look up a machine by id.
    pub fn get(&self, id: &str) -> Option<&VirtualMachine> {
        self.machines.iter().find(|vm| vm.id == id)
    }

    /// Id of the selected machine.
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected machine.
    pub fn selected(&self) -> Option<&VirtualMachine> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    /// Append a machine and return its id.
    pub fn insert(&mut self, vm: VirtualMachine) -> String {
        let id = vm.id.clone();
        self.machines.push(vm);
        if self.selected.is_none() {
            self.selected = Some(id.clone());
        }
        id
    }

    /// Move the selection. Returns `false` for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    /// Replace the record with the same id. Returns `false` if absent.
    pub fn replace(&mut self, vm: VirtualMachine) -> bool {
        match self.machines.iter().position(|m| m.id == vm.id) {
            Some(index) => {
                self.machines[index] = vm;
                true
            }
            None => false,
        }
    }

    /// Copy-on-write update of one record.
    pub fn update<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&VirtualMachine) -> VirtualMachine,
    {
        let Some(next) = self.get(id).map(f) else {
            return false;
        };
        self.replace(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_machines_selects_first() {
        let registry = Registry::demo();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.selected_id(), Some(registry.list()[0].id.as_str()));
    }

    #[test]
    fn test_select_unknown_id_is_rejected() {
        let mut registry = Registry::demo();
        let before = registry.selected_id().map(str::to_string);
        assert!(!registry.select("missing"));
        assert_eq!(registry.selected_id().map(str::to_string), before);
    }

    #[test]
    fn test_update_replaces_whole_record() {
        let mut registry = Registry::new();
        let id = registry.insert(VirtualMachine::new("A", OsFamily::Linux, 1024));
        let original = registry.get(&id).cloned().unwrap();

        assert!(registry.update(&id, |vm| vm.clone().with_status(VmStatus::Running)));
        assert_eq!(registry.get(&id).unwrap().status, VmStatus::Running);
        assert_eq!(original.status, VmStatus::Off);
        assert!(!registry.update("missing", Clone::clone));
    }

    #[test]
    fn test_patch_applies_only_set_fields() {
        let vm = VirtualMachine::new("A", OsFamily::Linux, 1024);
        let patch = SettingsPatch {
            memory_mb: Some(4096),
            processors: Some(4),
            ..SettingsPatch::default()
        };
        let next = patch.apply(&vm);
        assert_eq!(next.resources.memory_mb, 4096);
        assert_eq!(next.resources.processors, 4);
        assert_eq!(next.resources.disk_gb, vm.resources.disk_gb);
        assert_eq!(next.name, "A");
        assert!(SettingsPatch::default().is_empty());
        assert!(!patch.is_empty());
    }
}
