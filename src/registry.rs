//! Registered systems and the manager lifecycle
//!
//! Shared by [`crate::manager::SequentialSystemManager`] and
//! [`crate::schedule::ParallelScheduler`]. Entries stay sorted by priority;
//! equal priorities keep registration order.

use crate::dependency::SystemNode;
use crate::error::{Result, SchedulerError, SystemError};
use crate::executor::invoke_isolated;
use crate::system::{BoxedSystem, SystemAccess};

/// Manager lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Running,
    Disposed,
}

/// A registered system plus the metadata captured at registration
pub struct SystemEntry<W> {
    pub(crate) system: BoxedSystem<W>,
    pub(crate) name: String,
    pub(crate) priority: i32,
    pub(crate) access: SystemAccess,
    pub(crate) enabled: bool,
    pub(crate) initialized: bool,
}

impl<W> SystemEntry<W> {
    /// Capture name, priority and access once; they stay fixed afterwards
    pub fn new(system: BoxedSystem<W>) -> Self {
        let name = system.name().to_string();
        let priority = system.priority();
        let mut access = system.access();
        if !system.parallel_safe() {
            access.exclusive = true;
        }
        Self {
            system,
            name,
            priority,
            access,
            enabled: true,
            initialized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn access(&self) -> &SystemAccess {
        &self.access
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

pub struct SystemRegistry<W> {
    entries: Vec<SystemEntry<W>>,
    state: LifecycleState,
}

impl<W> Default for SystemRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> SystemRegistry<W> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            state: LifecycleState::Uninitialized,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Register a system. Names are the identity: a second system with the
    /// same name is rejected and the registry is left untouched.
    pub fn register(&mut self, system: BoxedSystem<W>) -> Result<()> {
        self.ensure_not_disposed()?;

        let entry = SystemEntry::new(system);
        if entry.name.trim().is_empty() {
            return Err(SchedulerError::InvalidArgument(
                "system name must not be empty".to_string(),
            ));
        }
        if self.contains(&entry.name) {
            return Err(SchedulerError::AlreadyRegistered(entry.name));
        }

        let at = self
            .entries
            .partition_point(|existing| existing.priority <= entry.priority);
        tracing::debug!(
            system = %entry.name,
            priority = entry.priority,
            slot = at,
            "registered system"
        );
        self.entries.insert(at, entry);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<BoxedSystem<W>> {
        self.ensure_not_disposed()?;
        let idx = self.require(name)?;
        tracing::debug!(system = name, "unregistered system");
        Ok(self.entries.remove(idx).system)
    }

    /// Returns true when the flag actually changed
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<bool> {
        self.ensure_not_disposed()?;
        let idx = self.require(name)?;
        let entry = &mut self.entries[idx];
        if entry.enabled == enabled {
            return Ok(false);
        }
        entry.enabled = enabled;
        tracing::debug!(system = name, enabled, "system toggled");
        Ok(true)
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool> {
        let idx = self.require(name)?;
        Ok(self.entries[idx].enabled)
    }

    /// `Uninitialized -> Initialized`
    pub fn begin_initialize(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Uninitialized => {
                self.state = LifecycleState::Initialized;
                Ok(())
            }
            LifecycleState::Disposed => Err(SchedulerError::Disposed),
            LifecycleState::Initialized | LifecycleState::Running => {
                Err(SchedulerError::AlreadyInitialized)
            }
        }
    }

    /// `Initialized | Running -> Running`
    pub fn begin_update(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Initialized | LifecycleState::Running => {
                self.state = LifecycleState::Running;
                Ok(())
            }
            LifecycleState::Uninitialized => Err(SchedulerError::NotInitialized),
            LifecycleState::Disposed => Err(SchedulerError::Disposed),
        }
    }

    /// Drop every system. Idempotent.
    pub fn dispose(&mut self) {
        if self.state != LifecycleState::Disposed {
            tracing::debug!(systems = self.entries.len(), "disposing systems");
        }
        self.entries.clear();
        self.state = LifecycleState::Disposed;
    }

    /// Run `initialize` on every system that has not seen it yet
    ///
    /// A failing system is reported and still marked initialized; it keeps
    /// receiving updates like any other system.
    pub fn initialize_pending(&mut self, world: &W, frame: u64) -> Vec<SystemError> {
        let mut errors = Vec::new();
        for entry in self.entries.iter_mut().filter(|e| !e.initialized) {
            entry.initialized = true;
            let system = &mut entry.system;
            if let Err(err) = invoke_isolated(&entry.name, frame, || system.initialize(world)) {
                tracing::error!(
                    system = %entry.name,
                    frame,
                    error = %err.error,
                    "system initialize failed"
                );
                errors.push(err);
            }
        }
        errors
    }

    /// Builder input for the enabled systems, indexed into [`Self::entries_mut`]
    pub fn nodes(&self) -> Vec<SystemNode> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.enabled)
            .map(|(idx, entry)| {
                SystemNode::new(idx, entry.name.clone(), entry.priority, entry.access.clone())
            })
            .collect()
    }

    pub fn entries(&self) -> &[SystemEntry<W>] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [SystemEntry<W>] {
        &mut self.entries
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| SchedulerError::SystemNotFound(name.to_string()))
    }

    fn ensure_not_disposed(&self) -> Result<()> {
        if self.state == LifecycleState::Disposed {
            return Err(SchedulerError::Disposed);
        }
        Ok(())
    }
}
