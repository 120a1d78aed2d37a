//! Stage building
//!
//! Partitions systems into ordered stages where every member of a stage can
//! run alongside every other member. Systems are visited in priority order
//! (stable, so equal priorities keep registration order) and each one joins
//! the latest stage when it conflicts with none of its members, or opens a
//! new stage otherwise. Because any conflicting predecessor then sits in an
//! earlier stage, stage order never runs a system before a lower-priority
//! system it conflicts with.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::bitset::BitSet;
use crate::config::UndeclaredAccess;
use crate::error::{Result, SchedulerError};
use crate::system::{ComponentType, SystemAccess};

/// Input to the builder: one enabled system
#[derive(Debug, Clone)]
pub struct SystemNode {
    /// Caller-side index, echoed back in [`ExecutionStage::system_indices`]
    pub index: usize,
    pub name: String,
    pub priority: i32,
    pub access: SystemAccess,
}

impl SystemNode {
    pub fn new(index: usize, name: impl Into<String>, priority: i32, access: SystemAccess) -> Self {
        Self {
            index,
            name: name.into(),
            priority,
            access,
        }
    }
}

/// Represents execution stages where all systems in a stage can run in parallel
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionStage {
    pub system_indices: Vec<usize>,
    pub system_names: Vec<String>,
}

impl ExecutionStage {
    pub fn len(&self) -> usize {
        self.system_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.system_indices.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.system_names.iter().any(|n| n == name)
    }
}

#[derive(Default)]
struct AccessMask {
    reads: BitSet,
    writes: BitSet,
    exclusive: bool,
}

impl AccessMask {
    fn conflicts_with(&self, other: &AccessMask) -> bool {
        self.exclusive
            || other.exclusive
            || self.writes.intersects(&other.writes)
            || self.writes.intersects(&other.reads)
            || self.reads.intersects(&other.writes)
    }

    fn absorb(&mut self, other: &AccessMask) {
        self.reads.union_with(&other.reads);
        self.writes.union_with(&other.writes);
        self.exclusive |= other.exclusive;
    }
}

/// Dense component numbering, local to one build
#[derive(Default)]
struct ComponentIndex {
    slots: FxHashMap<ComponentType, usize>,
}

impl ComponentIndex {
    fn slot(&mut self, component: ComponentType) -> usize {
        let next = self.slots.len();
        *self.slots.entry(component).or_insert(next)
    }

    fn mask(&mut self, access: &SystemAccess, policy: UndeclaredAccess) -> AccessMask {
        AccessMask {
            reads: access.reads.iter().map(|c| self.slot(*c)).collect(),
            writes: access.writes.iter().map(|c| self.slot(*c)).collect(),
            exclusive: access.exclusive
                || (policy == UndeclaredAccess::Exclusive && access.is_undeclared()),
        }
    }
}

/// Builds execution stages from system dependencies
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    stages: Vec<ExecutionStage>,
}

impl DependencyGraph {
    /// Build stages from the enabled systems. Never fails; a fully
    /// conflicting set simply yields one stage per system.
    pub fn build(mut nodes: Vec<SystemNode>, policy: UndeclaredAccess) -> Self {
        nodes.sort_by_key(|node| node.priority);

        let mut components = ComponentIndex::default();
        let mut stages: Vec<ExecutionStage> = Vec::new();
        let mut open = AccessMask::default();

        for node in &nodes {
            let mask = components.mask(&node.access, policy);

            let joins_latest = !stages.is_empty() && !mask.conflicts_with(&open);
            if !joins_latest {
                stages.push(ExecutionStage::default());
                open = AccessMask::default();
            }

            open.absorb(&mask);
            if let Some(stage) = stages.last_mut() {
                stage.system_indices.push(node.index);
                stage.system_names.push(node.name.clone());
            }
        }

        let graph = Self { stages };
        graph.log_schedule();
        graph
    }

    /// Get execution stages
    pub fn stages(&self) -> &[ExecutionStage] {
        &self.stages
    }

    /// Get number of stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn system_count(&self) -> usize {
        self.stages.iter().map(ExecutionStage::len).sum()
    }

    /// Index of the stage holding `name`
    pub fn stage_of(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|stage| stage.contains(name))
    }

    pub fn describe(&self) -> ScheduleDebugInfo {
        ScheduleDebugInfo {
            stage_count: self.stages.len(),
            total_systems: self.system_count(),
            stages: self
                .stages
                .iter()
                .map(|stage| stage.system_names.clone())
                .collect(),
        }
    }

    fn log_schedule(&self) {
        tracing::debug!(
            stages = self.stages.len(),
            systems = self.system_count(),
            "rebuilt execution schedule"
        );
        for (stage_idx, stage) in self.stages.iter().enumerate() {
            tracing::debug!(
                stage = stage_idx,
                members = ?stage.system_names,
                "stage {} ({} systems)",
                stage_idx,
                stage.len()
            );
        }
    }
}

/// Debug information about scheduling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleDebugInfo {
    pub stage_count: usize,
    pub total_systems: usize,
    pub stages: Vec<Vec<String>>,
}

impl ScheduleDebugInfo {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the schedule as pretty JSON to `filename`
    pub fn export_json(&self, filename: &str) -> Result<()> {
        let io_error = |err: std::io::Error| SchedulerError::Config(format!("{filename}: {err}"));
        let mut writer = BufWriter::new(File::create(filename).map_err(io_error)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    struct Velocity;
    struct Sprite;

    fn node(index: usize, name: &str, priority: i32, access: SystemAccess) -> SystemNode {
        SystemNode::new(index, name, priority, access)
    }

    #[test]
    fn test_no_conflicts_parallel() {
        let graph = DependencyGraph::build(
            vec![
                node(0, "a", 0, SystemAccess::new().read::<Position>()),
                node(1, "b", 0, SystemAccess::new().write::<Velocity>()),
                node(2, "c", 0, SystemAccess::new().read::<Position>()),
            ],
            UndeclaredAccess::Compatible,
        );
        assert_eq!(graph.stage_count(), 1, "Should execute in parallel");
        assert_eq!(graph.stages()[0].system_indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_write_conflict_sequential() {
        let graph = DependencyGraph::build(
            vec![
                node(0, "writer", 0, SystemAccess::new().write::<Position>()),
                node(1, "reader", 1, SystemAccess::new().read::<Position>()),
            ],
            UndeclaredAccess::Compatible,
        );
        assert_eq!(graph.stage_count(), 2, "Should execute sequentially");
    }

    #[test]
    fn test_priority_sort_is_stable() {
        let graph = DependencyGraph::build(
            vec![
                node(0, "late", 10, SystemAccess::new().write::<Position>()),
                node(1, "first_tie", 5, SystemAccess::new().write::<Position>()),
                node(2, "second_tie", 5, SystemAccess::new().write::<Position>()),
            ],
            UndeclaredAccess::Compatible,
        );
        let order: Vec<_> = graph
            .stages()
            .iter()
            .map(|s| s.system_names[0].as_str())
            .collect();
        assert_eq!(order, vec!["first_tie", "second_tie", "late"]);
    }

    #[test]
    fn test_later_stage_joined_not_earlier() {
        // A writes Position, C reads it, B is unrelated and lands with C.
        let graph = DependencyGraph::build(
            vec![
                node(0, "A", 100, SystemAccess::new().write::<Position>()),
                node(1, "B", 200, SystemAccess::new().write::<Velocity>()),
                node(
                    2,
                    "C",
                    150,
                    SystemAccess::new().read::<Position>().write::<Sprite>(),
                ),
            ],
            UndeclaredAccess::Compatible,
        );
        assert_eq!(graph.describe().stages, vec![vec!["A"], vec!["C", "B"]]);
    }

    #[test]
    fn test_undeclared_policy() {
        let nodes = || {
            vec![
                node(0, "physics", 0, SystemAccess::new().write::<Position>()),
                node(1, "logger", 1, SystemAccess::empty()),
                node(2, "render", 2, SystemAccess::new().read::<Sprite>()),
            ]
        };

        let compatible = DependencyGraph::build(nodes(), UndeclaredAccess::Compatible);
        assert_eq!(compatible.stage_count(), 1);

        let exclusive = DependencyGraph::build(nodes(), UndeclaredAccess::Exclusive);
        assert_eq!(
            exclusive.describe().stages,
            vec![vec!["physics"], vec!["logger"], vec!["render"]]
        );
    }

    #[test]
    fn test_export_json_round_trip() {
        let graph = DependencyGraph::build(
            vec![
                node(0, "writer", 0, SystemAccess::new().write::<Position>()),
                node(1, "reader", 1, SystemAccess::new().read::<Position>()),
            ],
            UndeclaredAccess::Compatible,
        );
        let path = std::env::temp_dir().join(format!("schedule_{}.json", std::process::id()));
        let path = path.to_string_lossy().into_owned();
        graph.describe().export_json(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(written["stage_count"], 2);
        assert_eq!(written["stages"][1][0], "reader");
    }

    #[test]
    fn test_export_json_bad_path() {
        let info = DependencyGraph::default().describe();
        let err = info.export_json("/nonexistent-dir/schedule.json").unwrap_err();
        assert!(matches!(err, SchedulerError::Config(_)));
    }

    #[test]
    fn test_empty_input() {
        let graph = DependencyGraph::build(Vec::new(), UndeclaredAccess::Compatible);
        assert_eq!(graph.stage_count(), 0);
        assert_eq!(
            graph.describe().to_json().unwrap(),
            r#"{"stage_count":0,"total_systems":0,"stages":[]}"#
        );
    }
}
