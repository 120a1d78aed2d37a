use stage_scheduler::prelude::*;
use stage_scheduler::{DependencyGraph, SystemNode};

struct Position;
struct Velocity;
struct Sprite;
struct Health;
struct Shared;

struct Declared {
    name: String,
    priority: i32,
    access: SystemAccess,
}

impl System<()> for Declared {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn access(&self) -> SystemAccess {
        self.access.clone()
    }

    fn update(&mut self, _world: &(), _dt: f32) -> Result<()> {
        Ok(())
    }
}

fn declared(name: &str, priority: i32, access: SystemAccess) -> BoxedSystem<()> {
    Box::new(Declared {
        name: name.to_string(),
        priority,
        access,
    })
}

fn scheduler(policy: UndeclaredAccess) -> ParallelScheduler<()> {
    ParallelScheduler::new(SchedulerConfig::new().with_undeclared_access(policy)).unwrap()
}

#[test]
fn test_end_to_end_example_stages() {
    let mut scheduler = scheduler(UndeclaredAccess::Compatible);
    scheduler
        .register_system(declared("A", 100, SystemAccess::new().write::<Position>()))
        .unwrap();
    scheduler
        .register_system(declared("B", 200, SystemAccess::new().write::<Velocity>()))
        .unwrap();
    scheduler
        .register_system(declared(
            "C",
            150,
            SystemAccess::new().read::<Position>().write::<Sprite>(),
        ))
        .unwrap();

    assert_eq!(scheduler.system_names(), vec!["A", "C", "B"]);
    assert_eq!(scheduler.stage_count(), 2);
    assert_eq!(scheduler.stage_members(0).unwrap(), ["A"]);
    assert_eq!(scheduler.stage_members(1).unwrap(), ["C", "B"]);
}

#[test]
fn test_disjoint_components_single_stage() {
    let components = [
        ComponentType::of::<Position>(),
        ComponentType::of::<Velocity>(),
        ComponentType::of::<Sprite>(),
        ComponentType::of::<Health>(),
    ];
    let nodes: Vec<SystemNode> = components
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let access = if i % 2 == 0 {
                SystemAccess::new().with_write(*c)
            } else {
                SystemAccess::new().with_read(*c)
            };
            SystemNode::new(i, format!("s{i}"), (10 - i) as i32, access)
        })
        .collect();

    let graph = DependencyGraph::build(nodes, UndeclaredAccess::Compatible);
    assert_eq!(graph.stage_count(), 1);
    assert_eq!(graph.system_count(), 4);
}

#[test]
fn test_shared_writer_fully_sequential_in_priority_order() {
    let priorities = [40, 10, 30, 20, 50];
    let nodes: Vec<SystemNode> = priorities
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            SystemNode::new(i, format!("p{p}"), p, SystemAccess::new().write::<Shared>())
        })
        .collect();

    let graph = DependencyGraph::build(nodes, UndeclaredAccess::Compatible);
    let order: Vec<Vec<String>> = graph.describe().stages;
    assert_eq!(order, vec![vec!["p10"], vec!["p20"], vec!["p30"], vec!["p40"], vec!["p50"]]);
}

#[test]
fn test_stage_order_extends_priority_order() {
    // Mixed workload; check the invariants on the result rather than a
    // hand-computed layout.
    let specs: Vec<(i32, SystemAccess)> = vec![
        (5, SystemAccess::new().write::<Position>()),
        (1, SystemAccess::new().read::<Velocity>()),
        (3, SystemAccess::new().read::<Position>().write::<Sprite>()),
        (3, SystemAccess::new().write::<Velocity>()),
        (2, SystemAccess::new().read::<Sprite>()),
        (9, SystemAccess::empty()),
        (7, SystemAccess::new().read::<Health>().read::<Position>()),
        (0, SystemAccess::new().write::<Health>()),
    ];
    let nodes: Vec<SystemNode> = specs
        .iter()
        .enumerate()
        .map(|(i, (p, a))| SystemNode::new(i, format!("n{i}"), *p, a.clone()))
        .collect();

    let graph = DependencyGraph::build(nodes, UndeclaredAccess::Compatible);
    let stage_of = |idx: usize| {
        graph
            .stages()
            .iter()
            .position(|s| s.system_indices.contains(&idx))
            .unwrap()
    };

    assert_eq!(graph.system_count(), specs.len());
    for i in 0..specs.len() {
        for j in 0..specs.len() {
            let (pi, ai) = &specs[i];
            let (pj, aj) = &specs[j];
            if pi < pj {
                assert!(stage_of(i) <= stage_of(j), "n{i} must not run after n{j}");
            }
            if i != j && ai.conflicts_with(aj) {
                assert_ne!(stage_of(i), stage_of(j), "n{i} and n{j} conflict");
            }
        }
    }
}

#[test]
fn test_undeclared_system_policy_compatible() {
    let mut scheduler = scheduler(UndeclaredAccess::Compatible);
    scheduler
        .register_system(declared("physics", 0, SystemAccess::new().write::<Position>()))
        .unwrap();
    scheduler
        .register_system(declared("logger", 1, SystemAccess::empty()))
        .unwrap();
    assert_eq!(scheduler.stage_count(), 1);
}

#[test]
fn test_undeclared_system_policy_exclusive() {
    let mut scheduler = scheduler(UndeclaredAccess::Exclusive);
    scheduler
        .register_system(declared("physics", 0, SystemAccess::new().write::<Position>()))
        .unwrap();
    scheduler
        .register_system(declared("logger", 1, SystemAccess::empty()))
        .unwrap();
    scheduler
        .register_system(declared("render", 2, SystemAccess::new().read::<Sprite>()))
        .unwrap();
    assert_eq!(scheduler.stage_count(), 3);
    assert_eq!(scheduler.stage_of("logger"), Some(1));
}

#[test]
fn test_disabling_system_rebuilds_stages() {
    let mut scheduler = scheduler(UndeclaredAccess::Compatible);
    scheduler
        .register_system(declared("writer", 0, SystemAccess::new().write::<Position>()))
        .unwrap();
    scheduler
        .register_system(declared("reader", 1, SystemAccess::new().read::<Position>()))
        .unwrap();
    assert_eq!(scheduler.stage_count(), 2);

    scheduler.set_enabled("writer", false).unwrap();
    assert_eq!(scheduler.stage_count(), 1);
    assert_eq!(scheduler.describe().stages, vec![vec!["reader"]]);

    scheduler.set_enabled("writer", true).unwrap();
    assert_eq!(scheduler.stage_of("writer"), Some(0));
    assert_eq!(scheduler.stage_of("reader"), Some(1));
}
