//! System trait and access metadata

use crate::error::Result;
use smallvec::SmallVec;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

const INLINE_ACCESS: usize = 8;

/// Opaque identifier for a component kind
#[derive(Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Type name, for diagnostics only
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// Identity is the TypeId; the name never takes part in comparisons.
impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// System access metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemAccess {
    pub reads: SmallVec<[ComponentType; INLINE_ACCESS]>,
    pub writes: SmallVec<[ComponentType; INLINE_ACCESS]>,
    /// Exclusive systems never share a stage with anything
    pub exclusive: bool,
}

impl SystemAccess {
    /// Create empty access
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias of [`SystemAccess::new`]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Access that conflicts with every other system
    pub fn exclusive() -> Self {
        Self {
            exclusive: true,
            ..Self::default()
        }
    }

    /// Declare a read of `T`
    pub fn read<T: 'static>(mut self) -> Self {
        push_unique(&mut self.reads, ComponentType::of::<T>());
        self
    }

    /// Declare a write of `T`
    pub fn write<T: 'static>(mut self) -> Self {
        push_unique(&mut self.writes, ComponentType::of::<T>());
        self
    }

    pub fn with_read(mut self, component: ComponentType) -> Self {
        push_unique(&mut self.reads, component);
        self
    }

    pub fn with_write(mut self, component: ComponentType) -> Self {
        push_unique(&mut self.writes, component);
        self
    }

    /// True when no component is declared at all
    pub fn is_undeclared(&self) -> bool {
        !self.exclusive && self.reads.is_empty() && self.writes.is_empty()
    }

    /// Check if this access conflicts with another
    pub fn conflicts_with(&self, other: &SystemAccess) -> bool {
        if self.exclusive || other.exclusive {
            return true;
        }

        for write in &self.writes {
            if other.writes.contains(write) || other.reads.contains(write) {
                return true;
            }
        }

        for write in &other.writes {
            if self.reads.contains(write) {
                return true;
            }
        }

        false
    }

    /// Check if two systems can run in parallel
    pub fn can_run_parallel(&self, other: &SystemAccess) -> bool {
        !self.conflicts_with(other)
    }
}

fn push_unique(list: &mut SmallVec<[ComponentType; INLINE_ACCESS]>, component: ComponentType) {
    if !list.contains(&component) {
        list.push(component);
    }
}

/// A unit of per-frame logic, generic over the opaque world handle `W`.
///
/// Systems in the same stage run concurrently, so they only ever see the
/// world by shared reference. Any mutation goes through the world's own
/// interior mutability, partitioned by the declared [`SystemAccess`].
pub trait System<W>: Send {
    /// Unique name, used as the registration identity
    fn name(&self) -> &str;

    /// Lower runs earlier
    fn priority(&self) -> i32 {
        0
    }

    /// Component access, read once at registration
    fn access(&self) -> SystemAccess;

    /// Systems returning false always get a stage of their own
    fn parallel_safe(&self) -> bool {
        true
    }

    /// One-time setup before the first update
    fn initialize(&mut self, _world: &W) -> Result<()> {
        Ok(())
    }

    /// Run system logic for one frame
    fn update(&mut self, world: &W, delta_seconds: f32) -> Result<()>;
}

/// Boxed system
pub type BoxedSystem<W> = Box<dyn System<W>>;
