// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! World: reference component storage
//!
//! The scheduler treats the world as an opaque `W: Sync` handle. This type is
//! the column store shipped with the crate: one dense `Vec<T>` per component
//! type, row `i` of every column belonging to entity `i`. Each column sits
//! behind its own lock, and borrows never wait: a request that collides
//! with an outstanding borrow fails with [`SchedulerError::ComponentBusy`].
//! Under a correct stage plan that never happens, so a `ComponentBusy`
//! during a frame points at a missing access declaration.

use ahash::AHashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::{Any, TypeId};

use crate::error::{Result, SchedulerError};
use crate::system::ComponentType;

struct ColumnSlot {
    component: ComponentType,
    /// Always an `RwLock<Vec<T>>` for the slot's component type
    column: Box<dyn Any + Send + Sync>,
}

/// Column store keyed by component type
#[derive(Default)]
pub struct World {
    columns: AHashMap<TypeId, ColumnSlot>,
    entity_count: usize,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the column for `T`
    ///
    /// The first column fixes the entity count; later columns must match it.
    pub fn insert_column<T: Send + Sync + 'static>(&mut self, values: Vec<T>) -> Result<()> {
        let replacing_only =
            self.columns.len() == 1 && self.columns.contains_key(&TypeId::of::<T>());
        if !self.columns.is_empty() && !replacing_only && values.len() != self.entity_count {
            return Err(SchedulerError::InvalidArgument(format!(
                "column {} has {} rows, world has {} entities",
                std::any::type_name::<T>(),
                values.len(),
                self.entity_count
            )));
        }

        self.entity_count = values.len();
        self.columns.insert(
            TypeId::of::<T>(),
            ColumnSlot {
                component: ComponentType::of::<T>(),
                column: Box::new(RwLock::new(values)),
            },
        );
        Ok(())
    }

    /// Fill a column for `T` with `count` copies of `value`
    pub fn with_column<T: Clone + Send + Sync + 'static>(
        mut self,
        count: usize,
        value: T,
    ) -> Result<Self> {
        self.insert_column(vec![value; count])?;
        Ok(self)
    }

    /// Remove and return the column for `T`
    pub fn remove_column<T: Send + Sync + 'static>(&mut self) -> Option<Vec<T>> {
        let slot = self.columns.remove(&TypeId::of::<T>())?;
        if self.columns.is_empty() {
            self.entity_count = 0;
        }
        slot.column
            .downcast::<RwLock<Vec<T>>>()
            .ok()
            .map(|lock| (*lock).into_inner())
    }

    /// Shared borrow of the column for `T`
    pub fn read<T: Send + Sync + 'static>(&self) -> Result<RwLockReadGuard<'_, Vec<T>>> {
        let lock = self.column::<T>()?;
        lock.try_read()
            .ok_or(SchedulerError::ComponentBusy(std::any::type_name::<T>()))
    }

    /// Exclusive borrow of the column for `T`
    pub fn write<T: Send + Sync + 'static>(&self) -> Result<RwLockWriteGuard<'_, Vec<T>>> {
        let lock = self.column::<T>()?;
        lock.try_write()
            .ok_or(SchedulerError::ComponentBusy(std::any::type_name::<T>()))
    }

    pub fn has_column<T: 'static>(&self) -> bool {
        self.columns.contains_key(&TypeId::of::<T>())
    }

    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Component types currently stored
    pub fn component_types(&self) -> Vec<ComponentType> {
        self.columns.values().map(|slot| slot.component).collect()
    }

    fn column<T: Send + Sync + 'static>(&self) -> Result<&RwLock<Vec<T>>> {
        self.columns
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.column.downcast_ref::<RwLock<Vec<T>>>())
            .ok_or(SchedulerError::ComponentNotFound(std::any::type_name::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position(f32);
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity(f32);

    #[test]
    fn test_columns_share_entity_count() {
        let mut world = World::new()
            .with_column(3, Position(0.0))
            .unwrap()
            .with_column(3, Velocity(1.0))
            .unwrap();
        assert_eq!(world.entity_count(), 3);
        assert_eq!(world.column_count(), 2);
        assert!(world.insert_column(vec![0u8; 2]).is_err());
    }

    #[test]
    fn test_read_write_borrows() {
        let world = World::new().with_column(2, Position(1.0)).unwrap();

        world.write::<Position>().unwrap()[1] = Position(5.0);
        assert_eq!(world.read::<Position>().unwrap()[1], Position(5.0));

        let first = world.read::<Position>().unwrap();
        let second = world.read::<Position>().unwrap();
        assert_eq!(first.len(), second.len());
        assert!(matches!(
            world.write::<Position>(),
            Err(SchedulerError::ComponentBusy(_))
        ));
    }

    #[test]
    fn test_missing_column() {
        let world = World::new();
        assert!(matches!(
            world.read::<Velocity>(),
            Err(SchedulerError::ComponentNotFound(_))
        ));
    }

    #[test]
    fn test_remove_column_returns_values() {
        let mut world = World::new().with_column(2, Velocity(3.0)).unwrap();
        assert_eq!(
            world.remove_column::<Velocity>(),
            Some(vec![Velocity(3.0); 2])
        );
        assert_eq!(world.entity_count(), 0);
        assert!(!world.has_column::<Velocity>());
    }
}
