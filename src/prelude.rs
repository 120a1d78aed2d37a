//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use stage_scheduler::prelude::*;
//! ```

pub use crate::config::{QueryConfig, SchedulerConfig, UndeclaredAccess};
pub use crate::error::{Result, SchedulerError, SystemError};
pub use crate::manager::SequentialSystemManager;
pub use crate::parallel::ParallelQueryExecutor;
pub use crate::performance::{SystemMetrics, SystemPerformanceTracker};
pub use crate::schedule::{FrameReport, ParallelScheduler};
pub use crate::system::{BoxedSystem, ComponentType, System, SystemAccess};
pub use crate::world::World;
