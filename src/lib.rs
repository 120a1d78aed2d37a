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

//! Stage Scheduler - dependency-aware parallel system scheduling
//!
//! Systems declare which component types they read and write. Those
//! declarations are grouped into conflict-free stages that run one after
//! another, each stage fanning out over a rayon pool. A failing system is
//! isolated to itself, and every invocation feeds the performance tracker.

pub mod bitset;
pub mod config;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod manager;
pub mod parallel;
pub mod performance;
pub mod prelude;
pub mod profiling;
pub mod registry;
pub mod schedule;
pub mod system;
pub mod world;

pub use config::*;
pub use dependency::*;
pub use error::*;
pub use executor::*;
pub use manager::*;
pub use parallel::*;
pub use performance::*;
pub use registry::*;
pub use schedule::*;
pub use system::*;
pub use world::*;
