//! Data-parallel iteration inside a single system.
//!
//! The executor only splits the slice into contiguous chunks and joins them
//! on the worker pool; it adds no synchronization between entities. The
//! action must touch only the entity it was handed, and any state shared
//! across entities (counters, caches) has to be thread safe on its own.
//! Chunk processing order is unspecified, so systems that need a stable
//! iteration order should iterate sequentially instead.

use crate::config::QueryConfig;
use crate::error::{Result, SchedulerError};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Chunked parallel-for over component slices
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelQueryExecutor {
    config: QueryConfig,
}

impl ParallelQueryExecutor {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Entities per chunk for a query of `len` entities, or `None` to run inline
    pub fn chunk_len(&self, len: usize) -> Option<usize> {
        if len < self.config.inline_threshold {
            return None;
        }
        let workers = worker_count().max(1);
        let chunk = len.div_ceil(workers).max(self.config.min_chunk_size.max(1));
        if chunk >= len {
            None
        } else {
            Some(chunk)
        }
    }

    /// Run `action` once per element
    pub fn for_each_mut<T, F>(&self, items: &mut [T], action: F)
    where
        T: Send,
        F: Fn(&mut T) + Send + Sync,
    {
        self.for_each_indexed_mut(items, |_, item| action(item));
    }

    /// Run `action` once per element, with the element's index in `items`
    pub fn for_each_indexed_mut<T, F>(&self, items: &mut [T], action: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Send + Sync,
    {
        let Some(chunk) = self.chunk_len(items.len()) else {
            items
                .iter_mut()
                .enumerate()
                .for_each(|(idx, item)| action(idx, item));
            return;
        };

        run_chunks_mut(items, chunk, |chunk_idx, slice: &mut [T]| {
            let base = chunk_idx * chunk;
            for (offset, item) in slice.iter_mut().enumerate() {
                action(base + offset, item);
            }
        });
    }

    /// Pairwise iteration over two columns of the same entities
    pub fn for_each_zip_mut<A, B, F>(&self, left: &mut [A], right: &[B], action: F) -> Result<()>
    where
        A: Send,
        B: Sync,
        F: Fn(&mut A, &B) + Send + Sync,
    {
        if left.len() != right.len() {
            return Err(SchedulerError::InvalidArgument(format!(
                "column length mismatch: {} vs {}",
                left.len(),
                right.len()
            )));
        }

        self.for_each_indexed_mut(left, |idx, a| action(a, &right[idx]));
        Ok(())
    }

    /// Fold every chunk independently, then combine the partials in chunk
    /// order. The result is deterministic for a fixed configuration and
    /// worker count even when `combine` is not commutative.
    pub fn fold_chunks<T, R, I, F, C>(&self, items: &[T], init: I, fold: F, combine: C) -> R
    where
        T: Sync,
        R: Send,
        I: Fn() -> R + Send + Sync,
        F: Fn(R, &T) -> R + Send + Sync,
        C: Fn(R, R) -> R,
    {
        let Some(chunk) = self.chunk_len(items.len()) else {
            return items.iter().fold(init(), fold);
        };

        let partials = fold_chunks_ordered(items, chunk, |slice: &[T]| {
            slice.iter().fold(init(), &fold)
        });

        let mut partials = partials.into_iter();
        match partials.next() {
            Some(first) => partials.fold(first, combine),
            None => init(),
        }
    }
}

#[cfg(feature = "parallel")]
fn worker_count() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "parallel"))]
fn worker_count() -> usize {
    1
}

#[cfg(feature = "parallel")]
fn run_chunks_mut<T, F>(items: &mut [T], chunk: usize, body: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    items
        .par_chunks_mut(chunk)
        .enumerate()
        .for_each(|(chunk_idx, slice)| body(chunk_idx, slice));
}

#[cfg(not(feature = "parallel"))]
fn run_chunks_mut<T, F>(items: &mut [T], chunk: usize, body: F)
where
    F: Fn(usize, &mut [T]),
{
    items
        .chunks_mut(chunk)
        .enumerate()
        .for_each(|(chunk_idx, slice)| body(chunk_idx, slice));
}

#[cfg(feature = "parallel")]
fn fold_chunks_ordered<T, R, F>(items: &[T], chunk: usize, body: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&[T]) -> R + Send + Sync,
{
    // collect() on an indexed parallel iterator keeps chunk order
    items.par_chunks(chunk).map(body).collect()
}

#[cfg(not(feature = "parallel"))]
fn fold_chunks_ordered<T, R, F>(items: &[T], chunk: usize, body: F) -> Vec<R>
where
    F: Fn(&[T]) -> R,
{
    items.chunks(chunk).map(body).collect()
}
