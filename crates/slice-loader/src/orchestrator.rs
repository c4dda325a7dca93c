//! Bounded-parallel execution of independent fetches.
//!
//! Items are tagged with their input index before being run through
//! `buffer_unordered`, and results are slotted back by index, so output
//! order always matches input order whatever order fetches finish in.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// Runs independent fetches with at most `max_workers` in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOrchestrator {
    max_workers: usize,
}

impl FetchOrchestrator {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Concurrency for a call over `items` items.
    ///
    /// An explicit `requested` width overrides the configured maximum; the
    /// result never exceeds the item count and is at least 1.
    pub fn width_for(&self, items: usize, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.max_workers).min(items).max(1)
    }

    /// Run `f` over every item and report each outcome, in input order.
    ///
    /// A failing item never affects its siblings.
    pub async fn run_each<I, R, F, Fut>(&self, items: Vec<I>, width: usize, f: F) -> Vec<R>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = R>,
    {
        let len = items.len();
        if len <= 1 || width <= 1 {
            let mut out = Vec::with_capacity(len);
            for item in items {
                out.push(f(item).await);
            }
            return out;
        }

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(len).collect();
        let mut results = tagged(items, width, &f);
        while let Some((index, result)) = results.next().await {
            slots[index] = Some(result);
        }
        slots.into_iter().flatten().collect()
    }

    /// Run `f` over every item, failing the whole call on the first error.
    ///
    /// "First" is in completion order. Fetches already running when the
    /// error arrives are dropped by this call; cache-backed fetches keep
    /// running in the background and still populate the caches.
    pub async fn try_run_all<I, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        width: usize,
        f: F,
    ) -> Result<Vec<T>, E>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let len = items.len();
        if len <= 1 || width <= 1 {
            let mut out = Vec::with_capacity(len);
            for item in items {
                out.push(f(item).await?);
            }
            return Ok(out);
        }

        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(len).collect();
        let mut results = tagged(items, width, &f);
        while let Some((index, result)) = results.next().await {
            slots[index] = Some(result?);
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

impl Default for FetchOrchestrator {
    fn default() -> Self {
        Self::new(3)
    }
}

fn tagged<'f, I, R, F, Fut>(
    items: Vec<I>,
    width: usize,
    f: &'f F,
) -> impl futures::Stream<Item = (usize, R)> + 'f
where
    I: 'f,
    R: 'f,
    F: Fn(I) -> Fut,
    Fut: Future<Output = R> + 'f,
{
    stream::iter(items.into_iter().enumerate())
        .map(move |(index, item)| {
            let fetch = f(item);
            async move { (index, fetch.await) }
        })
        .buffer_unordered(width)
}
