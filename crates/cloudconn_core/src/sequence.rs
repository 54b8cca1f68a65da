//! Lazy, restartable result sequences.
//!
//! A [`Sequence`] does no I/O when created. Each call to [`Sequence::iter`]
//! starts a fresh listing from the first page; pages are fetched on demand
//! and continuation tokens stay internal.

use crate::error::ConnectorResult;
use crate::types::Page;
use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

type Fetch<T> = Arc<dyn Fn(Option<&str>) -> ConnectorResult<Page<T>> + Send + Sync>;

/// A finite, restartable sequence of results.
pub struct Sequence<T> {
    fetch: Fetch<T>,
    limit: Option<usize>,
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self {
            fetch: Arc::clone(&self.fetch),
            limit: self.limit,
        }
    }
}

impl<T> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> Sequence<T> {
    /// Creates a sequence from a page fetcher.
    ///
    /// The fetcher receives `None` for the first page and the previous
    /// page's continuation token afterwards.
    pub fn new(
        fetch: impl Fn(Option<&str>) -> ConnectorResult<Page<T>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            fetch: Arc::new(fetch),
            limit: None,
        }
    }

    /// Caps the number of items each iteration yields.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// The item cap, if any.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Starts a fresh iteration.
    #[must_use]
    pub fn iter(&self) -> SequenceIter<T> {
        SequenceIter {
            fetch: Arc::clone(&self.fetch),
            buffer: VecDeque::new(),
            token: None,
            started: false,
            done: false,
            remaining: self.limit,
        }
    }

    /// Iterates to the end, stopping at the first error.
    pub fn collect_all(&self) -> ConnectorResult<Vec<T>> {
        self.iter().collect()
    }

    /// Transforms every item.
    #[must_use]
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + Send + Sync + 'static) -> Sequence<U> {
        let inner = self.fetch;
        Sequence::<U>::new(move |token| {
            let page = inner(token)?;
            Ok(Page::new(page.items.into_iter().map(&f).collect(), page.next))
        })
        .with_limit(self.limit)
    }
}

impl<'a, T: 'static> IntoIterator for &'a Sequence<T> {
    type Item = ConnectorResult<T>;
    type IntoIter = SequenceIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`Sequence`].
///
/// After yielding an error the iterator is exhausted.
pub struct SequenceIter<T> {
    fetch: Fetch<T>,
    buffer: VecDeque<T>,
    token: Option<String>,
    started: bool,
    done: bool,
    remaining: Option<usize>,
}

impl<T> fmt::Debug for SequenceIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceIter")
            .field("buffered", &self.buffer.len())
            .field("started", &self.started)
            .field("done", &self.done)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl<T> Iterator for SequenceIter<T> {
    type Item = ConnectorResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == Some(0) {
                return None;
            }
            if let Some(item) = self.buffer.pop_front() {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(Ok(item));
            }
            if self.done || (self.started && self.token.is_none()) {
                self.done = true;
                return None;
            }

            self.started = true;
            match (self.fetch)(self.token.as_deref()) {
                Ok(page) => {
                    self.token = page.next;
                    self.buffer.extend(page.items);
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<T> FusedIterator for SequenceIter<T> {}
