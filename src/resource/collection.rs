//! Lazy collections
//!
//! A [`Collection`] is one logical stream formed by concatenating any number of
//! sources, synchronous or asynchronous, in the order they were supplied.
//! Nothing is buffered unless the caller materializes it with
//! [`Collection::all`] or one of the sorting methods.

use super::fanout::FanOut;
use super::Resource;
use crate::error::Result;
use crate::persist::{Persistence, TableDescriptor};
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Collection of resources, as returned by API handles
pub type ResourceCollection = Collection<Resource>;

/// Lazy, possibly asynchronous sequence of items.
///
/// Items are `Result`s so that asynchronous sources can fail mid-stream.
/// Combinators pass errors through untouched.
pub struct Collection<T> {
    stream: BoxStream<'static, Result<T>>,
}

impl<T: Send + 'static> Collection<T> {
    pub fn empty() -> Self {
        Self::from_try_stream(stream::empty())
    }

    /// Synchronous source
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_try_stream(stream::iter(items.into_iter().map(Ok)))
    }

    /// Asynchronous source of plain items
    pub fn from_stream<S>(source: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self::from_try_stream(source.map(Ok))
    }

    /// Asynchronous source that may fail
    pub fn from_try_stream<S>(source: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            stream: source.boxed(),
        }
    }

    /// Source produced by a future, which runs when the collection is first
    /// polled
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Collection<T>>> + Send + 'static,
    {
        let stream = stream::once(future)
            .map(|result| match result {
                Ok(collection) => collection.stream,
                Err(e) => stream::once(future::ready(Err(e))).boxed(),
            })
            .flatten();
        Self::from_try_stream(stream)
    }

    /// Concatenate sources in order
    pub fn chain<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Collection<T>>,
    {
        let sources: Vec<_> = sources.into_iter().map(|c| c.stream).collect();
        Self::from_try_stream(stream::iter(sources).flatten())
    }

    /// Append another collection after this one
    pub fn concat(self, other: Collection<T>) -> Self {
        Self::from_try_stream(self.stream.chain(other.stream))
    }

    /// Keep items where `predicate` holds
    pub fn filter<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        let stream = self.stream.filter(move |item| {
            let keep = match item {
                Ok(value) => predicate(value),
                Err(_) => true,
            };
            future::ready(keep)
        });
        Self::from_try_stream(stream)
    }

    /// Transform each item
    pub fn map<U, F>(self, mut transform: F) -> Collection<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Collection::from_try_stream(self.stream.map(move |item| item.map(&mut transform)))
    }

    /// Drop items equal to one already yielded in this traversal.
    ///
    /// Keeps every distinct item seen so far in memory.
    pub fn distinct(self) -> Self
    where
        T: Ord + Clone,
    {
        let mut seen: BTreeSet<T> = BTreeSet::new();
        let stream = self.stream.filter(move |item| {
            let keep = match item {
                Ok(value) if seen.contains(value) => false,
                Ok(value) => {
                    seen.insert(value.clone());
                    true
                },
                Err(_) => true,
            };
            future::ready(keep)
        });
        Self::from_try_stream(stream)
    }

    /// First item, or `None` for an empty collection. Only the first item is
    /// produced.
    pub async fn first(self) -> Result<Option<T>> {
        let mut stream = self.stream;
        stream.next().await.transpose()
    }

    /// Materialize every item in source order
    pub async fn all(self) -> Result<Vec<T>> {
        self.stream.try_collect().await
    }

    /// Materialize and sort by natural order (stable)
    pub async fn sorted(self, reverse: bool) -> Result<Vec<T>>
    where
        T: Ord,
    {
        let mut items = self.all().await?;
        if reverse {
            items.sort_by(|a, b| b.cmp(a));
        } else {
            items.sort();
        }
        Ok(items)
    }

    /// Materialize and sort by an extracted key (stable)
    pub async fn sorted_by_key<K, F>(self, mut key: F, reverse: bool) -> Result<Vec<T>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        let mut items = self.all().await?;
        items.sort_by(|a, b| {
            let (ka, kb) = (key(a), key(b));
            if reverse {
                kb.cmp(&ka)
            } else {
                ka.cmp(&kb)
            }
        });
        Ok(items)
    }
}

impl ResourceCollection {
    /// Create every resource concurrently; results arrive in completion order
    pub fn create(self) -> Self {
        FanOut::default().create(self)
    }

    /// Commit every resource concurrently; results arrive in completion order
    pub fn commit(self) -> Self {
        FanOut::default().commit(self)
    }

    /// Delete every resource concurrently; yields each resource once deleted
    pub fn delete(self) -> Self {
        FanOut::default().delete(self)
    }

    /// Insert every resource through `sink` concurrently
    pub fn to_sql(self, sink: Arc<dyn Persistence>, table: Arc<TableDescriptor>) -> Self {
        FanOut::default().to_sql(self, sink, table)
    }
}

impl<T> Stream for Collection<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }
}

impl<T: Send + 'static> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Collection(..)")
    }
}
