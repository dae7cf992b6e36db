//! Fan-out / join helpers shared by the verification frontier, discovery
//! and the deep-gathering batches.

use std::future::Future;

use futures::future::join_all;
use futures::stream::{self, StreamExt};

/// Run `f` over every item concurrently and join. Output order matches input.
pub async fn fan_out<I, F, Fut>(items: I, f: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    join_all(items.into_iter().map(f)).await
}

/// Run `f` over every item with at most `limit` in flight. Output is in
/// completion order.
pub async fn fan_out_bounded<I, F, Fut>(items: I, limit: usize, f: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    stream::iter(items)
        .map(f)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}
