// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Derived from futures' `BufferUnordered` -- https://docs.rs/futures-util/0.3.5/src/futures_util/stream/stream/buffer_unordered.rs.html#15-23
//!
//! The difference: once the gate's token is cancelled, no further futures are pulled from the
//! source stream. Futures already in progress are still driven to completion and yielded.
use core::pin::Pin;

use futures::stream::{Fuse, FuturesUnordered, StreamExt};
use futures::task::{Context, Poll};
use futures::{Future, Stream};
use pin_project::pin_project;
use tokio_util::sync::CancellationToken;

impl<T: ?Sized> StreamExtBufferUnorderedWithGate for T where T: StreamExt {}

pub trait StreamExtBufferUnorderedWithGate: StreamExt {
    fn buffered_unordered_with_gate(self, n: usize, gate: CancellationToken) -> BufferUnorderedWithGate<Self>
    where
        Self: Sized,
        Self::Item: Future,
    {
        BufferUnorderedWithGate::new(self, n, gate)
    }
}

#[pin_project(project = BufferUnorderedWithGateProj)]
#[must_use = "streams do nothing unless polled"]
pub struct BufferUnorderedWithGate<St>
where
    St: Stream,
    St::Item: Future,
{
    #[pin]
    stream: Fuse<St>,
    in_progress_queue: FuturesUnordered<St::Item>,
    max: usize,
    gate: CancellationToken,
    pulled: usize,
}

impl<St> BufferUnorderedWithGate<St>
where
    St: Stream,
    St::Item: Future,
{
    pub(crate) fn new(stream: St, n: usize, gate: CancellationToken) -> BufferUnorderedWithGate<St> {
        BufferUnorderedWithGate {
            stream: stream.fuse(),
            in_progress_queue: FuturesUnordered::new(),
            max: n.max(1),
            gate,
            pulled: 0,
        }
    }

    /// Number of futures pulled from the source stream so far.
    pub fn pulled(&self) -> usize {
        self.pulled
    }
}

/// The source stream is expected to be ready whenever polled, e.g. `stream::iter`; a pending
/// source is not woken up by the gate closing.
impl<St> Stream for BufferUnorderedWithGate<St>
where
    St: Stream,
    St::Item: Future,
{
    type Item = <St::Item as Future>::Output;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let BufferUnorderedWithGateProj {
            mut stream,
            in_progress_queue,
            max,
            gate,
            pulled,
        } = self.project();

        // Fill up the queue as long as the gate is open
        while !gate.is_cancelled() && in_progress_queue.len() < *max {
            match stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(fut)) => {
                    *pulled += 1;
                    in_progress_queue.push(fut)
                }
                Poll::Ready(None) | Poll::Pending => break,
            }
        }

        match in_progress_queue.poll_next_unpin(cx) {
            x @ Poll::Pending => return x,
            x @ Poll::Ready(Some(_)) => return x,
            Poll::Ready(None) => {}
        }

        if stream.is_done() || gate.is_cancelled() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}
