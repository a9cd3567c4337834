// SPDX-License-Identifier: GPL-3.0-only

//! Completion handles for queued session commands

use crate::errors::{SessionError, SessionResult};
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Outcome of a command running on the hardware executor
///
/// Await it (or block on it with `pollster::block_on`) to get the result.
/// Dropping the handle does not cancel the command.
#[derive(Debug)]
#[must_use = "dropping a CommandHandle discards the command's result"]
pub struct CommandHandle<T> {
    receiver: oneshot::Receiver<SessionResult<T>>,
}

/// Sending half of a [`CommandHandle`], moved into the queued job
#[derive(Debug)]
pub struct CommandCompleter<T> {
    sender: oneshot::Sender<SessionResult<T>>,
}

impl<T> CommandHandle<T> {
    pub fn channel() -> (CommandHandle<T>, CommandCompleter<T>) {
        let (sender, receiver) = oneshot::channel();
        (CommandHandle { receiver }, CommandCompleter { sender })
    }

    /// A handle that is already resolved
    pub fn ready(result: SessionResult<T>) -> Self {
        let (handle, completer) = Self::channel();
        completer.complete(result);
        handle
    }

    /// Block the current thread until the command finishes
    pub fn wait(self) -> SessionResult<T> {
        pollster::block_on(self)
    }
}

impl<T> CommandCompleter<T> {
    pub fn complete(self, result: SessionResult<T>) {
        // Receiver gone means nobody is interested
        let _ = self.sender.send(result);
    }
}

impl<T> Future for CommandHandle<T> {
    type Output = SessionResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(SessionError::Fatal(
                "command dropped before completion".into(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}
