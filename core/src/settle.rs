//! One-shot settlement of a host call.
//!
//! # Design
//! A host reports the outcome of a transfer through `success`/`fail`
//! callbacks. `channel` pairs a cloneable [`Responder`] (handed to the host
//! and to the timeout governor) with a [`Pending`] future awaited by the
//! executor. The first `success` or `fail` wins; any later attempt is
//! ignored and reported as `false`, so an abort-induced failure racing a
//! natural completion cannot settle a call twice.
//!
//! The responder also owns the call's armed timer: settling cancels it, and
//! a timer attached after settlement is cancelled on the spot.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::HostError;
use crate::timer::TimerHandle;

type Outcome<T> = Result<T, HostError>;

struct Slot<T> {
    sender: Option<oneshot::Sender<Outcome<T>>>,
    timer: Option<TimerHandle>,
}

struct Shared<T> {
    call_id: Uuid,
    slot: Mutex<Slot<T>>,
}

/// Completion side of a call, given to the host transport.
pub struct Responder<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Responder<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("call_id", &self.shared.call_id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Create a linked responder/future pair for one call.
pub fn channel<T>(call_id: Uuid) -> (Responder<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    let shared = Arc::new(Shared {
        call_id,
        slot: Mutex::new(Slot {
            sender: Some(tx),
            timer: None,
        }),
    });
    (Responder { shared }, Pending { rx })
}

impl<T> Responder<T> {
    pub fn call_id(&self) -> Uuid {
        self.shared.call_id
    }

    /// Deliver a successful result. Returns `false` if the call had already
    /// settled.
    pub fn success(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Deliver a failure. Returns `false` if the call had already settled.
    pub fn fail(&self, err: HostError) -> bool {
        self.settle(Err(err))
    }

    pub fn is_settled(&self) -> bool {
        self.shared.slot.lock().sender.is_none()
    }

    /// Bind the call's deadline to this responder.
    pub(crate) fn attach_timer(&self, handle: TimerHandle) {
        let mut slot = self.shared.slot.lock();
        if slot.sender.is_some() {
            slot.timer = Some(handle);
            return;
        }
        drop(slot);
        handle.cancel();
    }

    fn settle(&self, outcome: Outcome<T>) -> bool {
        let (sender, timer) = {
            let mut slot = self.shared.slot.lock();
            (slot.sender.take(), slot.timer.take())
        };
        let Some(sender) = sender else {
            tracing::trace!(call_id = %self.shared.call_id, "ignoring late settlement");
            return false;
        };
        if let Some(timer) = timer {
            timer.cancel();
        }
        // The receiver may be gone if the caller dropped the future.
        let _ = sender.send(outcome);
        true
    }
}

/// Future side of a call; resolves once the responder settles.
///
/// If every responder clone is dropped without settling, resolves to
/// [`HostError::abandoned`].
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> Future for Pending<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(HostError::abandoned())),
            Poll::Pending => Poll::Pending,
        }
    }
}
