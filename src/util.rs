//! Bridges between sources and the async ecosystem.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures_core::Stream;

use crate::consume::{consume_lazy, Consumption};
use crate::core::Source;
use crate::error::{Error, Result};
use crate::sinks::Handlers;

struct Shared<T> {
    buffer: RefCell<VecDeque<T>>,
    failure: RefCell<Option<Error>>,
    ended: Cell<bool>,
    /// A pull was sent and not yet answered
    pulling: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

impl<T> Shared<T> {
    fn wake(&self) {
        let waker = self.waker.borrow_mut().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// A [`Stream`] over the values of a source.
///
/// The source is started on first poll. Whenever the stream has nothing
/// buffered it pulls once, so pull sources advance at the pace of the
/// reader; values pushed faster than they are read are buffered. A failure
/// is yielded as a single `Err` before the stream ends. Dropping the stream
/// stops the source.
pub struct SourceStream<T> {
    consumption: Consumption,
    shared: Rc<Shared<T>>,
}

impl<T: 'static> SourceStream<T> {
    pub fn new(source: &Source<T>) -> Self {
        let shared = Rc::new(Shared {
            buffer: RefCell::new(VecDeque::new()),
            failure: RefCell::new(None),
            ended: Cell::new(false),
            pulling: Cell::new(false),
            waker: RefCell::new(None),
        });

        let (on_start, on_next, on_error, on_end) = (
            Rc::clone(&shared),
            Rc::clone(&shared),
            Rc::clone(&shared),
            Rc::clone(&shared),
        );
        let handlers = Handlers::new()
            .start(move |_| on_start.wake())
            .next(move |value| {
                on_next.pulling.set(false);
                on_next.buffer.borrow_mut().push_back(value);
                on_next.wake();
            })
            .error(move |error| {
                *on_error.failure.borrow_mut() = Some(error);
            })
            .end(move || {
                on_end.ended.set(true);
                on_end.wake();
            });

        Self {
            consumption: consume_lazy(source, handlers),
            shared,
        }
    }

    fn take_ready(&self) -> Option<Option<Result<T>>> {
        if let Some(value) = self.shared.buffer.borrow_mut().pop_front() {
            return Some(Some(Ok(value)));
        }
        if let Some(error) = self.shared.failure.borrow_mut().take() {
            return Some(Some(Err(error)));
        }
        if self.shared.ended.get() {
            return Some(None);
        }
        None
    }

    fn request(&self) {
        if !self.consumption.started() {
            self.consumption.start();
        }
        if self.consumption.started() && !self.shared.pulling.get() {
            self.shared.pulling.set(true);
            if let Err(err) = self.consumption.pull() {
                tracing::debug!(%err, "stream pull ignored");
            }
        }
    }
}

impl<T: 'static> Stream for SourceStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(item) = this.take_ready() {
            return Poll::Ready(item);
        }

        this.shared.waker.replace(Some(cx.waker().clone()));
        this.request();

        // Synchronous sources answer within `request`
        match this.take_ready() {
            Some(item) => Poll::Ready(item),
            None => Poll::Pending,
        }
    }
}

impl<T> Drop for SourceStream<T> {
    fn drop(&mut self) {
        if self.consumption.started() {
            let _ = self.consumption.stop();
        }
    }
}

impl<T> fmt::Debug for SourceStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceStream")
            .field("buffered", &self.shared.buffer.borrow().len())
            .field("ended", &self.shared.ended.get())
            .field("consumption", &self.consumption)
            .finish()
    }
}

/// Consume `source` as a [`Stream`].
pub fn into_stream<T: 'static>(source: &Source<T>) -> SourceStream<T> {
    SourceStream::new(source)
}
