//! Sink factory.
//!
//! A sink is built from a handful of optional callbacks. The factory
//! dispatches every incoming [`Message`] to the matching callback and hands
//! the `start` callback a [`Management`] pair derived from the talkback.

use std::fmt;
use std::rc::Rc;

use crate::core::{Message, Signal, Sink, Talkback};
use crate::error::Error;

/// Pull/stop pair a sink receives when its source starts.
#[derive(Clone, Debug)]
pub struct Management {
    talkback: Talkback,
}

impl Management {
    /// Wrap the talkback received with START
    pub fn new(talkback: Talkback) -> Self {
        Self { talkback }
    }

    /// Ask the source for the next value
    pub fn pull(&self) {
        self.talkback.send(Signal::Pull)
    }

    /// Cancel the source
    pub fn stop(&self) {
        self.talkback.send(Signal::Stop)
    }
}

/// Callbacks a sink dispatches to. Every callback is optional.
pub struct Handlers<T> {
    pub(crate) next: Option<Rc<dyn Fn(T)>>,
    pub(crate) complete: Option<Rc<dyn Fn()>>,
    pub(crate) error: Option<Rc<dyn Fn(Error)>>,
    pub(crate) start: Option<Rc<dyn Fn(Management)>>,
    pub(crate) end: Option<Rc<dyn Fn()>>,
}

impl<T> Handlers<T> {
    /// Create an empty set of handlers
    pub fn new() -> Self {
        Self {
            next: None,
            complete: None,
            error: None,
            start: None,
            end: None,
        }
    }

    /// Called with every value
    pub fn next<F>(mut self, f: F) -> Self
    where
        F: Fn(T) + 'static,
    {
        self.next = Some(Rc::new(f));
        self
    }

    /// Called on normal completion, and on failure when no `error` handler is set
    pub fn complete<F>(mut self, f: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.complete = Some(Rc::new(f));
        self
    }

    /// Called when the source fails
    pub fn error<F>(mut self, f: F) -> Self
    where
        F: Fn(Error) + 'static,
    {
        self.error = Some(Rc::new(f));
        self
    }

    /// Called on the handshake with the pull/stop pair
    pub fn start<F>(mut self, f: F) -> Self
    where
        F: Fn(Management) + 'static,
    {
        self.start = Some(Rc::new(f));
        self
    }

    /// Called after `complete` or `error`, whichever fired
    pub fn end<F>(mut self, f: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.end = Some(Rc::new(f));
        self
    }
}

impl<T> Default for Handlers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Handlers<T> {
    fn clone(&self) -> Self {
        Self {
            next: self.next.clone(),
            complete: self.complete.clone(),
            error: self.error.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

impl<T> fmt::Debug for Handlers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("next", &self.next.is_some())
            .field("complete", &self.complete.is_some())
            .field("error", &self.error.is_some())
            .field("start", &self.start.is_some())
            .field("end", &self.end.is_some())
            .finish()
    }
}

/// Build a sink dispatching to `handlers`.
///
/// A failure is delivered to `error` when one is registered and falls back
/// to `complete` otherwise. `end` runs after either.
pub fn create_sink<T: 'static>(handlers: Handlers<T>) -> Sink<T> {
    Sink::new(move |message| match message {
        Message::Start(talkback) => {
            if let Some(start) = &handlers.start {
                start(Management::new(talkback));
            }
        }
        Message::Data(value) => {
            if let Some(next) = &handlers.next {
                next(value);
            }
        }
        Message::End(failure) => {
            match (failure, &handlers.error) {
                (Some(error), Some(on_error)) => on_error(error),
                _ => {
                    if let Some(complete) = &handlers.complete {
                        complete();
                    }
                }
            }
            if let Some(end) = &handlers.end {
                end();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recording_sink(log: &Rc<RefCell<Vec<String>>>) -> Sink<i32> {
        let (next, complete, error, end) = (
            Rc::clone(log),
            Rc::clone(log),
            Rc::clone(log),
            Rc::clone(log),
        );
        create_sink(
            Handlers::new()
                .next(move |v| next.borrow_mut().push(format!("next {}", v)))
                .complete(move || complete.borrow_mut().push("complete".into()))
                .error(move |e| error.borrow_mut().push(format!("error {}", e)))
                .end(move || end.borrow_mut().push("end".into())),
        )
    }

    #[test]
    fn test_dispatch_values_and_completion() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = recording_sink(&log);

        sink.send(Message::Start(Talkback::new(|_| {})));
        sink.send(Message::Data(1));
        sink.send(Message::Data(2));
        sink.send(Message::End(None));

        assert_eq!(*log.borrow(), vec!["next 1", "next 2", "complete", "end"]);
    }

    #[test]
    fn test_error_then_end() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = recording_sink(&log);

        sink.send(Message::End(Some(Error::custom("boom"))));

        assert_eq!(*log.borrow(), vec!["error boom", "end"]);
    }

    #[test]
    fn test_error_without_handler_falls_back_to_complete() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&log);
        let sink: Sink<i32> = create_sink(
            Handlers::new().complete(move || recorded.borrow_mut().push("complete")),
        );

        sink.send(Message::End(Some(Error::custom("swallowed"))));

        assert_eq!(*log.borrow(), vec!["complete"]);
    }

    #[test]
    fn test_management_talks_back() {
        let signals = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&signals);
        let talkback = Talkback::new(move |signal| recorded.borrow_mut().push(signal));

        let sink: Sink<i32> = create_sink(Handlers::new().start(|management| {
            management.pull();
            management.stop();
        }));
        sink.send(Message::Start(talkback));

        assert_eq!(*signals.borrow(), vec![Signal::Pull, Signal::Stop]);
    }

    #[test]
    fn test_missing_handlers_are_ignored() {
        let sink: Sink<i32> = create_sink(Handlers::default());
        sink.send(Message::Start(Talkback::new(|_| panic!("no start handler"))));
        sink.send(Message::Data(1));
        sink.send(Message::End(None));
    }
}
