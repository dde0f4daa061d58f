//! Source factory.
//!
//! [`create_source`] turns a setup function into a [`Source`]. Each time the
//! source is subscribed, the setup function runs with a fresh [`Producer`]
//! and returns a [`Teardown`] describing how the source reacts to pull and
//! stop requests from the sink. The factory owns the lifecycle state and
//! enforces the protocol ordering on the producer's behalf.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use crate::core::{
    LifecycleState, Message, Operation, ProtocolViolation, Signal, Sink, Source, Talkback,
};
use crate::diagnostics::Diagnostics;
use crate::error::Error;

pub mod interval;
pub mod iter;

pub use interval::interval;
pub use iter::{from_iter, pullable_from_iter};

/// Configuration shared by every lifecycle of a source.
#[derive(Clone, Debug, Default)]
pub struct SourceConfig {
    /// Name attached to diagnostics and trace events
    pub name: Option<&'static str>,
    /// Where protocol violations are reported
    pub diagnostics: Diagnostics,
}

impl SourceConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source name
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Set the diagnostics hook
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// What a source can do when its sink talks back.
///
/// A push-only source returns [`Teardown::none`] (or `()`), a cancellable
/// one a stop hook, a pullable one a pull hook. Both are optional and
/// independent.
#[derive(Default)]
pub struct Teardown {
    pull: Option<Rc<dyn Fn()>>,
    stop: Option<Box<dyn FnOnce()>>,
}

impl Teardown {
    /// No pull and no stop capability
    pub fn none() -> Self {
        Self::default()
    }

    /// Only a cleanup hook
    pub fn from_stop<F>(stop: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self::none().with_stop(stop)
    }

    /// Only a pull hook
    pub fn from_pull<F>(pull: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::none().with_pull(pull)
    }

    /// Set the cleanup hook, run at most once when the sink stops
    pub fn with_stop<F>(mut self, stop: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        self.stop = Some(Box::new(stop));
        self
    }

    /// Set the hook run on every pull request
    pub fn with_pull<F>(mut self, pull: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.pull = Some(Rc::new(pull));
        self
    }

    pub fn can_pull(&self) -> bool {
        self.pull.is_some()
    }

    pub fn can_stop(&self) -> bool {
        self.stop.is_some()
    }
}

impl From<()> for Teardown {
    fn from(_: ()) -> Self {
        Teardown::none()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("pull", &self.can_pull())
            .field("stop", &self.can_stop())
            .finish()
    }
}

/// Hooks of a lifecycle. Pull requests that arrive while the setup function
/// is still running are counted and replayed once it returns; a stop request
/// disposes right away and runs the cleanup hook as soon as it exists.
enum Hooks {
    Wiring { pending_pulls: usize },
    Wired(Teardown),
}

type SharedHooks = Rc<RefCell<Hooks>>;

/// State of a single subscription.
///
/// The hooks are owned by the talkback once START has handed it out, and
/// the lifecycle only keeps a weak reference. A teardown capturing the
/// producer therefore never keeps its own lifecycle alive.
struct Lifecycle<T> {
    state: Cell<LifecycleState>,
    /// Dropped on reaching a terminal state
    sink: RefCell<Option<Sink<T>>>,
    /// Held here until START moves them into the talkback
    unclaimed: RefCell<Option<SharedHooks>>,
    hooks: Weak<RefCell<Hooks>>,
    config: Rc<SourceConfig>,
}

impl<T: 'static> Lifecycle<T> {
    fn new(sink: Sink<T>, hooks: &SharedHooks, config: Rc<SourceConfig>) -> Self {
        Self {
            state: Cell::new(LifecycleState::Inactive),
            sink: RefCell::new(Some(sink)),
            unclaimed: RefCell::new(Some(Rc::clone(hooks))),
            hooks: Rc::downgrade(hooks),
            config,
        }
    }

    fn advance(&self, operation: Operation) -> Result<LifecycleState, ProtocolViolation> {
        let from = self.state.get();
        match from.transition(operation) {
            Ok(to) => {
                if to != from {
                    tracing::trace!(
                        source = self.config.name.unwrap_or("anonymous"),
                        ?from,
                        ?to,
                        "lifecycle transition"
                    );
                }
                self.state.set(to);
                Ok(to)
            }
            Err(mut violation) => {
                violation.source_name = self.config.name;
                Err(violation)
            }
        }
    }

    fn report(&self, violation: ProtocolViolation) {
        self.config.diagnostics.report(&violation);
    }

    fn downstream(&self) -> Option<Sink<T>> {
        self.sink.borrow().clone()
    }

    /// Drop the sink and the pull hook, returning the sink for a last message
    fn release(&self) -> Option<Sink<T>> {
        let unclaimed = self.unclaimed.borrow_mut().take();
        drop(unclaimed);
        if let Some(hooks) = self.hooks.upgrade() {
            if let Hooks::Wired(teardown) = &mut *hooks.borrow_mut() {
                teardown.pull = None;
            }
        }
        self.sink.borrow_mut().take()
    }

    fn start(self: &Rc<Self>) {
        if let Err(violation) = self.advance(Operation::Start) {
            return self.report(violation);
        }
        let Some(sink) = self.downstream() else {
            return;
        };
        let Some(hooks) = self.unclaimed.borrow_mut().take() else {
            return;
        };
        let lifecycle = Rc::clone(self);
        sink.send(Message::Start(Talkback::new(move |signal| {
            lifecycle.request(&hooks, signal)
        })));
    }

    fn next(&self, value: T) {
        if let Err(violation) = self.advance(Operation::Next) {
            return self.report(violation);
        }
        if let Some(sink) = self.downstream() {
            sink.send(Message::Data(value));
        }
    }

    fn end(&self, operation: Operation, failure: Option<Error>) {
        match self.advance(operation) {
            Ok(_) => {
                if let Some(sink) = self.release() {
                    sink.send(Message::End(failure));
                }
            }
            Err(violation) => {
                // Ending before START still ends the lifecycle, but the sink
                // must not see END without a handshake.
                let inactive = violation.state == LifecycleState::Inactive;
                self.report(violation);
                if inactive {
                    self.state.set(LifecycleState::Ended);
                    self.release();
                }
            }
        }
    }

    fn request(&self, hooks: &RefCell<Hooks>, signal: Signal) {
        if self.state.get() == LifecycleState::Disposed {
            return;
        }
        match signal {
            Signal::Pull => self.pull(hooks),
            Signal::Stop => self.dispose(hooks),
        }
    }

    fn pull(&self, hooks: &RefCell<Hooks>) {
        if let Hooks::Wiring { pending_pulls } = &mut *hooks.borrow_mut() {
            *pending_pulls += 1;
            return;
        }
        if let Err(violation) = self.advance(Operation::Pull) {
            return self.report(violation);
        }
        let hook = match &*hooks.borrow() {
            Hooks::Wired(teardown) => teardown.pull.clone(),
            Hooks::Wiring { .. } => None,
        };
        if let Some(pull) = hook {
            pull();
        }
    }

    fn dispose(&self, hooks: &RefCell<Hooks>) {
        if let Err(violation) = self.advance(Operation::Stop) {
            return self.report(violation);
        }
        let sink = self.sink.borrow_mut().take();
        let stop = match &mut *hooks.borrow_mut() {
            Hooks::Wired(teardown) => {
                teardown.pull = None;
                teardown.stop.take()
            }
            Hooks::Wiring { pending_pulls } => {
                *pending_pulls = 0;
                None
            }
        };
        if let Some(stop) = stop {
            stop();
        }
        drop(sink);
    }

    fn wire(&self, hooks: &RefCell<Hooks>, mut teardown: Teardown) {
        let state = self.state.get();
        if state.is_terminal() {
            teardown.pull = None;
        }
        // Stopped while the setup function was running
        let cleanup = match state {
            LifecycleState::Disposed => teardown.stop.take(),
            _ => None,
        };
        let previous = mem::replace(&mut *hooks.borrow_mut(), Hooks::Wired(teardown));
        if let Some(stop) = cleanup {
            stop();
        }
        if let Hooks::Wiring { pending_pulls } = previous {
            for _ in 0..pending_pulls {
                // Requests that raced a synchronous end have nothing to pull
                if self.state.get().is_terminal() {
                    break;
                }
                self.request(hooks, Signal::Pull);
            }
        }
    }
}

/// Primitives a setup function drives its lifecycle with.
///
/// Cheap to clone; clones may be moved into timers, tasks or inner sinks.
pub struct Producer<T> {
    lifecycle: Rc<Lifecycle<T>>,
}

impl<T: 'static> Producer<T> {
    /// Send the handshake to the sink. Only valid once, before anything else.
    pub fn start(&self) {
        self.lifecycle.start()
    }

    /// Send a value. Dropped with a diagnostic unless the lifecycle is active.
    pub fn next(&self, value: T) {
        self.lifecycle.next(value)
    }

    /// Terminate with a failure
    pub fn error(&self, error: impl Into<Error>) {
        self.lifecycle.end(Operation::Error, Some(error.into()))
    }

    /// Terminate normally
    pub fn complete(&self) {
        self.lifecycle.end(Operation::Complete, None)
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state.get()
    }

    /// Whether values are currently delivered
    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: Rc::clone(&self.lifecycle),
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("state", &self.lifecycle.state.get())
            .finish()
    }
}

/// Build a source from a setup function, with the default configuration.
///
/// # Examples
///
/// ```rust
/// use talkback::prelude::*;
///
/// let countdown = create_source(|producer: Producer<u32>| {
///     producer.start();
///     for n in (1..=3).rev() {
///         producer.next(n);
///     }
///     producer.complete();
/// });
///
/// assert_eq!(drain(&countdown).unwrap(), vec![3, 2, 1]);
/// ```
pub fn create_source<T, F, R>(setup: F) -> Source<T>
where
    T: 'static,
    F: Fn(Producer<T>) -> R + 'static,
    R: Into<Teardown>,
{
    create_source_with(SourceConfig::default(), setup)
}

/// Build a source from a setup function and an explicit configuration.
pub fn create_source_with<T, F, R>(config: SourceConfig, setup: F) -> Source<T>
where
    T: 'static,
    F: Fn(Producer<T>) -> R + 'static,
    R: Into<Teardown>,
{
    let config = Rc::new(config);
    Source::new(move |sink| {
        let hooks = Rc::new(RefCell::new(Hooks::Wiring { pending_pulls: 0 }));
        let lifecycle = Rc::new(Lifecycle::new(sink, &hooks, Rc::clone(&config)));
        let producer = Producer {
            lifecycle: Rc::clone(&lifecycle),
        };
        let teardown = setup(producer).into();
        lifecycle.wire(&hooks, teardown);
    })
}
