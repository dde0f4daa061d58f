//! Consumption of sources.
//!
//! [`consume`] wraps the raw handshake in a [`Consumption`] handle that can be
//! pulled, stopped and restarted imperatively. [`drain`] collects a
//! synchronous source into a `Vec` within a single call.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::Source;
use crate::error::{Error, Result};
use crate::sinks::{create_sink, Handlers, Management};
use crate::sources::Teardown;

struct ConsumptionState {
    /// Live pull/stop pair, `None` before START and after END
    management: RefCell<Option<Management>>,
    /// A handshake was sent and the source has not ended since
    launched: Cell<bool>,
    launch: Box<dyn Fn()>,
}

/// Handle on the consumption of a source.
///
/// Clones share the same consumption.
#[derive(Clone)]
pub struct Consumption {
    state: Rc<ConsumptionState>,
}

impl Consumption {
    fn new<T: 'static>(source: &Source<T>, handlers: Handlers<T>) -> Self {
        let source = source.clone();
        let state = Rc::new_cyclic(|weak: &Weak<ConsumptionState>| {
            let on_start = handlers.start.clone();
            let on_end = handlers.end.clone();
            let started = weak.clone();
            let ended = weak.clone();

            let sink = create_sink(Handlers {
                start: Some(Rc::new(move |management: Management| {
                    if let Some(state) = started.upgrade() {
                        *state.management.borrow_mut() = Some(management.clone());
                    }
                    if let Some(start) = &on_start {
                        start(management);
                    }
                })),
                end: Some(Rc::new(move || {
                    if let Some(state) = ended.upgrade() {
                        let previous = state.management.borrow_mut().take();
                        state.launched.set(false);
                        drop(previous);
                    }
                    if let Some(end) = &on_end {
                        end();
                    }
                })),
                ..handlers
            });

            ConsumptionState {
                management: RefCell::new(None),
                launched: Cell::new(false),
                launch: Box::new(move || source.subscribe(sink.clone())),
            }
        });
        Self { state }
    }

    /// A handle that does not keep the consumption alive.
    ///
    /// Operators use it to reach their upstream from inside the handlers of
    /// that same consumption.
    pub fn downgrade(&self) -> WeakConsumption {
        WeakConsumption {
            state: Rc::downgrade(&self.state),
        }
    }

    fn management(&self) -> Option<Management> {
        self.state.management.borrow().clone()
    }

    /// Send the handshake unless the consumption is already running.
    ///
    /// Returns whether a handshake was sent.
    pub fn start(&self) -> bool {
        if self.started() || self.state.launched.get() {
            return false;
        }
        self.state.launched.set(true);
        (self.state.launch)();
        true
    }

    /// Whether the source has started and not yet ended
    pub fn started(&self) -> bool {
        self.state.management.borrow().is_some()
    }

    /// Ask the source for its next value.
    pub fn pull(&self) -> Result<()> {
        let management = self.management().ok_or(Error::PullNotStarted)?;
        management.pull();
        Ok(())
    }

    /// Cancel the source.
    ///
    /// A stopped source never sends END, so the handle returns to its
    /// unstarted state here and may be started again.
    pub fn stop(&self) -> Result<()> {
        let management = self
            .state
            .management
            .borrow_mut()
            .take()
            .ok_or(Error::StopNotStarted)?;
        self.state.launched.set(false);
        management.stop();
        Ok(())
    }
}

impl fmt::Debug for Consumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumption")
            .field("started", &self.started())
            .field("launched", &self.state.launched.get())
            .finish()
    }
}

/// Non-owning counterpart of [`Consumption`].
#[derive(Clone)]
pub struct WeakConsumption {
    state: Weak<ConsumptionState>,
}

impl WeakConsumption {
    /// The consumption, unless every strong handle is gone
    pub fn upgrade(&self) -> Option<Consumption> {
        self.state.upgrade().map(|state| Consumption { state })
    }
}

impl fmt::Debug for WeakConsumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakConsumption")
            .field("alive", &(self.state.strong_count() > 0))
            .finish()
    }
}

/// A consumption returned from a setup function forwards pull and stop
/// requests to the inner source while it is running.
impl From<Consumption> for Teardown {
    fn from(consumption: Consumption) -> Self {
        let puller = consumption.clone();
        Teardown::from_pull(move || {
            if let Err(err) = puller.pull() {
                tracing::debug!(%err, "pull request ignored");
            }
        })
        .with_stop(move || {
            if consumption.started() {
                let _ = consumption.stop();
            }
        })
    }
}

/// Consume `source`, starting immediately.
///
/// # Examples
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use talkback::prelude::*;
///
/// let total = Rc::new(Cell::new(0));
/// let sum = Rc::clone(&total);
/// let consumption = consume(
///     &from_iter(1..=4),
///     Handlers::new().next(move |v| sum.set(sum.get() + v)),
/// );
///
/// assert_eq!(total.get(), 10);
/// assert!(!consumption.started());
/// assert!(consumption.stop().is_err());
/// ```
pub fn consume<T: 'static>(source: &Source<T>, handlers: Handlers<T>) -> Consumption {
    let consumption = Consumption::new(source, handlers);
    consumption.start();
    consumption
}

/// Consume `source`, waiting for an explicit [`Consumption::start`].
pub fn consume_lazy<T: 'static>(source: &Source<T>, handlers: Handlers<T>) -> Consumption {
    Consumption::new(source, handlers)
}

/// Collect every value of a synchronous source.
///
/// Fails with [`Error::NeverStarted`] when the source never sent START,
/// with the producer's error when it failed, and with
/// [`Error::NotSynchronous`] when it had not ended by the time the
/// handshake returned. The source is always stopped before returning.
pub fn drain<T: 'static>(source: &Source<T>) -> Result<Vec<T>> {
    let values = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(Cell::new(false));
    let failure = Rc::new(RefCell::new(None));
    let management = Rc::new(RefCell::new(None));

    let sink = {
        let values = Rc::clone(&values);
        let completed = Rc::clone(&completed);
        let failure = Rc::clone(&failure);
        let management = Rc::clone(&management);
        create_sink(
            Handlers::new()
                .next(move |value| values.borrow_mut().push(value))
                .complete(move || completed.set(true))
                .error(move |error| *failure.borrow_mut() = Some(error))
                .start(move |m| *management.borrow_mut() = Some(m)),
        )
    };
    source.subscribe(sink);

    let management: Management = management.borrow_mut().take().ok_or(Error::NeverStarted)?;
    management.stop();

    if let Some(error) = failure.borrow_mut().take() {
        return Err(error);
    }
    if !completed.get() {
        return Err(Error::NotSynchronous);
    }
    Ok(values.take())
}
