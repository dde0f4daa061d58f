//! Operators built from the source factory and the consumption wrapper.
//!
//! Each operator is a source whose setup function consumes the upstream
//! source and re-emits through its own producer, so pull and stop requests
//! flow back upstream through the returned [`Consumption`].

use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;

use crate::consume::{consume_lazy, Consumption, WeakConsumption};
use crate::core::Source;
use crate::error::Error;
use crate::sinks::{Handlers, Management};
use crate::sources::{create_source, Producer, Teardown};

/// Upstream consumption as seen from its own handlers.
///
/// Only a weak handle is kept; the operator's teardown owns the consumption.
#[derive(Clone, Default)]
struct Upstream(Rc<OnceCell<WeakConsumption>>);

impl Upstream {
    fn set(&self, consumption: &Consumption) {
        let _ = self.0.set(consumption.downgrade());
    }

    fn stop(&self) {
        let consumption = self.0.get().and_then(WeakConsumption::upgrade);
        if let Some(consumption) = consumption.filter(Consumption::started) {
            let _ = consumption.stop();
        }
    }
}

/// Handlers forwarding `complete` and `error` to `producer`.
fn forward_end<T: 'static, U: 'static>(producer: &Producer<U>) -> Handlers<T> {
    let (completed, failed) = (producer.clone(), producer.clone());
    Handlers::new()
        .complete(move || completed.complete())
        .error(move |error| failed.error(error))
}

/// Handlers forwarding `start`, `complete` and `error` to `producer`.
fn passthrough<T: 'static, U: 'static>(producer: &Producer<U>) -> Handlers<T> {
    let started = producer.clone();
    forward_end(producer).start(move |_| started.start())
}

/// Transform every value with `f`.
pub fn map<T, U, F>(source: Source<T>, f: F) -> Source<U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> U + 'static,
{
    let f = Rc::new(f);
    create_source(move |producer: Producer<U>| {
        let f = Rc::clone(&f);
        let emit = producer.clone();
        let upstream = Upstream::default();
        let stopper = upstream.clone();
        let consumption = consume_lazy(
            &source,
            passthrough(&producer).next(move |value| {
                // Stopped before the setup function returned its teardown
                if !emit.is_active() {
                    return stopper.stop();
                }
                emit.next(f(value))
            }),
        );
        upstream.set(&consumption);
        consumption.start();
        consumption
    })
}

/// Forward the first `count` values, then stop upstream and complete.
pub fn take<T: 'static>(source: Source<T>, count: usize) -> Source<T> {
    create_source(move |producer: Producer<T>| -> Teardown {
        if count == 0 {
            producer.start();
            producer.complete();
            return Teardown::none();
        }

        let remaining = Cell::new(count);
        let upstream = Upstream::default();
        let handlers = passthrough(&producer).next({
            let producer = producer.clone();
            let upstream = upstream.clone();
            move |value| {
                let left = remaining.get();
                if left == 0 || !producer.is_active() {
                    return upstream.stop();
                }
                remaining.set(left - 1);
                producer.next(value);
                if left == 1 {
                    upstream.stop();
                    producer.complete();
                }
            }
        });

        let consumption = consume_lazy(&source, handlers);
        upstream.set(&consumption);
        consumption.start();
        consumption.into()
    })
}

/// Replace a failing source with the one `recover` builds from its error.
///
/// The failing source is stopped first. When the failure answered a pull
/// request, the replacement is pulled as soon as it starts. Failures of the
/// replacement are forwarded downstream.
pub fn switch_error<T, F>(source: Source<T>, recover: F) -> Source<T>
where
    T: 'static,
    F: Fn(Error) -> Source<T> + 'static,
{
    let recover = Rc::new(recover);
    create_source(move |producer: Producer<T>| {
        let pulling = Rc::new(Cell::new(false));
        // Owned by the teardown, handlers only see it weakly
        let current: Rc<RefCell<Option<Consumption>>> = Rc::new(RefCell::new(None));

        let stop_current = {
            let current = Rc::downgrade(&current);
            move || {
                let active = current.upgrade().and_then(|current| {
                    let active = current.borrow().clone();
                    active
                });
                if let Some(active) = active.filter(Consumption::started) {
                    let _ = active.stop();
                }
            }
        };
        let stop_current = Rc::new(stop_current);

        let next = {
            let producer = producer.clone();
            let pulling = Rc::clone(&pulling);
            let stop_current = Rc::clone(&stop_current);
            move |value: T| {
                if !producer.is_active() {
                    return stop_current();
                }
                pulling.set(false);
                producer.next(value);
            }
        };
        let next = Rc::new(next);

        let on_error = {
            let producer = producer.clone();
            let pulling = Rc::clone(&pulling);
            let current = Rc::downgrade(&current);
            let recover = Rc::clone(&recover);
            let next = Rc::clone(&next);
            move |error: Error| {
                stop_current();
                tracing::debug!(%error, "switching to replacement source");

                let forward = Rc::clone(&next);
                let mut handlers = forward_end(&producer).next(move |value| forward(value));
                if pulling.get() {
                    handlers = handlers.start(|management: Management| management.pull());
                }
                let replacement = consume_lazy(&recover(error), handlers);
                if let Some(current) = current.upgrade() {
                    let previous = current.replace(Some(replacement.clone()));
                    drop(previous);
                }
                replacement.start();
            }
        };

        let forward = Rc::clone(&next);
        let consumption = consume_lazy(
            &source,
            passthrough(&producer)
                .next(move |value| forward(value))
                .error(on_error),
        );
        *current.borrow_mut() = Some(consumption.clone());
        consumption.start();

        let puller = Rc::clone(&current);
        Teardown::from_pull(move || {
            pulling.set(true);
            let active = puller.borrow().clone();
            if let Some(active) = active {
                if let Err(err) = active.pull() {
                    tracing::debug!(%err, "pull request ignored");
                }
            }
        })
        .with_stop(move || {
            let active = current.borrow().clone();
            if let Some(active) = active.filter(Consumption::started) {
                let _ = active.stop();
            }
        })
    })
}
