//! Integration tests for the talkback source protocol

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use talkback::prelude::*;
use tokio::task::LocalSet;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, PartialEq)]
enum Event<T> {
    Start,
    Next(T),
    Complete,
    Error(String),
    End,
}

/// Records every callback a sink receives, in order.
struct Recorder<T> {
    events: Rc<RefCell<Vec<Event<T>>>>,
}

impl<T: Clone + 'static> Recorder<T> {
    fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn handlers(&self) -> Handlers<T> {
        let (start, next, complete, error, end) = (
            Rc::clone(&self.events),
            Rc::clone(&self.events),
            Rc::clone(&self.events),
            Rc::clone(&self.events),
            Rc::clone(&self.events),
        );
        Handlers::new()
            .start(move |_| start.borrow_mut().push(Event::Start))
            .next(move |v| next.borrow_mut().push(Event::Next(v)))
            .complete(move || complete.borrow_mut().push(Event::Complete))
            .error(move |e| error.borrow_mut().push(Event::Error(e.to_string())))
            .end(move || end.borrow_mut().push(Event::End))
    }

    fn events(&self) -> Vec<Event<T>> {
        self.events.borrow().clone()
    }

    fn values(&self) -> Vec<T> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, wanted: fn(&Event<T>) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| wanted(e)).count()
    }
}

#[test]
fn test_collection_source_push() {
    let recorder = Recorder::new();
    let consumption = consume(&from_iter(1..=10), recorder.handlers());

    assert_eq!(recorder.values(), (1..=10).collect::<Vec<_>>());
    assert_eq!(recorder.count(|e| matches!(e, Event::Complete)), 1);
    assert_eq!(recorder.count(|e| matches!(e, Event::Error(_))), 0);
    assert_eq!(recorder.count(|e| matches!(e, Event::End)), 1);
    assert!(!consumption.started());
}

#[test]
fn test_drain_sequence() {
    let source = create_source(|producer: Producer<i32>| {
        producer.start();
        for i in 0..10 {
            producer.next(i);
        }
        producer.complete();
    });

    assert_eq!(drain(&source).unwrap(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_drain_with_transform() {
    let source = from_iter(0..10).map(|x| x * 100);
    assert_eq!(
        drain(&source).unwrap(),
        vec![0, 100, 200, 300, 400, 500, 600, 700, 800, 900]
    );
}

#[test]
fn test_drain_rejects_asynchronous_source() {
    let source = create_source(|producer: Producer<i32>| {
        producer.start();
        producer.next(1);
    });
    assert!(matches!(drain(&source), Err(Error::NotSynchronous)));
}

/// Counts live subscriptions of `source`.
fn tracked<T: 'static>(source: Source<T>, gauge: Rc<Cell<i32>>) -> Source<T> {
    create_source(move |producer: Producer<T>| {
        gauge.set(gauge.get() + 1);
        let (started, emit, completed, failed) = (
            producer.clone(),
            producer.clone(),
            producer.clone(),
            producer.clone(),
        );
        let inner = consume(
            &source,
            Handlers::new()
                .start(move |_| started.start())
                .next(move |v| emit.next(v))
                .complete(move || completed.complete())
                .error(move |e| failed.error(e)),
        );
        let gauge = Rc::clone(&gauge);
        Teardown::from_stop(move || {
            gauge.set(gauge.get() - 1);
            if inner.started() {
                let _ = inner.stop();
            }
        })
    })
}

#[tokio::test(start_paused = true)]
async fn test_timed_source_with_limit() {
    const PERIOD: Duration = Duration::from_millis(1000);

    LocalSet::new()
        .run_until(async {
            let gauge = Rc::new(Cell::new(0));
            let recorder = Recorder::new();
            let origin = Instant::now();
            let source = tracked(interval(PERIOD), Rc::clone(&gauge))
                .map(|x| x * 2)
                .take(10);
            let consumption = consume(&source, recorder.handlers());
            assert_eq!(gauge.get(), 1);

            for n in 1..=10u64 {
                sleep_until(origin + PERIOD * n as u32 + PERIOD / 2).await;
                let values = recorder.values();
                assert_eq!(values.len() as u64, n);
                assert_eq!(values[n as usize - 1], 2 * n);
            }

            sleep_until(origin + PERIOD * 20).await;
            assert_eq!(recorder.values().len(), 10);
            assert_eq!(recorder.count(|e| matches!(e, Event::Complete)), 1);
            assert_eq!(recorder.count(|e| matches!(e, Event::End)), 1);
            assert_eq!(gauge.get(), 0);
            assert!(matches!(consumption.stop(), Err(Error::StopNotStarted)));
        })
        .await;
}

type Item = std::result::Result<i32, String>;

#[test]
fn test_switch_error_pull_mode() {
    let pulls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&pulls);
    let failing = create_source(move |producer: Producer<Item>| {
        producer.start();
        let producer = producer.clone();
        let counter = Rc::clone(&counter);
        Teardown::from_pull(move || {
            counter.set(counter.get() + 1);
            match counter.get() {
                n @ 1..=3 => producer.next(Ok(n)),
                _ => producer.error(Error::custom("exhausted")),
            }
        })
    });
    let source = failing.switch_error(|_| {
        pullable_from_iter(vec![Err("error".to_string()), Ok(5), Ok(6)])
    });

    let recorder = Recorder::new();
    let consumption = consume(&source, recorder.handlers());
    for _ in 0..7 {
        consumption.pull().unwrap();
    }

    assert_eq!(
        recorder.values(),
        vec![Ok(1), Ok(2), Ok(3), Err("error".to_string()), Ok(5), Ok(6)]
    );
    assert_eq!(recorder.count(|e| matches!(e, Event::Complete)), 1);
    assert_eq!(recorder.count(|e| matches!(e, Event::Error(_))), 0);
    assert_eq!(pulls.get(), 4);
    assert!(!consumption.started());
    assert!(matches!(consumption.pull(), Err(Error::PullNotStarted)));
}

#[test]
fn test_switch_error_push_mode() {
    let failing = create_source(|producer: Producer<Item>| {
        producer.start();
        for n in 1..=3 {
            producer.next(Ok(n));
        }
        producer.error(Error::custom("exhausted"));
    });
    let source = failing.switch_error(|_| from_iter(vec![Err("error".to_string()), Ok(5), Ok(6)]));

    let recorder = Recorder::new();
    let consumption = consume(&source, recorder.handlers());

    assert_eq!(
        recorder.values(),
        vec![Ok(1), Ok(2), Ok(3), Err("error".to_string()), Ok(5), Ok(6)]
    );
    assert_eq!(recorder.count(|e| matches!(e, Event::Complete)), 1);
    assert_eq!(recorder.count(|e| matches!(e, Event::Error(_))), 0);
    assert!(!consumption.started());
}

#[test]
fn test_misuse_reports_descriptive_errors() {
    let consumption = consume(&from_iter(vec![1, 2]), Handlers::new());
    let err = consumption.stop().unwrap_err();
    assert_eq!(err.to_string(), "Cannot stop a source that is not started.");

    let never = consume_lazy(&from_iter(vec![1, 2]), Handlers::new());
    let err = never.pull().unwrap_err();
    assert_eq!(err.to_string(), "Cannot pull from source that is not started.");
}

#[test]
fn test_handshake_precedes_data_and_end() {
    let sources: Vec<Source<i32>> = vec![
        from_iter(vec![1, 2, 3]),
        from_iter(Vec::new()),
        create_source(|producer: Producer<i32>| {
            producer.start();
            producer.error(Error::custom("failed"));
        }),
        from_iter(1..50).take(2),
    ];

    for source in &sources {
        let recorder = Recorder::new();
        consume(source, recorder.handlers());
        let events = recorder.events();

        assert_eq!(events.first(), Some(&Event::Start));
        assert_eq!(events.last(), Some(&Event::End));
        assert_eq!(recorder.count(|e| matches!(e, Event::Start)), 1);
        assert_eq!(recorder.count(|e| matches!(e, Event::End)), 1);
        assert_eq!(
            recorder.count(|e| matches!(e, Event::Complete | Event::Error(_))),
            1
        );
    }
}

#[test]
fn test_end_fires_once_despite_misuse() {
    let violations = Rc::new(Cell::new(0));
    let counter = Rc::clone(&violations);
    let config = SourceConfig::new()
        .name("misbehaving")
        .diagnostics(Diagnostics::new(move |_| counter.set(counter.get() + 1)));
    let source = create_source_with(config, |producer: Producer<i32>| {
        producer.start();
        producer.start();
        producer.next(1);
        producer.complete();
        producer.next(2);
        producer.error(Error::custom("late"));
        producer.complete();
    });

    let recorder = Recorder::new();
    consume(&source, recorder.handlers());

    assert_eq!(
        recorder.events(),
        vec![Event::Start, Event::Next(1), Event::Complete, Event::End]
    );
    assert_eq!(violations.get(), 4);
}

#[test]
fn test_stop_mid_stream() {
    let recorder = Recorder::new();
    let slot: Rc<RefCell<Option<Consumption>>> = Rc::new(RefCell::new(None));
    let handle = Rc::clone(&slot);
    let events = Rc::clone(&recorder.events);
    let handlers = recorder.handlers().next(move |v: i32| {
        events.borrow_mut().push(Event::Next(v));
        if v == 2 {
            let consumption = handle.borrow().clone();
            if let Some(consumption) = consumption {
                consumption.stop().unwrap();
            }
        }
    });

    let consumption = consume_lazy(&pullable_from_iter(1..10), handlers);
    *slot.borrow_mut() = Some(consumption.clone());
    consumption.start();
    consumption.pull().unwrap();
    consumption.pull().unwrap();

    assert_eq!(recorder.values(), vec![1, 2]);
    assert!(!consumption.started());
    assert_eq!(recorder.count(|e| matches!(e, Event::End)), 0);
}

#[tokio::test]
async fn test_stream_bridge() {
    use futures::StreamExt;

    let values: Vec<i32> = from_iter(1..=5)
        .map(|x| x * x)
        .into_stream()
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(values, vec![1, 4, 9, 16, 25]);
}
