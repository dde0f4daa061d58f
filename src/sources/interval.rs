//! Timer-driven source.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{create_source_with, Producer, SourceConfig, Teardown};
use crate::core::Source;

/// A push source emitting `1, 2, 3, …` every `period`, never completing.
///
/// The timer runs as a task on the current [`tokio::task::LocalSet`], so
/// the source must be subscribed from inside one. Stopping the source
/// aborts the task.
pub fn interval(period: Duration) -> Source<u64> {
    create_source_with(
        SourceConfig::new().name("interval"),
        move |producer: Producer<u64>| {
            producer.start();
            let task = tokio::task::spawn_local(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                let mut value = 1;
                loop {
                    ticker.tick().await;
                    if !producer.is_active() {
                        break;
                    }
                    producer.next(value);
                    value += 1;
                }
            });
            Teardown::from_stop(move || task.abort())
        },
    )
}
