//! Sources over in-memory collections.

use std::cell::RefCell;

use super::{create_source, Producer, Teardown};
use crate::core::Source;

/// A synchronous push source emitting every item of `input`, then completing.
///
/// The whole collection is delivered during the handshake, so the source
/// cannot be pulled. Iteration stops early once the sink has stopped it.
///
/// # Examples
///
/// ```rust
/// use talkback::prelude::*;
///
/// let source = from_iter(vec!["a", "b"]);
/// assert_eq!(drain(&source).unwrap(), vec!["a", "b"]);
/// ```
pub fn from_iter<I>(input: I) -> Source<I::Item>
where
    I: IntoIterator + Clone + 'static,
    I::Item: 'static,
{
    create_source(move |producer: Producer<I::Item>| {
        producer.start();
        let mut items = input.clone().into_iter();
        // No item is taken from the iterator once the sink has stopped
        while producer.is_active() {
            match items.next() {
                Some(item) => producer.next(item),
                None => producer.complete(),
            }
        }
    })
}

/// A pull source emitting one item of `input` per pull request.
///
/// The pull following the last item completes the source.
pub fn pullable_from_iter<I>(input: I) -> Source<I::Item>
where
    I: IntoIterator + Clone + 'static,
    I::Item: 'static,
{
    create_source(move |producer: Producer<I::Item>| {
        producer.start();
        let items = RefCell::new(input.clone().into_iter());
        Teardown::from_pull(move || {
            let item = items.borrow_mut().next();
            match item {
                Some(item) => producer.next(item),
                None => producer.complete(),
            }
        })
    })
}
