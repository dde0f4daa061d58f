//! Operators over sources.
//!
//! Operators are ordinary sources built with the source factory; they
//! consume an upstream source and re-emit through their own lifecycle. The
//! [`SourceExt`] trait exposes them as chainable methods.

pub mod combinators;

pub use combinators::{map, switch_error, take};

use crate::core::Source;
use crate::error::Error;
use crate::util::SourceStream;

/// Extension trait for sources that provides combinator methods
pub trait SourceExt<T: 'static>: Sized {
    /// Apply an operator, `source.pipe(op)` being `op(source)`
    fn pipe<U, F>(self, operator: F) -> Source<U>
    where
        F: FnOnce(Self) -> Source<U>;

    /// Map values through a function
    fn map<U, F>(self, f: F) -> Source<U>
    where
        U: 'static,
        F: Fn(T) -> U + 'static;

    /// Take only the first `count` values
    fn take(self, count: usize) -> Source<T>;

    /// Continue with another source when this one fails
    fn switch_error<F>(self, recover: F) -> Source<T>
    where
        F: Fn(Error) -> Source<T> + 'static;

    /// Consume as an asynchronous stream
    fn into_stream(self) -> SourceStream<T>;
}

impl<T: 'static> SourceExt<T> for Source<T> {
    fn pipe<U, F>(self, operator: F) -> Source<U>
    where
        F: FnOnce(Self) -> Source<U>,
    {
        operator(self)
    }

    fn map<U, F>(self, f: F) -> Source<U>
    where
        U: 'static,
        F: Fn(T) -> U + 'static,
    {
        combinators::map(self, f)
    }

    fn take(self, count: usize) -> Source<T> {
        combinators::take(self, count)
    }

    fn switch_error<F>(self, recover: F) -> Source<T>
    where
        F: Fn(Error) -> Source<T> + 'static,
    {
        combinators::switch_error(self, recover)
    }

    fn into_stream(self) -> SourceStream<T> {
        SourceStream::new(&self)
    }
}
