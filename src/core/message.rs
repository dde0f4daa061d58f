//! The three-message protocol shared by every actor.
//!
//! Every actor is a single callable that receives one message at a time. A
//! sink receives [`Message`]s travelling downstream, a talkback receives
//! [`Signal`]s travelling upstream, and a [`Source`] receives the START
//! handshake carrying the sink it should deliver to.

use std::fmt;
use std::rc::Rc;

use crate::error::Error;

/// Message kind, as numbered by the calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Kind {
    /// Handshake
    Start = 0,
    /// A value downstream, a pull request upstream
    Data = 1,
    /// Termination downstream, cancellation upstream
    End = 2,
}

/// A message travelling from a source to its sink.
#[derive(Debug)]
pub enum Message<T> {
    /// Handshake, carrying the talkback the sink uses to pull and stop
    Start(Talkback),
    /// A single value
    Data(T),
    /// Termination. `Some` carries the failure, `None` is normal completion.
    End(Option<Error>),
}

impl<T> Message<T> {
    /// The kind of this message
    pub fn kind(&self) -> Kind {
        match self {
            Message::Start(_) => Kind::Start,
            Message::Data(_) => Kind::Data,
            Message::End(_) => Kind::End,
        }
    }
}

/// A message travelling from a sink back to its source through the talkback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Ask the source for the next value
    Pull,
    /// Cancel the lifecycle
    Stop,
}

impl Signal {
    /// The kind of this signal
    pub fn kind(&self) -> Kind {
        match self {
            Signal::Pull => Kind::Data,
            Signal::Stop => Kind::End,
        }
    }
}

/// A single-threaded callable receiving messages of type `M`.
pub struct Actor<M> {
    handler: Rc<dyn Fn(M)>,
}

impl<M> Actor<M> {
    /// Create an actor from a closure
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(M) + 'static,
    {
        Self {
            handler: Rc::new(handler),
        }
    }

    /// Deliver a message to this actor
    pub fn send(&self, message: M) {
        (self.handler)(message)
    }
}

impl<M> Clone for Actor<M> {
    fn clone(&self) -> Self {
        Self {
            handler: Rc::clone(&self.handler),
        }
    }
}

impl<M> fmt::Debug for Actor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor(..)")
    }
}

/// Consumer-side actor
pub type Sink<T> = Actor<Message<T>>;

/// Actor handed to a sink on START, used to pull and stop
pub type Talkback = Actor<Signal>;

/// Producer-side actor.
///
/// A source only reacts to the START handshake, so it is invoked through
/// [`Source::subscribe`]. Every subscription begins an independent lifecycle.
pub struct Source<T> {
    on_start: Rc<dyn Fn(Sink<T>)>,
}

impl<T> Source<T> {
    /// Create a source from a raw handshake handler.
    ///
    /// Sources built this way bypass the lifecycle checks of
    /// [`create_source`](crate::sources::create_source); they must send
    /// `Start` before any `Data` or `End` themselves.
    pub fn new<F>(on_start: F) -> Self
    where
        F: Fn(Sink<T>) + 'static,
    {
        Self {
            on_start: Rc::new(on_start),
        }
    }

    /// Send the START handshake carrying `sink`
    pub fn subscribe(&self, sink: Sink<T>) {
        (self.on_start)(sink)
    }
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self {
            on_start: Rc::clone(&self.on_start),
        }
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source(..)")
    }
}
