//! # Talkback: a pull/push source protocol for Rust
//!
//! This crate implements a minimal message protocol between producers
//! (sources) and consumers (sinks). Both sides are actors receiving one of
//! three messages: START carrying a talkback channel, DATA carrying a value,
//! and END carrying an optional error. Sinks talk back through the channel to
//! pull the next value or stop the source.
//!
//! ## Core Concepts
//!
//! - **Source**: Starts a handshake with every sink it is given
//! - **Sink**: Reacts to START, DATA and END
//! - **Producer**: Emits through a lifecycle that rejects protocol misuse
//! - **Consumption**: Imperative handle to pull, stop and restart a source
//! - **Operators**: Sources wrapping other sources (`map`, `take`, `switch_error`)
//!
//! ## Example
//!
//! ```rust
//! use talkback::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let source = from_iter(1..=100)
//!         .map(|x| x * 2)
//!         .take(3);
//!
//!     assert_eq!(drain(&source)?, vec![2, 4, 6]);
//!     Ok(())
//! }
//! ```

pub mod consume;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod processors;
pub mod sinks;
pub mod sources;
pub mod util;

// Re-export commonly used items
pub mod prelude {
    pub use crate::consume::{consume, consume_lazy, drain, Consumption, WeakConsumption};
    pub use crate::core::{
        Actor, Kind, LifecycleState, Message, Operation, ProtocolViolation, Signal, Sink, Source,
        Talkback,
    };
    pub use crate::diagnostics::Diagnostics;
    pub use crate::error::{Error, Result};
    pub use crate::processors::{map, switch_error, take, SourceExt};
    pub use crate::sinks::{create_sink, Handlers, Management};
    pub use crate::sources::{
        create_source, create_source_with, from_iter, interval, pullable_from_iter, Producer,
        SourceConfig, Teardown,
    };
    pub use crate::util::{into_stream, SourceStream};
}

// Re-export main error type
pub use error::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
