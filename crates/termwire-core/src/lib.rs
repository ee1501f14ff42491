#![forbid(unsafe_code)]

//! Core: commands and their encodings, output queueing, input parsing, and
//! the event pump. Nothing here touches a real terminal; the OS side plugs in
//! through [`raw_mode::TerminalMode`] and [`byte_source::ByteSource`].

pub mod ansi;
pub mod byte_source;
pub mod clock;
pub mod command;
pub mod config;
pub mod enhancement;
pub mod error;
pub mod event;
pub mod event_pump;
pub mod input_parser;
pub mod logging;
pub mod output_queue;
pub mod raw_mode;
pub mod strategy;
pub mod style;

pub use error::{Error, Result};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, trace, trace_span, warn};
