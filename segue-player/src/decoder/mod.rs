//! Decoder thread coordination
//!
//! - [`DecoderControl`]: shared object between the player thread and the
//!   decoder thread (state, command, error, session fields)
//! - [`Decoder`]: the decoder thread's handle on a running session, passed
//!   to the codec plugin
//! - [`DecoderPlugin`]: codec-specific decode loop supplied by the caller
//! - `thread`: the decoder thread's command loop

pub mod bridge;
pub mod command;
pub mod control;
mod thread;

pub use bridge::{Decoder, DecoderPlugin};
pub use command::{DecoderCommand, DecoderState};
pub use control::{ControlState, DecoderControl};
