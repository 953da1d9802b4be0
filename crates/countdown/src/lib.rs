//! Concierge Countdown Library
//!
//! Drives the door code reveal window on a tokio runtime.
//!
//! # Usage
//!
//! ```ignore
//! let handle = start_countdown(
//!     &grant,
//!     CountdownOptions::from_config(&config.reveal),
//!     |remaining| println!("{}", format_clock(remaining)),
//!     || println!("{}", redacted_credential()),
//! );
//!
//! // When the display goes away
//! handle.cancel();
//! ```

pub mod clock;
pub mod countdown;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use countdown::{
    start_countdown, CountdownHandle, CountdownOptions, CountdownStatus, DEFAULT_TICK_INTERVAL,
};
