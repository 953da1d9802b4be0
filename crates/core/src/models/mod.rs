//! Data models for Concierge

mod grant;
mod owner;
mod property;

pub use grant::*;
pub use owner::*;
pub use property::*;
