//! Data models for the orgtrack backend.
//!
//! Wire shapes are camelCase JSON; every mutating request carries the acting
//! member's id in `actorId`.

mod activity;
mod member;
mod notification;
mod pocket;
mod team;

pub use activity::*;
pub use member::*;
pub use notification::*;
pub use pocket::*;
pub use team::*;
