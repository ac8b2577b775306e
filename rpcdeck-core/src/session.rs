//! # Call Sessions
//!
//! Client-side bookkeeping for calls issued through a [`crate::transport::Transport`].
//!
//! The [`CallSessionStore`] keeps, per method id:
//!
//! * a [`RequestSession`]: every payload sent during the current call, most recent first,
//! * a [`ResponseSession`]: every payload received, most recent first, plus the latest metadata,
//! * a running flag: present for streaming calls, `true` while the call is open.
//!
//! Inbound transport events ([`InboundEvent`]) are fed into the store by its owner, one at a time.
mod store;
mod types;

pub use store::*;
pub use types::*;
