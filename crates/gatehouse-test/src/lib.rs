//! # Gatehouse Test
//!
//! Shared test helpers: HS256 token builders and an in-process stub
//! backend for exercising the relay end to end.

#![forbid(unsafe_code)]

mod backend;
mod token;

pub use backend::{ReceivedRequest, StubBackend};
pub use token::{expired_token, valid_token, TokenBuilder};
