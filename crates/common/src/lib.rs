//! Shared error definitions and text helpers used across the talkshop crates.

pub mod error;
pub mod text;

pub use error::{Error, FromMessage, Result, TalkShopError};
