//! Core types, storage traits and services for the Rapport social layer.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement the traits in [`store`]; the services in [`social`],
//! [`mailbox`], [`comments`] and [`notify`] hold all of the behaviour.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod comment;
pub mod comments;
pub mod digest;
pub mod error;
pub mod identity;
pub mod mailbox;
pub mod message;
pub mod note;
pub mod notify;
pub mod relation;
pub mod social;
pub mod store;

pub use error::{Error, Result};
