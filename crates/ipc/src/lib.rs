//! Channel contract between the vault core and the UI shell.
//!
//! Every request is a channel name plus a JSON payload; every reply is JSON.
//! Failures never escape as Rust errors: lifecycle channels answer
//! `{ "success": false, "error": ... }` and the rest answer `{ "error": ... }`.

pub mod channels;
pub mod dispatch;
pub mod dto;
pub mod generator;

pub use {
    channels::Channel,
    dispatch::Dispatcher,
    dto::{AppMetadata, CredentialDto, ErrorReply, LifecycleReply, is_valid_id},
    generator::{GeneratorError, GeneratorOptions, generate},
};
