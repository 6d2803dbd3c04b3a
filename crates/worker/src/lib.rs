//! `zapnotify-worker` library crate.
//!
//! Wires the payment notification pipeline together: configuration, the
//! per-event [`dispatch`] pipeline and the [`listener`] receive loop. The
//! binary entrypoint lives in `main.rs`.

pub mod config;
pub mod dispatch;
pub mod listener;
