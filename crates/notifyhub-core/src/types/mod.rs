//! Core type definitions used across the NotifyHub workspace.

pub mod id;

pub use id::*;
