// src/watch/mod.rs

//! File watching and change classification.
//!
//! - [`watcher`] registers the project tree with the OS (`notify`) and turns
//!   raw notifications into a [`ChangeStream`] of [`ChangeEvent`]s. It does
//!   not filter.
//! - [`classifier`] decides which of those events are relevant.
//!
//! [`ChangeEvent`]: crate::types::ChangeEvent

pub mod classifier;
pub mod path_utils;
pub mod watcher;

pub use classifier::PathClassifier;
pub use watcher::{change_channel, forward_to_runtime, spawn_watcher, ChangeStream, WatcherHandle};
