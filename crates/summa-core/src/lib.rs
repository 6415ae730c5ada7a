//! Core types and trait definitions for the Summa summary store.
//!
//! Summa keeps versioned summaries of externally catalogued subjects. Each
//! `(subject, variant)` key owns an independent lineage of revisions, exactly
//! one of which is flagged as latest at every committed state.
//!
//! This crate is free of database dependencies. Backends implement
//! [`store::SummaryStore`] and route every write through
//! [`pointer::plan_write`].

// Native `async fn` in traits; the futures are `Send` by signature.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod invariant;
pub mod pointer;
pub mod store;
pub mod subject;
pub mod summary;

pub use error::{Error, Result};
