//! In-memory backend for the Summa summary store.
//!
//! Nothing is durable. Each `(subject, variant)` key has its own lock, so
//! writes to different keys never wait on each other; writes to the same key
//! are serialised.

mod store;

pub use store::MemoryStore;

#[cfg(test)]
mod tests;
