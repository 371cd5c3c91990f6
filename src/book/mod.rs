//! Order-book state and the event reconciler that mutates it.

pub mod reconciler;
pub mod store;

pub use reconciler::Reconciler;
pub use store::{BookState, BookStore};
