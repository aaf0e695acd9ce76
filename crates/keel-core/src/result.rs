//! Result type aliases for Keel.

use crate::KeelError;

/// A specialized `Result` type for Keel operations.
pub type KeelResult<T> = Result<T, KeelError>;

/// A boxed future returning a `KeelResult`.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = KeelResult<T>> + Send + 'a>>;
