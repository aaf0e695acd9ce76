//! Generic ordered event handler chain.

use crate::{BoxFuture, KeelResult};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A handler bound to a [`Hook`].
///
/// Handlers receive the same mutable event value one after another. Return
/// [`crate::KeelError::StopPropagation`] to end the chain without failing it.
pub type Handler<E> = Arc<dyn for<'a> Fn(&'a mut E) -> BoxFuture<'a, ()> + Send + Sync>;

/// An ordered, cancellable handler chain bound to one event type.
///
/// ```
/// use keel_core::{Hook, KeelError};
///
/// # tokio_test_block_on(async {
/// let hook: Hook<Vec<&'static str>> = Hook::new();
/// hook.bind(|event| Box::pin(async move {
///     event.push("first");
///     Err::<(), _>(KeelError::StopPropagation)
/// }));
/// hook.bind(|event| Box::pin(async move {
///     event.push("never");
///     Ok(())
/// }));
///
/// let mut event = Vec::new();
/// hook.trigger(&mut event).await.unwrap();
/// assert_eq!(event, vec!["first"]);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct Hook<E> {
    handlers: RwLock<Vec<Handler<E>>>,
}

impl<E: Send> Hook<E> {
    /// Creates a hook with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Appends a handler. Handlers run in registration order.
    pub fn bind<F>(&self, handler: F)
    where
        F: for<'a> Fn(&'a mut E) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Removes every bound handler.
    pub fn reset(&self) {
        self.handlers.write().clear();
    }

    /// Returns the number of bound handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Runs the bound handlers in order against `event`.
    ///
    /// The first error aborts the chain and is returned, except for the
    /// stop-propagation sentinel which aborts the chain and yields `Ok(())`.
    pub async fn trigger(&self, event: &mut E) -> KeelResult<()> {
        self.run_handlers(event).await.map(|_| ())
    }

    /// Runs the bound handlers and then `terminal`, if the chain completed
    /// without error and without a stop-propagation signal.
    ///
    /// The terminal handler's result is returned.
    pub async fn trigger_with<F>(&self, event: &mut E, terminal: F) -> KeelResult<()>
    where
        F: for<'a> FnOnce(&'a mut E) -> BoxFuture<'a, ()> + Send,
    {
        if self.run_handlers(event).await? {
            terminal(event).await
        } else {
            Ok(())
        }
    }

    /// Returns `true` when every handler completed and propagation was not
    /// stopped.
    async fn run_handlers(&self, event: &mut E) -> KeelResult<bool> {
        // snapshot so that handlers may bind or trigger re-entrantly
        let handlers: Vec<Handler<E>> = self.handlers.read().clone();

        for handler in handlers {
            match handler(event).await {
                Ok(()) => {}
                Err(err) if err.is_stop_propagation() => return Ok(false),
                Err(err) => return Err(err),
            }
        }

        Ok(true)
    }
}

impl<E: Send> Default for Hook<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Hook<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}
