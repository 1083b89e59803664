use std::{error::Error, fmt};

type BoxedError = Box<dyn Error + Send + Sync + 'static>;

/// A failure reported by an application when a simulation finishes.
///
/// Every `Error + Send + Sync` type converts into a `RuntimeError`, so
/// [`Application::at_sim_end`](crate::runtime::Application::at_sim_end)
/// and functions that drive a runtime can use `?` freely. The concrete
/// error stays reachable through [`RuntimeError::downcast_ref`].
pub struct RuntimeError {
    source: BoxedError,
}

impl RuntimeError {
    /// An error that only carries a message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        RuntimeError {
            source: message.into(),
        }
    }

    /// The wrapped error, if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Error + 'static>(&self) -> Option<&T> {
        self.source.downcast_ref::<T>()
    }

    /// Unwraps into the boxed source error.
    #[must_use]
    pub fn into_inner(self) -> BoxedError {
        self.source
    }
}

impl fmt::Debug for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RuntimeError").field(&self.source).finish()
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl<E> From<E> for RuntimeError
where
    E: Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        RuntimeError {
            source: Box::new(err),
        }
    }
}
