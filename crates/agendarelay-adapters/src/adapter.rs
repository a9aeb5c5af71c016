//! The generic client adapter.
//!
//! An [`Adapter`] owns one third-party client and funnels every call into it
//! through [`Adapter::use_client`]. Client methods report their outcome as a
//! [`Call`]: either a result that is already known (the call completed or
//! failed on the spot) or a pending future. `use_client` turns both failure
//! shapes into the adapter's own [`AdapterError`], keeping the distinction in
//! the error's [`Origin`](crate::error::Origin) and message.
//!
//! ```ignore
//! let list = calendar
//!     .use_client(|client| client.list_events(params))
//!     .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::{AdapterError, Cause};

/// A boxed future for client calls.
///
/// Client traits are used as trait objects, so their pending results are
/// boxed rather than returned as `impl Future`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The outcome of invoking a client method.
pub enum Call<'a, T> {
    /// The method returned (or failed) without deferring any work.
    Ready(Result<T, Cause>),
    /// The method deferred its work to a future.
    Pending(BoxFuture<'a, Result<T, Cause>>),
}

impl<'a, T> Call<'a, T> {
    /// An immediately available value.
    pub fn ok(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    /// An immediate failure.
    pub fn fail(cause: impl Into<Cause>) -> Self {
        Self::Ready(Err(cause.into()))
    }

    /// Wraps a future as a pending result.
    pub fn pending<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'a,
        E: Into<Cause>,
        T: 'a,
    {
        Self::Pending(Box::pin(async move { future.await.map_err(Into::into) }))
    }

    /// Returns `true` if the outcome is deferred.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl<T, E> From<Result<T, E>> for Call<'_, T>
where
    E: Into<Cause>,
{
    fn from(result: Result<T, E>) -> Self {
        Self::Ready(result.map_err(Into::into))
    }
}

impl<T> fmt::Debug for Call<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(Ok(_)) => f.write_str("Call::Ready(Ok(..))"),
            Self::Ready(Err(e)) => write!(f, "Call::Ready(Err({e}))"),
            Self::Pending(_) => f.write_str("Call::Pending(..)"),
        }
    }
}

/// Lifecycle hook shared by every wrapped client.
pub trait ClientHandle: Send + Sync {
    /// Releases resources held by the client. Called once when the owning
    /// scope ends; stateless clients keep the default no-op.
    fn close(&self) {}
}

/// Identifies one adapter: its error tag and the client it wraps.
pub trait AdapterKind: Send + Sync + 'static {
    /// Tag used in error names and messages, e.g. `"Calendar"`.
    const TAG: &'static str;

    /// The wrapped client, usually a trait object.
    type Client: ClientHandle + ?Sized;
}

/// Owns a client and exposes it only through [`use_client`](Self::use_client).
pub struct Adapter<K: AdapterKind> {
    client: Box<K::Client>,
}

impl<K: AdapterKind> Adapter<K> {
    /// Wraps an already constructed client.
    pub fn new(client: Box<K::Client>) -> Self {
        Self { client }
    }

    /// Runs `op` against the live client with unified error handling.
    ///
    /// `op` is invoked before this method returns. A [`Call::Ready`] failure
    /// becomes a synchronous-origin error and the returned future resolves to
    /// it without awaiting anything. A [`Call::Pending`] result is awaited by
    /// the returned future and a failure there becomes an asynchronous-origin
    /// error.
    pub fn use_client<'a, T, F>(&'a self, op: F) -> BoxFuture<'a, Result<T, AdapterError<K>>>
    where
        F: FnOnce(&'a K::Client) -> Call<'a, T>,
        T: Send + 'a,
    {
        match op(self.client.as_ref()) {
            Call::Ready(result) => {
                Box::pin(std::future::ready(result.map_err(AdapterError::synchronous)))
            }
            Call::Pending(pending) => {
                Box::pin(async move { pending.await.map_err(AdapterError::asynchronous) })
            }
        }
    }

    /// Releases the client's resources.
    pub fn release(&self) {
        tracing::debug!(adapter = K::TAG, "releasing client");
        self.client.close();
    }
}

impl<K: AdapterKind> fmt::Debug for Adapter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("tag", &K::TAG)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use thiserror::Error;

    use super::*;
    use crate::error::Origin;

    #[derive(Debug, PartialEq, Error)]
    #[error("counter failure {0}")]
    struct CounterError(usize);

    /// Minimal stateful client exercising both outcome shapes.
    trait Counter: ClientHandle {
        fn bump(&self) -> Call<'_, usize>;
        fn bump_later(&self) -> Call<'_, usize>;
        fn explode(&self) -> Call<'_, usize>;
        fn explode_later(&self) -> Call<'_, usize>;
    }

    #[derive(Default)]
    struct InMemoryCounter {
        value: AtomicUsize,
        closed: Mutex<bool>,
    }

    impl ClientHandle for InMemoryCounter {
        fn close(&self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    impl Counter for InMemoryCounter {
        fn bump(&self) -> Call<'_, usize> {
            Call::ok(self.value.fetch_add(1, Ordering::SeqCst) + 1)
        }

        fn bump_later(&self) -> Call<'_, usize> {
            Call::pending(async move {
                tokio::task::yield_now().await;
                Ok::<_, CounterError>(self.value.fetch_add(1, Ordering::SeqCst) + 1)
            })
        }

        fn explode(&self) -> Call<'_, usize> {
            Call::fail(CounterError(self.value.load(Ordering::SeqCst)))
        }

        fn explode_later(&self) -> Call<'_, usize> {
            Call::pending(async move { Err::<usize, _>(CounterError(99)) })
        }
    }

    struct Counting;

    impl AdapterKind for Counting {
        const TAG: &'static str = "Counter";
        type Client = dyn Counter;
    }

    fn adapter() -> Adapter<Counting> {
        let client: Box<dyn Counter> = Box::new(InMemoryCounter::default());
        Adapter::new(client)
    }

    #[tokio::test]
    async fn ready_value_passes_through() {
        let counter = adapter();
        assert_eq!(counter.use_client(|c| c.bump()).await.unwrap(), 1);
        assert_eq!(counter.use_client(|c| c.bump()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn pending_value_is_awaited() {
        let counter = adapter();
        assert_eq!(counter.use_client(|c| c.bump_later()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn plain_closure_values_are_allowed() {
        let counter = adapter();
        let doubled = counter
            .use_client(|_| Call::from(Ok::<_, CounterError>(21 * 2)))
            .await
            .unwrap();
        assert_eq!(doubled, 42);
    }

    #[tokio::test]
    async fn synchronous_failure_is_tagged() {
        let counter = adapter();
        let err = counter.use_client(|c| c.explode()).await.unwrap_err();

        assert_eq!(err.origin(), Origin::Synchronous);
        assert_eq!(err.message(), Some("Synchronous error in `Counter.use`"));
        assert_eq!(err.cause_as::<CounterError>(), Some(&CounterError(0)));
    }

    #[tokio::test]
    async fn asynchronous_failure_is_tagged() {
        let counter = adapter();
        let err = counter.use_client(|c| c.explode_later()).await.unwrap_err();

        assert_eq!(err.origin(), Origin::Asynchronous);
        assert_eq!(err.message(), Some("Asynchronous error in `Counter.use`"));
        assert_eq!(err.cause_as::<CounterError>(), Some(&CounterError(99)));
    }

    #[tokio::test]
    async fn op_runs_before_the_future_is_polled() {
        let counter = adapter();
        let invoked = AtomicUsize::new(0);

        let fut = counter.use_client(|c| {
            invoked.fetch_add(1, Ordering::SeqCst);
            c.bump()
        });
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
        assert_eq!(fut.await.unwrap(), 1);
    }

    #[test]
    fn call_shape() {
        assert!(Call::<()>::pending(async { Ok::<_, CounterError>(()) }).is_pending());
        assert!(!Call::ok(1).is_pending());
        assert_eq!(format!("{:?}", Call::<u8>::fail("nope")), "Call::Ready(Err(nope))");
    }

    #[test]
    fn release_closes_client() {
        let inner = std::sync::Arc::new(InMemoryCounter::default());

        struct Shared(std::sync::Arc<InMemoryCounter>);
        impl ClientHandle for Shared {
            fn close(&self) {
                self.0.close();
            }
        }
        impl Counter for Shared {
            fn bump(&self) -> Call<'_, usize> {
                self.0.bump()
            }
            fn bump_later(&self) -> Call<'_, usize> {
                self.0.bump_later()
            }
            fn explode(&self) -> Call<'_, usize> {
                self.0.explode()
            }
            fn explode_later(&self) -> Call<'_, usize> {
                self.0.explode_later()
            }
        }

        let client: Box<dyn Counter> = Box::new(Shared(inner.clone()));
        let counter = Adapter::<Counting>::new(client);
        counter.release();
        assert!(*inner.closed.lock().unwrap());
    }
}
