//! Chain runner: an ordered list of interceptors terminated by a handler.

use crate::{
    context::Context,
    error::BoxError,
    event::Event,
    handler::{DynHandler, Handler},
    interceptor::{DynInterceptor, Interceptor, Next},
    outcome::Outcome,
};
use std::sync::Arc;

/// A fixed, ordered sequence of interceptors ending in a handler.
///
/// A chain is immutable once built and cheap to clone, so one instance serves
/// every concurrent event.
pub struct Chain<E: Event> {
    interceptors: Arc<[Arc<dyn DynInterceptor<E>>]>,
    handler: Arc<dyn DynHandler<E>>,
}

impl<E: Event> Chain<E> {
    /// Start building a chain.
    pub fn builder() -> ChainBuilder<E> {
        ChainBuilder::new()
    }

    /// Run `event` through the chain with a caller-provided context.
    ///
    /// Errors raised by any interceptor or by the handler are returned
    /// unchanged unless an interceptor handles them on the way up.
    pub async fn run(&self, event: &E, ctx: &mut Context) -> Result<Outcome, BoxError> {
        Next::new(&self.interceptors, self.handler.as_ref())
            .run(event, ctx)
            .await
    }

    /// Run `event` through the chain with a fresh context.
    ///
    /// The context, and anything still published in it, is dropped before
    /// this returns.
    pub async fn dispatch(&self, event: E) -> Result<Outcome, BoxError> {
        let mut ctx = Context::new();
        self.run(&event, &mut ctx).await
    }

    /// Number of interceptors in front of the handler.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if the handler is called directly.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl<E: Event> Clone for Chain<E> {
    fn clone(&self) -> Self {
        Self {
            interceptors: Arc::clone(&self.interceptors),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<E: Event> std::fmt::Debug for Chain<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// Builder for constructing a [`Chain`].
///
/// Interceptors run in the order they are added.
pub struct ChainBuilder<E: Event> {
    interceptors: Vec<Arc<dyn DynInterceptor<E>>>,
}

impl<E: Event> Default for ChainBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> ChainBuilder<E> {
    /// Create a new empty chain builder.
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Append an interceptor.
    pub fn with<I: Interceptor<E>>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Append an interceptor that is already shared.
    pub fn with_shared(mut self, interceptor: Arc<dyn DynInterceptor<E>>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Terminate the chain with `handler`.
    pub fn handler<H: Handler<E>>(self, handler: H) -> Chain<E> {
        Chain {
            interceptors: self.interceptors.into(),
            handler: Arc::new(handler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Debug)]
    struct Ping(u32);

    impl Event for Ping {}

    #[derive(Debug, thiserror::Error)]
    #[error("handler refused ping {0}")]
    struct Refused(u32);

    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Interceptor<Ping> for Trace {
        async fn intercept(
            &self,
            event: &Ping,
            ctx: &mut Context,
            next: Next<'_, Ping>,
        ) -> Result<Outcome, BoxError> {
            self.log.lock().unwrap().push(format!("enter {}", self.name));
            ctx.insert(self.name, event.0);
            let result = next.run(event, ctx).await;
            self.log.lock().unwrap().push(format!("leave {}", self.name));
            result
        }
    }

    struct Gate;

    impl Interceptor<Ping> for Gate {
        async fn intercept(
            &self,
            event: &Ping,
            ctx: &mut Context,
            next: Next<'_, Ping>,
        ) -> Result<Outcome, BoxError> {
            if event.0 == 0 {
                return Ok(Outcome::Unhandled);
            }
            next.run(event, ctx).await
        }
    }

    struct Echo {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Handler<Ping> for Echo {
        type Output = Result<(), Refused>;

        async fn call(&self, event: &Ping, ctx: &mut Context) -> Self::Output {
            let seen: Vec<&str> = ["outer", "inner"]
                .into_iter()
                .filter(|k| ctx.contains_key(k))
                .collect();
            self.log
                .lock()
                .unwrap()
                .push(format!("handle {} with {:?}", event.0, seen));
            if event.0 == 13 {
                return Err(Refused(13));
            }
            Ok(())
        }
    }

    fn build(log: &Arc<Mutex<Vec<String>>>) -> Chain<Ping> {
        Chain::builder()
            .with(Trace {
                name: "outer",
                log: log.clone(),
            })
            .with(Gate)
            .with(Trace {
                name: "inner",
                log: log.clone(),
            })
            .handler(Echo { log: log.clone() })
    }

    #[tokio::test]
    async fn test_runs_in_order_and_unwinds() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = build(&log);

        let outcome = chain.dispatch(Ping(1)).await.unwrap();

        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "enter outer",
                "enter inner",
                "handle 1 with [\"outer\", \"inner\"]",
                "leave inner",
                "leave outer",
            ]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = build(&log);

        let outcome = chain.dispatch(Ping(0)).await.unwrap();

        assert_eq!(outcome, Outcome::Unhandled);
        assert_eq!(*log.lock().unwrap(), vec!["enter outer", "leave outer"]);
    }

    #[tokio::test]
    async fn test_handler_error_propagates_unchanged() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = build(&log);

        let err = chain.dispatch(Ping(13)).await.unwrap_err();

        assert_eq!(err.downcast_ref::<Refused>().map(|r| r.0), Some(13));
        // Both interceptors still unwound.
        assert_eq!(log.lock().unwrap().last().unwrap(), "leave outer");
    }

    #[tokio::test]
    async fn test_run_keeps_context_for_caller() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = build(&log);
        let mut ctx = Context::new();

        chain.run(&Ping(5), &mut ctx).await.unwrap();

        assert_eq!(ctx.get::<u32>("outer"), Some(&5));
        assert_eq!(ctx.get::<u32>("inner"), Some(&5));
    }

    #[tokio::test]
    async fn test_empty_chain_calls_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::builder().handler(Echo { log: log.clone() });

        assert!(chain.is_empty());
        chain.dispatch(Ping(2)).await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
