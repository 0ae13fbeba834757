//! Core interceptor trait and chain types.
//!
//! Every stage in the gateway implements [`Interceptor`]. An interceptor
//! sees the request on the way in, decides whether to pass it on via
//! [`Next`], and sees the response on the way out. Returning without
//! calling `next.run()` short-circuits: no later interceptor and no
//! backend is touched.

use gatehouse_core::{Request, RequestContext, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future that resolves to a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One stage of the request pipeline.
///
/// # Invariants
///
/// - An interceptor calls `next.run()` at most once; not calling it
///   short-circuits the chain with the interceptor's own response.
/// - `order()` is stable for the lifetime of the instance; the pipeline
///   sorts by it exactly once at build time.
pub trait Interceptor: Send + Sync + 'static {
    /// Unique stage name, used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Execution priority. Lower values run earlier on the request path
    /// and therefore later on the response path.
    fn order(&self) -> i32;

    /// Processes the request through this stage.
    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Continuation invoking the rest of the chain.
///
/// Consumed by `run` so a stage cannot invoke its downstream twice.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        interceptor: &'a dyn Interceptor,
        next: Box<Next<'a>>,
    },
    Terminal(
        Box<dyn FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Response> + Send + 'a>,
    ),
}

impl<'a> Next<'a> {
    /// Wraps the chain with one more interceptor.
    pub(crate) fn new(interceptor: &'a dyn Interceptor, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                interceptor,
                next: Box::new(next),
            },
        }
    }

    /// Creates the terminal continuation invoking the forwarding handler.
    pub(crate) fn terminal<F>(f: F) -> Self
    where
        F: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Terminal(Box::new(f)),
        }
    }

    /// Invokes the remaining chain. Consumes `self`.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { interceptor, next } => {
                interceptor.handle(ctx, request, *next).await
            }
            NextInner::Terminal(handler) => handler(ctx, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    struct Tagging {
        name: &'static str,
    }

    impl Interceptor for Tagging {
        fn name(&self) -> &'static str {
            self.name
        }

        fn order(&self) -> i32 {
            0
        }

        fn handle<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                ctx.set_attribute(format!("visited.{}", self.name), "true");
                next.run(ctx, request).await
            })
        }
    }

    fn empty_request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_terminal<'a>() -> Next<'a> {
        Next::terminal(|_ctx, _req| {
            Box::pin(async {
                http::Response::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::from("ok")))
                    .unwrap()
            })
        })
    }

    #[tokio::test]
    async fn terminal_runs_the_handler() {
        let mut ctx = RequestContext::new(None);
        let response = ok_terminal().run(&mut ctx, empty_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chain_visits_every_stage() {
        let first = Tagging { name: "first" };
        let second = Tagging { name: "second" };

        let chain = Next::new(&first, Next::new(&second, ok_terminal()));

        let mut ctx = RequestContext::new(None);
        let response = chain.run(&mut ctx, empty_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.attribute("visited.first"), Some("true"));
        assert_eq!(ctx.attribute("visited.second"), Some("true"));
    }
}
