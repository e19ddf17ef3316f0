use crate::http::{make_boxed_error_response, make_text_response};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// What the admin endpoints report about the running component.
pub trait Probe: Send + Sync + 'static {
    fn is_ready(&self) -> bool;

    /// Plain-text summary served on `/status`.
    fn status(&self) -> String;
}

/// Serves `/health`, `/ready` and `/status`.
pub struct AdminService<P, E> {
    probe: P,
    _error: PhantomData<fn() -> E>,
}

impl<P, E> AdminService<P, E>
where
    P: Probe,
{
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            _error: PhantomData,
        }
    }

    fn respond(&self, path: &str) -> Response<BoxBody<Bytes, Infallible>> {
        match path {
            "/health" => make_text_response(StatusCode::OK, "ok\n".into()),
            "/ready" if self.probe.is_ready() => make_text_response(StatusCode::OK, "ok\n".into()),
            "/ready" => make_boxed_error_response(StatusCode::SERVICE_UNAVAILABLE),
            "/status" => make_text_response(StatusCode::OK, self.probe.status()),
            _ => make_boxed_error_response(StatusCode::NOT_FOUND),
        }
    }
}

impl<P, E> Service<Request<Incoming>> for AdminService<P, E>
where
    P: Probe,
    E: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, Infallible>>;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let res = self.respond(req.uri().path());
        Box::pin(async move { Ok(res) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct FlagProbe(Arc<AtomicBool>);

    impl Probe for FlagProbe {
        fn is_ready(&self) -> bool {
            self.0.load(Ordering::Relaxed)
        }

        fn status(&self) -> String {
            "watching\n".into()
        }
    }

    #[test]
    fn test_routes() {
        let ready = Arc::new(AtomicBool::new(false));
        let service: AdminService<_, std::io::Error> = AdminService::new(FlagProbe(ready.clone()));

        assert_eq!(service.respond("/health").status(), StatusCode::OK);
        assert_eq!(
            service.respond("/ready").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        ready.store(true, Ordering::Relaxed);
        assert_eq!(service.respond("/ready").status(), StatusCode::OK);
        assert_eq!(service.respond("/status").status(), StatusCode::OK);
        assert_eq!(service.respond("/nope").status(), StatusCode::NOT_FOUND);
    }
}
