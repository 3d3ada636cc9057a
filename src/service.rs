use {
    crate::{access_denied_response, verifier::check_request, LinkIntegrity, RequestViewOptions, VerificationOutcome},
    http::{Request, Response},
    log::trace,
    std::{
        any::type_name,
        fmt::{Debug, Formatter, Result as FmtResult},
        future::{ready, Future, Ready},
        marker::PhantomData,
        pin::Pin,
        task::{Context, Poll},
    },
    tower::{BoxError, Layer, Service, ServiceExt},
};

/// The service requests are routed to when their link has been tampered with and no other
/// service was supplied: a bare 403 "Access denied" page.
pub struct AccessDeniedService<RB> {
    _body: PhantomData<fn() -> RB>,
}

impl<RB> AccessDeniedService<RB> {
    /// Create the service.
    pub fn new() -> Self {
        Self {
            _body: PhantomData,
        }
    }
}

impl<RB> Default for AccessDeniedService<RB> {
    fn default() -> Self {
        Self::new()
    }
}

impl<RB> Clone for AccessDeniedService<RB> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<RB> Debug for AccessDeniedService<RB> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str("AccessDeniedService")
    }
}

impl<B, RB> Service<Request<B>> for AccessDeniedService<RB>
where
    RB: From<&'static str>,
{
    type Response = Response<RB>;
    type Error = BoxError;
    type Future = Ready<Result<Response<RB>, BoxError>>;

    fn poll_ready(&mut self, _: &mut Context) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _: Request<B>) -> Self::Future {
        ready(Ok(access_denied_response()))
    }
}

/// `LinkIntegrityService` verifies the link of every request before dispatching it.
///
/// Valid requests go to `implementation`; tampered ones go to `tampered` after the tamper
/// callback has run. In both cases the [`VerificationOutcome`] is added to the request
/// extensions. The request is read through `view_options`.
#[derive(Clone)]
pub struct LinkIntegrityService<S, T> {
    /// The link integrity context requests are verified against.
    pub link_integrity: LinkIntegrity,

    /// The service handling requests with valid links.
    pub implementation: S,

    /// The service handling requests with tampered links.
    pub tampered: T,

    /// How each request's URL is reconstructed for verification.
    pub view_options: RequestViewOptions,
}

impl<S, T> LinkIntegrityService<S, T> {
    /// Wrap `implementation`, sending tampered requests to `tampered` instead.
    pub fn new(link_integrity: LinkIntegrity, implementation: S, tampered: T) -> Self {
        LinkIntegrityService {
            link_integrity,
            implementation,
            tampered,
            view_options: RequestViewOptions::default(),
        }
    }

    /// Read requests through `view_options` instead of the defaults.
    pub fn with_view_options(mut self, view_options: RequestViewOptions) -> Self {
        self.view_options = view_options;
        self
    }
}

impl<S, T> Debug for LinkIntegrityService<S, T> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.debug_struct("LinkIntegrityService")
            .field("link_integrity", &self.link_integrity)
            .field("implementation", &type_name::<S>())
            .field("tampered", &type_name::<T>())
            .field("view_options", &self.view_options)
            .finish()
    }
}

impl<B, RB, S, T> Service<Request<B>> for LinkIntegrityService<S, T>
where
    B: Send + 'static,
    RB: 'static,
    S: Service<Request<B>, Response = Response<RB>, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send,
    T: Service<Request<B>, Response = Response<RB>, Error = BoxError> + Clone + Send + 'static,
    T::Future: Send,
{
    type Response = Response<RB>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Response<RB>, BoxError>> + Send>>;

    fn poll_ready(&mut self, c: &mut Context) -> Poll<Result<(), Self::Error>> {
        match self.implementation.poll_ready(c) {
            Poll::Ready(Ok(())) => self.tampered.poll_ready(c),
            other => other,
        }
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let link_integrity = self.link_integrity.clone();
        let implementation = self.implementation.clone();
        let tampered = self.tampered.clone();
        let view_options = self.view_options.clone();

        Box::pin(handle_call(req, link_integrity, view_options, implementation, tampered))
    }
}

async fn handle_call<B, RB, S, T>(
    req: Request<B>,
    link_integrity: LinkIntegrity,
    view_options: RequestViewOptions,
    implementation: S,
    tampered: T,
) -> Result<Response<RB>, BoxError>
where
    S: Service<Request<B>, Response = Response<RB>, Error = BoxError>,
    T: Service<Request<B>, Response = Response<RB>, Error = BoxError>,
{
    let (mut parts, body) = req.into_parts();
    let (outcome, tampered_link) = check_request(link_integrity.config(), &view_options.view(&parts))?;
    trace!("Link verification outcome for {}: {}", parts.uri, outcome);
    parts.extensions.insert(outcome);
    let req = Request::from_parts(parts, body);

    match (outcome, tampered_link) {
        (VerificationOutcome::Tampered, tampered_link) => {
            if let (Some(callback), Some(tampered_link)) = (link_integrity.tamper_callback(), tampered_link) {
                callback.on_tampered(&tampered_link);
            }
            tampered.oneshot(req).await
        }
        (VerificationOutcome::Valid, _) => implementation.oneshot(req).await,
    }
}

/// A [`Layer`] wrapping services in a [`LinkIntegrityService`] that sends tampered requests to an
/// [`AccessDeniedService`].
#[derive(Clone, Debug)]
pub struct LinkIntegrityLayer {
    link_integrity: LinkIntegrity,
    view_options: RequestViewOptions,
}

impl LinkIntegrityLayer {
    /// Create a layer verifying requests against `link_integrity`.
    pub fn new(link_integrity: LinkIntegrity) -> Self {
        Self {
            link_integrity,
            view_options: RequestViewOptions::default(),
        }
    }

    /// Read requests through `view_options`: the default scheme for origin-form requests, the
    /// script path, and any route parameters.
    pub fn with_view_options(mut self, view_options: RequestViewOptions) -> Self {
        self.view_options = view_options;
        self
    }
}

impl<S> Layer<S> for LinkIntegrityLayer {
    type Service = LinkIntegrityService<S, AccessDeniedService<String>>;

    fn layer(&self, inner: S) -> Self::Service {
        LinkIntegrityService::new(self.link_integrity.clone(), inner, AccessDeniedService::new())
            .with_view_options(self.view_options.clone())
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{
            ChecksumConfig, ExtraParams, LinkIntegrity, LinkIntegrityService, RequestViewOptions, TamperedLink,
            UrlComponents, VerificationOutcome,
        },
        bytes::Bytes,
        http::{request::Parts, Request, Response, StatusCode},
        std::sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        tower::{service_fn, BoxError, Layer, ServiceExt},
    };

    async fn hello(req: Request<()>) -> Result<Response<String>, BoxError> {
        let outcome = req.extensions().get::<VerificationOutcome>().copied();
        assert_eq!(outcome, Some(VerificationOutcome::Valid));
        Ok(Response::new("Hello world".to_string()))
    }

    async fn custom_tampered(req: Request<()>) -> Result<Response<Bytes>, BoxError> {
        assert_eq!(req.extensions().get::<VerificationOutcome>(), Some(&VerificationOutcome::Tampered));
        let mut response = Response::new(Bytes::from_static(b"go away"));
        *response.status_mut() = StatusCode::GONE;
        Ok(response)
    }

    async fn unreachable_bytes(_: Request<()>) -> Result<Response<Bytes>, BoxError> {
        panic!("Tampered request reached the implementation");
    }

    fn context() -> LinkIntegrity {
        LinkIntegrity::new(ChecksumConfig::builder().secret("extra secret").build().unwrap())
    }

    fn request(uri: &str) -> Request<()> {
        Request::builder().uri(uri).header("host", "www.example.com").body(()).unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn layer_passes_valid_requests() {
        let li = context();
        let signed = li.sign("http://www.example.com/hello?name=world", ExtraParams::None).unwrap();
        let svc = li.layer().layer(service_fn(hello));

        let response = svc.oneshot(request(signed.trim_start_matches("http://www.example.com"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "Hello world");
    }

    #[test_log::test(tokio::test)]
    async fn layer_denies_tampered_requests() {
        let li = context();
        let svc = li.layer().layer(service_fn(hello));
        let response = svc.oneshot(request("/hello?name=mallory&_checksum=xxxx")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.body().contains("Access denied"));
    }

    #[test_log::test(tokio::test)]
    async fn custom_tampered_service_and_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = calls.clone();
        let li = context().with_tamper_callback(move |link: &TamperedLink| {
            assert_eq!(link.provided_checksum, "");
            calls_cb.fetch_add(1, Ordering::SeqCst);
        });

        let svc = LinkIntegrityService::new(li, service_fn(unreachable_bytes), service_fn(custom_tampered));
        let response = svc.oneshot(request("/hello?name=world")).await.unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(response.body().as_ref(), b"go away");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn origin_form_https_requests() {
        let li = context();
        let signed = li.sign("https://www.example.com/hello?name=world", ExtraParams::None).unwrap();
        let path = signed.trim_start_matches("https://www.example.com");

        let https = RequestViewOptions::builder().default_scheme("https").build().unwrap();
        let svc = li.layer().with_view_options(https).layer(service_fn(hello));
        let response = svc.oneshot(request(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Without the default scheme the request reads as http and no longer matches.
        let svc = li.layer().layer(service_fn(hello));
        let response = svc.oneshot(request(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn route_params_are_verified() {
        let li = context();
        let signed = li.sign("http://www.example.com/item", vec![("tenant", "acme")]).unwrap();
        let checksum = UrlComponents::parse(&signed).unwrap().query_param("_checksum").unwrap().to_string();
        let path = format!("/item?_checksum={}", checksum);

        let tenant = |name: &'static str| {
            RequestViewOptions::builder()
                .route_params(move |_: &Parts| vec![("tenant".to_string(), name.to_string())])
                .build()
                .unwrap()
        };

        let svc = li.layer().with_view_options(tenant("acme")).layer(service_fn(hello));
        let response = svc.oneshot(request(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let svc = li.layer().with_view_options(tenant("evil")).layer(service_fn(hello));
        let response = svc.oneshot(request(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // The route parameter can't be dropped either.
        let svc = li.layer().layer(service_fn(hello));
        let response = svc.oneshot(request(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn disabled_passes_everything() {
        let li = LinkIntegrity::new(ChecksumConfig::builder().secret("s").disabled(true).build().unwrap());
        let svc = li.layer().layer(service_fn(hello));
        let response = svc.oneshot(request("/hello?name=anyone")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
