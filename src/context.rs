use {
    crate::{
        access_denied_handler,
        signer::{sign_link, sign_self_link},
        verifier::check_request,
        ChecksumConfig, Dispatcher, ExtraParams, LinkIntegrityError, LinkIntegrityLayer, RequestView,
        SelfLinkOptions, TamperCallback, VerificationOutcome,
    },
    log::debug,
    std::{
        fmt::{Debug, Formatter, Result as FmtResult},
        sync::Arc,
    },
};

/// Link integrity for one application context: the shared configuration plus the optional
/// tamper callback.
///
/// Create one at startup, call [`install_default_handler`][Self::install_default_handler] on the
/// dispatch table, then use it from any number of threads. Cloning is cheap.
#[derive(Clone)]
pub struct LinkIntegrity {
    config: Arc<ChecksumConfig>,
    tamper_callback: Option<Arc<dyn TamperCallback>>,
}

impl LinkIntegrity {
    /// Create a context owning `config`.
    pub fn new(config: ChecksumConfig) -> Self {
        Self::from_shared(Arc::new(config))
    }

    /// Create a context sharing `config` with other owners.
    pub fn from_shared(config: Arc<ChecksumConfig>) -> Self {
        Self {
            config,
            tamper_callback: None,
        }
    }

    /// Set the callback run on every tampered request. Replaces any previous callback.
    pub fn with_tamper_callback<C>(mut self, callback: C) -> Self
    where
        C: TamperCallback + 'static,
    {
        self.tamper_callback = Some(Arc::new(callback));
        self
    }

    /// Retrieve the configuration.
    #[inline]
    pub fn config(&self) -> &ChecksumConfig {
        &self.config
    }

    /// Retrieve the shared configuration.
    #[inline]
    pub fn shared_config(&self) -> Arc<ChecksumConfig> {
        self.config.clone()
    }

    /// Retrieve the tamper callback, if any.
    #[inline]
    pub fn tamper_callback(&self) -> Option<Arc<dyn TamperCallback>> {
        self.tamper_callback.clone()
    }

    /// Make sure the tampered-link handler exists in `dispatcher`, registering the default
    /// access-denied handler if not. Safe to call repeatedly; returns true if a handler was
    /// registered by this call.
    pub fn install_default_handler<D>(&self, dispatcher: &mut D) -> bool
    where
        D: Dispatcher + ?Sized,
    {
        let id = self.config.tampered_handler();
        if dispatcher.has_handler(id) {
            return false;
        }

        debug!("Registering default tampered-link handler as {}", id);
        dispatcher.register_handler(id, access_denied_handler());
        true
    }

    /// Sign `base_url` with `extra_params` merged in. See [`sign_link`].
    pub fn sign<P>(&self, base_url: &str, extra_params: P) -> Result<String, LinkIntegrityError>
    where
        P: Into<ExtraParams>,
    {
        sign_link(&self.config, base_url, extra_params)
    }

    /// Sign a link back to the current request. See [`sign_self_link`].
    pub fn sign_self_link<R>(&self, request: &R, options: &SelfLinkOptions) -> Result<String, LinkIntegrityError>
    where
        R: RequestView + ?Sized,
    {
        sign_self_link(&self.config, request, options)
    }

    /// Verify the current request before it is dispatched.
    ///
    /// On [`VerificationOutcome::Tampered`], the dispatcher is told to run the tampered-link
    /// handler instead of the requested one and the tamper callback (if any) is run. On
    /// [`VerificationOutcome::Valid`], nothing is changed.
    ///
    /// # Errors
    /// Only a failing custom generator produces an error.
    pub fn verify_current_request<R, D>(
        &self,
        request: &R,
        dispatcher: &mut D,
    ) -> Result<VerificationOutcome, LinkIntegrityError>
    where
        R: RequestView + ?Sized,
        D: Dispatcher + ?Sized,
    {
        let (outcome, tampered) = check_request(&self.config, request)?;

        if let Some(tampered) = tampered {
            dispatcher.set_next_handler(&tampered.tampered_handler);
            if let Some(callback) = &self.tamper_callback {
                callback.on_tampered(&tampered);
            }
        }

        Ok(outcome)
    }

    /// A [`tower::Layer`] that verifies requests before they reach the wrapped service.
    pub fn layer(&self) -> LinkIntegrityLayer {
        LinkIntegrityLayer::new(self.clone())
    }
}

impl Debug for LinkIntegrity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("LinkIntegrity")
            .field("config", &self.config)
            .field("tamper_callback", &self.tamper_callback.is_some())
            .finish()
    }
}
