//! Registration clients for X.509 and symmetric key devices.
//!
//! Both clients gather credentials from their security client, build a
//! [`RegistrationRequest`] and hand it to a [`PollingStateMachine`]. A
//! client runs one registration at a time from the caller's point of view:
//! [`cancel`](X509Registration::cancel) always targets the most recent one.

use crate::polling::future::ResponseFuture;
use crate::polling::{CancelHandle, PollingStateMachine};
use crate::security::{SymmetricKeySecurityClient, X509SecurityClient};
use crate::transport::Transport;
use crate::types::{Authentication, RegistrationRequest, RegistrationResult};
use crate::BoxError;
use dps_common::error::ArgumentError;
use dps_common::sas::{expiry_from_now, DEFAULT_LIFETIME};
use pin_project_lite::pin_project;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tracing::debug;

pin_project! {
    /// A registration started by [`X509Registration`] or
    /// [`SymmetricKeyRegistration`].
    #[derive(Debug)]
    pub struct Registration<T>
    where
        T: Transport,
    {
        #[pin]
        kind: Kind<ResponseFuture<T>>,
    }
}

pin_project! {
    #[project = KindProj]
    #[derive(Debug)]
    enum Kind<F> {
        Polling {
            #[pin]
            future: F,
        },
        // credentials could not be produced, nothing was sent
        Rejected {
            error: Option<BoxError>,
        },
    }
}

impl<T> Registration<T>
where
    T: Transport,
{
    fn polling(future: ResponseFuture<T>) -> Self {
        Registration {
            kind: Kind::Polling { future },
        }
    }

    fn rejected(error: BoxError) -> Self {
        Registration {
            kind: Kind::Rejected { error: Some(error) },
        }
    }

    /// Returns a handle that cancels this registration, unless it was
    /// rejected before reaching the service.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        match &self.kind {
            Kind::Polling { future } => Some(future.cancel_handle()),
            Kind::Rejected { .. } => None,
        }
    }
}

impl<T> Future for Registration<T>
where
    T: Transport,
{
    type Output = Result<RegistrationResult, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().kind.project() {
            KindProj::Polling { future } => future.poll(cx),
            KindProj::Rejected { error } => {
                Poll::Ready(Err(error.take().expect("registration polled after completion")))
            }
        }
    }
}

#[derive(Debug)]
struct Client<T> {
    machine: PollingStateMachine<T>,
    provisioning_host: String,
    id_scope: String,
    payload: Option<Value>,
    product_info: Option<String>,
    current: Option<CancelHandle>,
}

impl<T> Client<T>
where
    T: Transport + Clone,
{
    fn new(provisioning_host: String, id_scope: String, transport: T) -> Self {
        Client {
            machine: PollingStateMachine::new(transport),
            provisioning_host,
            id_scope,
            payload: None,
            product_info: None,
            current: None,
        }
    }

    fn start<F>(&mut self, credentials: F) -> Registration<T>
    where
        F: FnOnce(&str) -> Result<(String, Authentication), BoxError>,
    {
        let request = credentials(&self.id_scope).and_then(|(registration_id, authentication)| {
            ArgumentError::require_non_empty("registration id", &registration_id)?;
            ArgumentError::require_non_empty("provisioning host", &self.provisioning_host)?;
            ArgumentError::require_non_empty("id scope", &self.id_scope)?;

            Ok(RegistrationRequest {
                registration_id,
                provisioning_host: self.provisioning_host.clone(),
                id_scope: self.id_scope.clone(),
                payload: self.payload.clone(),
                authentication,
                product_info: self.product_info.clone(),
            })
        });

        match request {
            Ok(request) => {
                debug!(registration_id = %request.registration_id, "starting registration");
                let future = self.machine.register(request);
                self.current = Some(future.cancel_handle());
                Registration::polling(future)
            }
            Err(error) => {
                // nothing started, so cancel() still targets the previous attempt
                debug!(%error, "registration rejected");
                Registration::rejected(error)
            }
        }
    }

    fn cancel(&self) -> bool {
        self.current.as_ref().map_or(false, CancelHandle::cancel)
    }
}

/// Registers a device that authenticates with an X.509 certificate.
#[derive(Debug)]
pub struct X509Registration<T, S> {
    client: Client<T>,
    security: S,
}

impl<T, S> X509Registration<T, S>
where
    T: Transport + Clone,
    S: X509SecurityClient,
{
    /// Creates a client registering through `transport` with the identity
    /// provided by `security`.
    pub fn new(
        provisioning_host: impl Into<String>,
        id_scope: impl Into<String>,
        transport: T,
        security: S,
    ) -> Self {
        X509Registration {
            client: Client::new(provisioning_host.into(), id_scope.into(), transport),
            security,
        }
    }

    /// Sets the interval between status queries when the service gives no
    /// hint.
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.client.machine = PollingStateMachine::with_default_interval(
            self.client.machine.into_inner(),
            interval,
        );
        self
    }

    /// Sends `payload` to the service's allocation logic with the next
    /// registration.
    pub fn set_provisioning_payload(&mut self, payload: Value) {
        self.client.payload = Some(payload);
    }

    /// Appends `product_info` to the user agent.
    pub fn set_product_info(&mut self, product_info: impl Into<String>) {
        self.client.product_info = Some(product_info.into());
    }

    /// Starts a registration.
    pub fn register(&mut self) -> Registration<T> {
        let security = &self.security;
        self.client.start(|_| {
            let registration_id = security.registration_id()?;
            let identity = security.certificate()?;
            Ok((registration_id, Authentication::X509(identity)))
        })
    }

    /// Cancels the registration in progress.
    ///
    /// Returns `false`, doing nothing, if no registration is in progress.
    pub fn cancel(&self) -> bool {
        self.client.cancel()
    }
}

/// Registers a device that authenticates with a symmetric key.
#[derive(Debug)]
pub struct SymmetricKeyRegistration<T, S> {
    client: Client<T>,
    security: S,
    token_lifetime: Duration,
}

impl<T, S> SymmetricKeyRegistration<T, S>
where
    T: Transport + Clone,
    S: SymmetricKeySecurityClient,
{
    /// Creates a client registering through `transport` with tokens signed
    /// by `security`.
    pub fn new(
        provisioning_host: impl Into<String>,
        id_scope: impl Into<String>,
        transport: T,
        security: S,
    ) -> Self {
        SymmetricKeyRegistration {
            client: Client::new(provisioning_host.into(), id_scope.into(), transport),
            security,
            token_lifetime: DEFAULT_LIFETIME,
        }
    }

    /// Sets the interval between status queries when the service gives no
    /// hint.
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.client.machine = PollingStateMachine::with_default_interval(
            self.client.machine.into_inner(),
            interval,
        );
        self
    }

    /// Sets how long the signatures created for each registration stay
    /// valid. Defaults to one hour.
    pub fn token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Sends `payload` to the service's allocation logic with the next
    /// registration.
    pub fn set_provisioning_payload(&mut self, payload: Value) {
        self.client.payload = Some(payload);
    }

    /// Appends `product_info` to the user agent.
    pub fn set_product_info(&mut self, product_info: impl Into<String>) {
        self.client.product_info = Some(product_info.into());
    }

    /// Starts a registration.
    pub fn register(&mut self) -> Registration<T> {
        let security = &self.security;
        let expiry = expiry_from_now(self.token_lifetime);
        self.client.start(|id_scope| {
            let registration_id = security.registration_id()?;
            let token = security.create_shared_access_signature(id_scope, expiry)?;
            Ok((registration_id, Authentication::SharedAccessSignature(token)))
        })
    }

    /// Cancels the registration in progress.
    ///
    /// Returns `false`, doing nothing, if no registration is in progress.
    pub fn cancel(&self) -> bool {
        self.client.cancel()
    }
}
