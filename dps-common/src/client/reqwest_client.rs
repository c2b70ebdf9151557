use super::{ClientIdentity, HttpRequest, HttpResponse};
use crate::BoxError;
use futures_util::future::BoxFuture;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower_service::Service;
use tracing::debug;

/// An HTTP backend built on [`reqwest`].
///
/// Requests without a [`ClientIdentity`] go through the default client.
/// Requests carrying one are sent through a client configured with that
/// identity; the most recently used identity's client is kept for reuse.
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    default: reqwest::Client,
    cached: Arc<Mutex<Option<(ClientIdentity, reqwest::Client)>>>,
}

impl ReqwestClient {
    /// Creates a backend with a default `reqwest` client.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Creates a backend sending unauthenticated-TLS requests via `client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestClient {
            default: client,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    fn client_for(&self, identity: Option<&ClientIdentity>) -> Result<reqwest::Client, BoxError> {
        let identity = match identity {
            Some(identity) => identity,
            None => return Ok(self.default.clone()),
        };

        let mut cached = self
            .cached
            .lock()
            .map_err(|_| "reqwest client cache poisoned")?;
        if let Some((cached_identity, client)) = cached.as_ref() {
            if cached_identity == identity {
                return Ok(client.clone());
            }
        }

        debug!("building client for new X.509 identity");
        let pem = format!(
            "{}\n{}",
            identity.certificate_chain(),
            identity.private_key()
        );
        let client = reqwest::Client::builder()
            .identity(reqwest::Identity::from_pem(pem.as_bytes())?)
            .build()?;
        *cached = Some((identity.clone(), client.clone()));
        Ok(client)
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<HttpRequest> for ReqwestClient {
    type Response = HttpResponse;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<HttpResponse, BoxError>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let client = self.client_for(request.extensions().get::<ClientIdentity>());

        Box::pin(async move {
            let client = client?;
            let request = reqwest::Request::try_from(request)?;
            let response = client.execute(request).await?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;

            let mut response = http::Response::new(body);
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> ClientIdentity {
        let (certificate, key) = match name {
            "dev-a" => (
                include_str!("../../tests/fixtures/dev-a.crt"),
                include_str!("../../tests/fixtures/dev-a.key"),
            ),
            _ => (
                include_str!("../../tests/fixtures/dev-b.crt"),
                include_str!("../../tests/fixtures/dev-b.key"),
            ),
        };
        ClientIdentity::from_pem(certificate, key)
    }

    fn cached_identity(backend: &ReqwestClient) -> Option<ClientIdentity> {
        let cached = backend.cached.lock().unwrap();
        cached.as_ref().map(|(identity, _)| identity.clone())
    }

    #[test]
    fn no_identity_uses_default_client() {
        let backend = ReqwestClient::new();

        assert!(backend.client_for(None).is_ok());
        assert_eq!(cached_identity(&backend), None);
    }

    #[test]
    fn identity_client_is_cached() {
        let backend = ReqwestClient::new();
        let dev_a = identity("dev-a");

        backend.client_for(Some(&dev_a)).unwrap();
        assert_eq!(cached_identity(&backend), Some(dev_a.clone()));

        backend.client_for(Some(&dev_a)).unwrap();
        assert_eq!(cached_identity(&backend), Some(dev_a));
    }

    #[test]
    fn cached_identity_is_not_parsed_again() {
        let backend = ReqwestClient::new();
        let unparsable = ClientIdentity::from_pem("not a certificate", "not a key");
        *backend.cached.lock().unwrap() = Some((unparsable.clone(), reqwest::Client::new()));

        assert!(backend.client_for(Some(&unparsable)).is_ok());
    }

    #[test]
    fn new_identity_replaces_cached_client() {
        let backend = ReqwestClient::new();
        let dev_a = identity("dev-a");
        let dev_b = identity("dev-b");

        backend.client_for(Some(&dev_a)).unwrap();
        backend.client_for(Some(&dev_b)).unwrap();
        assert_eq!(cached_identity(&backend), Some(dev_b));
    }

    #[test]
    fn invalid_pem_is_an_error() {
        let backend = ReqwestClient::new();
        let dev_a = identity("dev-a");
        backend.client_for(Some(&dev_a)).unwrap();

        let broken = ClientIdentity::from_pem("not a certificate", "not a key");
        assert!(backend.client_for(Some(&broken)).is_err());
        assert_eq!(cached_identity(&backend), Some(dev_a));
    }
}
