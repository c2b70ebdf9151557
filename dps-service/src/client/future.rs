//! Future types

use dps_common::client::{HttpRequest, HttpResponse};
use dps_common::error::{BoxError, ServiceError};
use futures_core::ready;
use pin_project_lite::pin_project;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::util::Oneshot;
use tower_service::Service;
use tracing::debug;

pub(crate) type Decode<T> = fn(HttpResponse) -> Result<T, BoxError>;

pin_project! {
    /// Response future from [`ProvisioningServiceClient`] operations.
    ///
    /// [`ProvisioningServiceClient`]: super::ProvisioningServiceClient
    pub struct ResponseFuture<S, T>
    where
        S: Service<HttpRequest>,
    {
        #[pin]
        state: State<Oneshot<S, HttpRequest>, T>,
    }
}

pin_project! {
    #[project = StateProj]
    enum State<F, T> {
        Called {
            #[pin]
            future: F,
            decode: Decode<T>,
        },
        // the request could not be built, nothing was sent
        Failed {
            error: Option<BoxError>,
        },
    }
}

impl<S, T> ResponseFuture<S, T>
where
    S: Service<HttpRequest>,
{
    pub(crate) fn called(future: Oneshot<S, HttpRequest>, decode: Decode<T>) -> Self {
        ResponseFuture {
            state: State::Called { future, decode },
        }
    }

    pub(crate) fn failed(error: BoxError) -> Self {
        ResponseFuture {
            state: State::Failed { error: Some(error) },
        }
    }
}

impl<S, T> Future for ResponseFuture<S, T>
where
    S: Service<HttpRequest, Response = HttpResponse>,
    S::Error: Into<BoxError>,
{
    type Output = Result<T, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().state.project() {
            StateProj::Called { future, decode } => {
                let response = match ready!(future.poll(cx)) {
                    Ok(response) => response,
                    Err(error) => return Poll::Ready(Err(error.into())),
                };

                let status = response.status();
                debug!(%status, "received response");
                if !status.is_success() {
                    let error = ServiceError::from_response(status, response.headers(), response.body());
                    return Poll::Ready(Err(error.into()));
                }

                Poll::Ready((*decode)(response))
            }
            StateProj::Failed { error } => {
                Poll::Ready(Err(error.take().expect("polled after completion")))
            }
        }
    }
}

impl<S, T> fmt::Debug for ResponseFuture<S, T>
where
    S: Service<HttpRequest>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Called { .. } => "Called",
            State::Failed { .. } => "Failed",
        };
        f.debug_struct("ResponseFuture")
            .field("state", &state)
            .finish()
    }
}
