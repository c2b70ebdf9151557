//! Future types

use super::CancelHandle;
use crate::error::{Canceled, MalformedResponse, RegistrationFailed, UnexpectedStatus};
use crate::transport::{Operation, Transport, TransportRequest, TransportResponse};
use crate::types::{OperationStatus, RegistrationRequest, RegistrationResult, RegistrationStatus};
use crate::BoxError;
use futures_core::ready;
use pin_project_lite::pin_project;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Sleep;
use tower_service::Service;
use tracing::{debug, trace};

pin_project! {
    /// The [`Future`] returned by a [`PollingStateMachine`], resolving once
    /// the registration reaches a terminal status, fails, or is canceled.
    ///
    /// Dropping the future before it resolves abandons the registration and
    /// disconnects the transport.
    ///
    /// [`PollingStateMachine`]: super::PollingStateMachine
    pub struct ResponseFuture<T>
    where
        T: Transport,
    {
        transport: T,
        request: RegistrationRequest,
        default_interval: Duration,
        cancel: CancelHandle,
        #[pin]
        state: State<T::Future>,
    }

    impl<T> PinnedDrop for ResponseFuture<T>
    where
        T: Transport,
    {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let State::Done = &*this.state {
                return;
            }

            // dropped before an outcome: nothing can be canceled any more
            this.cancel.cancel();
            debug!(registration_id = %this.request.registration_id, "registration dropped");
            this.transport.disconnect();
        }
    }
}

pin_project! {
    #[project = StateProj]
    enum State<F> {
        // Waiting for the transport to accept the next request.
        NotReady {
            operation: Operation,
        },
        // The registration request or a status query is in flight.
        Called {
            #[pin]
            future: F,
        },
        // Waiting out the retry interval before the next status query.
        Waiting {
            #[pin]
            sleep: Sleep,
            operation_id: String,
        },
        Done,
    }
}

enum Step {
    Complete(Result<RegistrationResult, BoxError>),
    Poll {
        operation_id: String,
        retry_after: Option<Duration>,
    },
}

impl<T> ResponseFuture<T>
where
    T: Transport,
{
    pub(crate) fn new(transport: T, request: RegistrationRequest, default_interval: Duration) -> Self {
        ResponseFuture {
            transport,
            request,
            default_interval,
            cancel: CancelHandle::new(),
            state: State::NotReady {
                operation: Operation::Register,
            },
        }
    }

    /// Returns a handle that cancels this registration.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl<T> Future for ResponseFuture<T>
where
    T: Transport,
{
    type Output = Result<RegistrationResult, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if let StateProj::Done = this.state.as_mut().project() {
            panic!("registration polled after completion");
        }

        if this.cancel.poll_canceled(cx) {
            debug!(registration_id = %this.request.registration_id, "registration canceled");
            // drops the pending timer or the in-flight request
            this.state.set(State::Done);
            this.transport.disconnect();
            return Poll::Ready(Err(Canceled::new().into()));
        }

        let outcome = loop {
            match this.state.as_mut().project() {
                StateProj::NotReady { operation } => {
                    if let Err(error) = ready!(this.transport.poll_ready(cx)) {
                        break Err(error);
                    }

                    let request = TransportRequest {
                        registration: this.request.clone(),
                        operation: mem::replace(operation, Operation::Register),
                    };
                    trace!(operation = ?request.operation, "sending request");
                    let future = this.transport.call(request);
                    this.state.set(State::Called { future });
                }
                StateProj::Called { future } => {
                    let response = match ready!(future.poll(cx)) {
                        Ok(response) => response,
                        Err(error) => {
                            debug!(%error, "transport failed");
                            break Err(error);
                        }
                    };

                    match step(response) {
                        Step::Complete(outcome) => break outcome,
                        Step::Poll {
                            operation_id,
                            retry_after,
                        } => {
                            let interval = retry_after.unwrap_or(*this.default_interval);
                            trace!(%operation_id, ?interval, "scheduling status query");
                            this.state.set(State::Waiting {
                                sleep: tokio::time::sleep(interval),
                                operation_id,
                            });
                        }
                    }
                }
                StateProj::Waiting {
                    sleep,
                    operation_id,
                } => {
                    ready!(sleep.poll(cx));

                    let operation_id = mem::take(operation_id);
                    this.state.set(State::NotReady {
                        operation: Operation::QueryStatus { operation_id },
                    });
                }
                StateProj::Done => unreachable!("checked before the loop"),
            }
        };

        this.state.set(State::Done);
        this.transport.disconnect();

        if !this.cancel.complete() {
            // cancel() already promised a `Canceled` outcome
            debug!(registration_id = %this.request.registration_id, "registration canceled");
            return Poll::Ready(Err(Canceled::new().into()));
        }

        Poll::Ready(outcome)
    }
}

fn step(response: TransportResponse) -> Step {
    let OperationStatus {
        operation_id,
        status,
        registration_state,
    } = response.status;
    debug!(%status, "registration status");

    match status {
        RegistrationStatus::Assigned => Step::Complete(registration_state.ok_or_else(|| {
            MalformedResponse::new("assigned registration without registration state").into()
        })),
        RegistrationStatus::Assigning => match operation_id {
            Some(operation_id) => Step::Poll {
                operation_id,
                retry_after: response.retry_after,
            },
            None => Step::Complete(Err(MalformedResponse::new(
                "assigning registration without operation id",
            )
            .into())),
        },
        RegistrationStatus::Failed | RegistrationStatus::Disabled => {
            Step::Complete(Err(RegistrationFailed::new(status, registration_state).into()))
        }
        status => Step::Complete(Err(UnexpectedStatus::new(status).into())),
    }
}

impl<T> fmt::Debug for ResponseFuture<T>
where
    T: Transport + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::NotReady { .. } => "NotReady",
            State::Called { .. } => "Called",
            State::Waiting { .. } => "Waiting",
            State::Done => "Done",
        };
        f.debug_struct("ResponseFuture")
            .field("transport", &self.transport)
            .field("registration_id", &self.request.registration_id)
            .field("state", &state)
            .finish()
    }
}
