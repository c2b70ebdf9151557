//! Paged queries.

use crate::client::ProvisioningServiceClient;
use crate::model::{QueryResult, QuerySpecification};
use dps_common::client::{HttpRequest, HttpResponse};
use dps_common::error::BoxError;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use tower_service::Service;
use tracing::trace;

/// A query whose results are fetched one page at a time.
///
/// Created by the `query_*` methods of [`ProvisioningServiceClient`]. The
/// query keeps the continuation token between pages, so it can be stored
/// and resumed later; [`set_continuation_token`](Query::set_continuation_token)
/// resumes from a token saved elsewhere.
pub struct Query<T> {
    path: String,
    specification: QuerySpecification,
    page_size: Option<u32>,
    continuation_token: Option<String>,
    has_next: bool,
    _items: PhantomData<fn() -> T>,
}

impl<T> Query<T> {
    pub(crate) fn new(path: String, specification: QuerySpecification) -> Self {
        Query {
            path,
            specification,
            page_size: None,
            continuation_token: None,
            has_next: true,
            _items: PhantomData,
        }
    }

    /// Limits the number of items per page. The service picks the page size
    /// when unset or zero.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// The query being run.
    pub fn specification(&self) -> &QuerySpecification {
        &self.specification
    }

    /// The requested page size.
    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Token of the next page, if the service returned one.
    pub fn continuation_token(&self) -> Option<&str> {
        self.continuation_token.as_deref()
    }

    /// Resumes the query from `token`, or restarts it when `None`.
    pub fn set_continuation_token(&mut self, token: Option<String>) {
        self.continuation_token = token;
        self.has_next = true;
    }

    /// Returns `false` once the last page was fetched.
    pub fn has_more_results(&self) -> bool {
        self.has_next
    }
}

impl<T> Query<T>
where
    T: DeserializeOwned,
{
    /// Fetches the next page, or `None` if the last page was already
    /// fetched.
    ///
    /// A failed request leaves the query where it was, so the same page can
    /// be asked for again.
    pub async fn next<S>(
        &mut self,
        client: &ProvisioningServiceClient<S>,
    ) -> Result<Option<QueryResult<T>>, BoxError>
    where
        S: Service<HttpRequest, Response = HttpResponse> + Clone,
        S::Error: Into<BoxError>,
    {
        if !self.has_next {
            return Ok(None);
        }

        let page = client
            .query_page(
                &self.path,
                &self.specification,
                self.page_size,
                self.continuation_token.as_deref(),
            )
            .await?;
        trace!(items = page.items.len(), more = page.continuation_token.is_some(), "query page");

        self.continuation_token = page.continuation_token.clone();
        self.has_next = self.continuation_token.is_some();
        Ok(Some(page))
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("path", &self.path)
            .field("specification", &self.specification)
            .field("page_size", &self.page_size)
            .field("continuation_token", &self.continuation_token)
            .field("has_next", &self.has_next)
            .finish()
    }
}
