//! Cursor-based pagination over the list endpoints.
//!
//! The list operations all share one shape: POST an envelope, read the items
//! from one response field, read an opaque continuation cursor from another,
//! and repeat with the cursor injected into the content body until the cursor
//! is absent. The field names differ per endpoint (`NextToken` vs `marker`),
//! so they are carried in a [`PageSpec`].

use std::collections::VecDeque;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SsoError};
use crate::payload::ApiPayload;
use crate::session::Session;

/// Response field names a list endpoint pages with.
pub(crate) struct PageSpec {
    pub(crate) items_key: &'static str,
    pub(crate) cursor_key: &'static str,
}

/// Lazy, forward-only iterator over the items of a paginated list call.
///
/// One page is fetched per advance past the buffered items; each page's items
/// are yielded in response order before the next page is requested. The
/// sequence is not restartable and performs no de-duplication: item order and
/// multiplicity are whatever the remote service returns.
pub(crate) struct Paginator<'a> {
    session: &'a Session,
    url: String,
    build: Box<dyn Fn(Option<&str>) -> Result<ApiPayload> + 'a>,
    spec: PageSpec,
    buffer: VecDeque<Value>,
    cursor: Option<String>,
    exhausted: bool,
}

impl<'a> Paginator<'a> {
    /// Creates a paginator.
    ///
    /// `build` produces the envelope for one page; it receives the cursor
    /// returned by the previous page, or `None` for the first page, and is
    /// responsible for injecting it into the content body under the request
    /// key the endpoint expects.
    pub(crate) fn new(
        session: &'a Session,
        url: String,
        spec: PageSpec,
        build: Box<dyn Fn(Option<&str>) -> Result<ApiPayload> + 'a>,
    ) -> Self {
        Self {
            session,
            url,
            build,
            spec,
            buffer: VecDeque::new(),
            cursor: None,
            exhausted: false,
        }
    }

    fn fetch_page(&mut self) -> Result<()> {
        let payload = (self.build)(self.cursor.as_deref())?;
        debug!(
            operation = payload.operation(),
            url = %self.url,
            "fetching page"
        );
        let response = self.session.post(&self.url, &payload)?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(SsoError::api(status, &text));
        }
        let body: Value = serde_json::from_str(&text)?;
        if let Some(items) = body.get(self.spec.items_key).and_then(Value::as_array) {
            self.buffer.extend(items.iter().cloned());
        }
        self.cursor = body
            .get(self.spec.cursor_key)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_owned);
        if self.cursor.is_none() {
            self.exhausted = true;
        }
        Ok(())
    }
}

impl Iterator for Paginator<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.exhausted {
                return None;
            }
            if let Err(err) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
    }
}
