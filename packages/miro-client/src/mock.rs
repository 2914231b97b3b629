//! Mock page source for testing.
//!
//! Replays a scripted sequence of pages and errors, one per request, and
//! records the cursor each request was made with.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{MiroError, Result};
use crate::pagination::PageSource;
use crate::types::{Cursor, Page, Record};

/// Scripted [`PageSource`].
///
/// # Example
///
/// ```rust
/// use miro_client::mock::MockPageSource;
/// use miro_client::{Member, MiroError};
///
/// let mock = MockPageSource::<Member>::new()
///     .with_page(vec![], Some("next"))
///     .with_error(MiroError::RateLimited { retry_after: None })
///     .with_page(vec![], None);
/// ```
pub struct MockPageSource<T> {
    /// Responses served in order
    script: Arc<Mutex<VecDeque<Result<Page<T>>>>>,
    /// Cursor of every request, for verification
    calls: Arc<Mutex<Vec<Option<String>>>>,
}

impl<T> MockPageSource<T> {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a page (builder pattern).
    pub fn with_page(self, items: Vec<T>, next: Option<&str>) -> Self {
        self.push(Ok(Page::new(items, next.map(str::to_string))));
        self
    }

    /// Queue an error response (builder pattern).
    pub fn with_error(self, err: MiroError) -> Self {
        self.push(Err(err));
        self
    }

    /// Queue a response.
    pub fn push(&self, response: Result<Page<T>>) {
        self.script.lock().unwrap().push_back(response);
    }

    /// Number of requests made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Cursors that were requested, `None` for the first page.
    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Responses not yet served.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl<T> Default for MockPageSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MockPageSource<T> {
    fn clone(&self) -> Self {
        Self {
            script: Arc::clone(&self.script),
            calls: Arc::clone(&self.calls),
        }
    }
}

#[async_trait]
impl<T> PageSource for MockPageSource<T>
where
    T: Record + Send + 'static,
{
    type Item = T;

    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<Page<T>> {
        self.calls
            .lock()
            .unwrap()
            .push(cursor.map(|c| c.as_str().to_string()));

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MiroError::Config("mock script exhausted".into())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
