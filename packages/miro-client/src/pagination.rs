//! Cursor pagination over Miro listing endpoints.
//!
//! A [`Paginator`] turns a [`PageSource`] into a lazy, finite stream of
//! pages. Requests are strictly sequential: the cursor for page N+1 only
//! exists once page N has been read. [`fetch_all`] folds that stream into
//! one `Vec`, preserving vendor order.

use std::collections::HashSet;
use std::pin::Pin;

use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};

use crate::error::{MiroError, PageError, Result};
use crate::retry::{fetch_with_retry, RetryPolicy};
use crate::types::{Cursor, Page, Record};

/// Stream of pages produced by a [`Paginator`].
pub type PageStream<T> = Pin<Box<dyn Stream<Item = std::result::Result<Page<T>, PageError>> + Send>>;

/// A paged listing endpoint.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Record + Send + 'static;

    /// Fetch a single page. `None` requests the first page.
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<Page<Self::Item>>;

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Walks a [`PageSource`] from the first page to the last.
pub struct Paginator<S: PageSource> {
    source: S,
    policy: RetryPolicy,
}

impl<S: PageSource + 'static> Paginator<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Consume the paginator into a stream of pages.
    ///
    /// The stream ends after the page without a continuation cursor, or
    /// right after yielding the first error.
    pub fn into_stream(self) -> PageStream<S::Item> {
        let Self { source, policy } = self;

        Box::pin(stream! {
            let mut cursor: Option<Cursor> = None;
            let mut page_number = 0usize;
            let mut offset = 0usize;

            loop {
                page_number += 1;

                let page = match fetch_with_retry(&source, &policy, cursor.as_ref()).await {
                    Ok(page) => page,
                    Err(source_err) => {
                        yield Err(PageError { page: page_number, offset, source: source_err });
                        return;
                    }
                };

                if page.next.is_some() && page.next == cursor {
                    yield Err(PageError {
                        page: page_number,
                        offset,
                        source: MiroError::Malformed(format!(
                            "cursor did not advance ({})",
                            page.next.as_ref().map(Cursor::as_str).unwrap_or_default()
                        )),
                    });
                    return;
                }

                tracing::debug!(
                    source = source.name(),
                    page = page_number,
                    items = page.items.len(),
                    has_next = page.next.is_some(),
                    "Fetched page"
                );

                offset += page.items.len();
                cursor = page.next.clone();
                let done = cursor.is_none();

                yield Ok(page);

                if done {
                    break;
                }
            }
        })
    }
}

/// Fetch every record from `source`, in page order.
///
/// Fails without returning partial results if any page cannot be fetched.
pub async fn fetch_all<S>(source: S, policy: RetryPolicy) -> std::result::Result<Vec<S::Item>, PageError>
where
    S: PageSource + 'static,
{
    let name = source.name().to_string();

    let (records, _) = Paginator::new(source, policy)
        .into_stream()
        .try_fold(
            (Vec::new(), HashSet::new()),
            |(mut records, mut seen), page| async move {
                for item in page.items {
                    if !seen.insert(item.id().to_string()) {
                        tracing::warn!(id = item.id(), "Duplicate record id across pages");
                    }
                    records.push(item);
                }
                Ok((records, seen))
            },
        )
        .await?;

    tracing::info!(source = %name, count = records.len(), "Fetched all records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPageSource;
    use crate::types::Member;
    use futures::StreamExt;
    use std::time::Duration;

    fn member(id: &str) -> Member {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "email": format!("{}@example.com", id),
            "active": true,
            "license": "full"
        }))
        .unwrap()
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_base_delay(Duration::ZERO)
            .with_max_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_page_order() {
        let mock = MockPageSource::new()
            .with_page(vec![member("a"), member("b")], Some("c1"))
            .with_page(vec![member("c"), member("d")], Some("c2"))
            .with_page(vec![member("e")], None);

        let records = fetch_all(mock.clone(), fast_policy()).await.unwrap();

        let ids: Vec<&str> = records.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(mock.calls(), vec![None, Some("c1".to_string()), Some("c2".to_string())]);
    }

    #[tokio::test]
    async fn test_single_empty_page_yields_nothing() {
        let mock = MockPageSource::<Member>::new().with_page(vec![], None);

        let records = fetch_all(mock.clone(), fast_policy()).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_transparent() {
        let throttled = MockPageSource::new()
            .with_page(vec![member("a")], Some("c1"))
            .with_error(MiroError::RateLimited { retry_after: None })
            .with_error(MiroError::RateLimited {
                retry_after: Some(Duration::from_secs(30)),
            })
            .with_page(vec![member("b")], None);
        let clean = MockPageSource::new()
            .with_page(vec![member("a")], Some("c1"))
            .with_page(vec![member("b")], None);

        let with_throttling = fetch_all(throttled.clone(), fast_policy()).await.unwrap();
        let without = fetch_all(clean, fast_policy()).await.unwrap();

        assert_eq!(with_throttling, without);
        // Throttled requests retry the same cursor
        assert_eq!(
            throttled.calls(),
            vec![
                None,
                Some("c1".to_string()),
                Some("c1".to_string()),
                Some("c1".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_budget_is_bounded() {
        let mock = MockPageSource::<Member>::new()
            .with_page(vec![member("a"), member("b")], Some("c1"))
            .with_error(MiroError::RateLimited { retry_after: None })
            .with_error(MiroError::RateLimited { retry_after: None })
            .with_error(MiroError::RateLimited { retry_after: None });
        let policy = fast_policy().with_rate_limit_retries(2);

        let err = fetch_all(mock.clone(), policy).await.unwrap_err();

        assert!(matches!(err.source, MiroError::RateLimited { .. }));
        assert_eq!(err.page, 2);
        assert_eq!(err.offset, 2);
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let mock = MockPageSource::<Member>::new().with_error(MiroError::Auth {
            status: 401,
            message: "token expired".into(),
        });

        let err = fetch_all(mock.clone(), fast_policy()).await.unwrap_err();

        assert!(matches!(err.source, MiroError::Auth { status: 401, .. }));
        assert_eq!(err.page, 1);
        assert_eq!(err.offset, 0);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_retried_then_surfaced() {
        let recovering = MockPageSource::new()
            .with_error(MiroError::Transport("connection reset".into()))
            .with_page(vec![member("a")], None);
        let records = fetch_all(recovering, fast_policy()).await.unwrap();
        assert_eq!(records.len(), 1);

        let failing = MockPageSource::<Member>::new()
            .with_error(MiroError::Transport("connection reset".into()))
            .with_error(MiroError::Transport("connection reset".into()))
            .with_error(MiroError::Transport("connection reset".into()));
        let err = fetch_all(failing.clone(), fast_policy()).await.unwrap_err();
        assert!(err.source.is_transport_class());
        assert_eq!(failing.call_count(), 3);
    }

    #[tokio::test]
    async fn test_malformed_page_fails_without_partial_results() {
        let mock = MockPageSource::new()
            .with_page(vec![member("a"), member("b")], Some("c1"))
            .with_error(MiroError::Malformed("missing field `data`".into()));

        let err = fetch_all(mock.clone(), fast_policy()).await.unwrap_err();

        assert!(err.source.is_transport_class());
        assert_eq!(err.page, 2);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_stalled_cursor_is_malformed() {
        let mock = MockPageSource::new()
            .with_page(vec![member("a")], Some("same"))
            .with_page(vec![member("b")], Some("same"));

        let err = fetch_all(mock, fast_policy()).await.unwrap_err();

        assert!(matches!(err.source, MiroError::Malformed(_)));
        assert_eq!(err.page, 2);
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let mock = MockPageSource::new()
            .with_page(vec![member("a")], Some("c1"))
            .with_page(vec![member("b")], None);

        let mut pages = Paginator::new(mock.clone(), fast_policy()).into_stream();
        assert_eq!(mock.call_count(), 0);

        let first = pages.next().await.unwrap().unwrap();
        assert_eq!(first.items.len(), 1);
        assert_eq!(mock.call_count(), 1);

        let second = pages.next().await.unwrap().unwrap();
        assert!(second.is_last());
        assert!(pages.next().await.is_none());
        assert_eq!(mock.call_count(), 2);
    }
}
