use std::sync::Arc;
use std::time::Duration;

use watch_core::{Item, ResourceRef, Session};
use watch_logging::{watch_debug, watch_warn};

use crate::{FailureKind, FetchError, PageCursor, PageSource};

/// Pause between consecutive page requests. Upstream throttles faster callers.
pub const PAGE_DELAY: Duration = Duration::from_secs(1);

/// Walks every page of a post's comments, sequentially, up to an item cap.
#[derive(Clone)]
pub struct PaginatedFetcher {
    source: Arc<dyn PageSource>,
    page_delay: Duration,
}

impl PaginatedFetcher {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            page_delay: PAGE_DELAY,
        }
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Validates `reference` before any request is made.
    pub async fn fetch_all(
        &self,
        reference: &str,
        session: &Session,
        item_cap: usize,
    ) -> Result<Vec<Item>, FetchError> {
        let resource = ResourceRef::parse(reference)
            .map_err(|err| FetchError::new(FailureKind::InvalidReference, err.to_string()))?;
        self.fetch_resource(&resource, session, item_cap).await
    }

    /// Returns at most `item_cap` items, in upstream order.
    pub async fn fetch_resource(
        &self,
        resource: &ResourceRef,
        session: &Session,
        item_cap: usize,
    ) -> Result<Vec<Item>, FetchError> {
        let mut items = Vec::new();
        if item_cap == 0 {
            return Ok(items);
        }

        let mut cursor = PageCursor::start();
        let mut pages = 0usize;
        loop {
            let page = self
                .source
                .fetch_page(resource.code(), cursor.end_cursor.as_deref(), session)
                .await?;
            pages += 1;
            watch_debug!(
                "{}: page {} returned {} items (has_more={})",
                resource,
                pages,
                page.items.len(),
                page.next.has_more
            );
            items.extend(page.items);
            cursor = page.next;

            if !cursor.has_more || items.len() >= item_cap {
                break;
            }
            if cursor.end_cursor.is_none() {
                watch_warn!(
                    "{}: upstream reported more pages without a cursor; stopping after page {}",
                    resource,
                    pages
                );
                break;
            }
            tokio::time::sleep(self.page_delay).await;
        }

        items.truncate(item_cap);
        Ok(items)
    }
}
