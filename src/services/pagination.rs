use std::future::Future;

use crate::error::AppResult;
use crate::services::github::{Page, FIRST_PAGE};

/// Follow a paginated listing from the first page until it runs out,
/// collecting every item in arrival order.
///
/// The first failing page aborts the walk and its error is returned as is;
/// items already collected are dropped.
pub async fn fetch_all<T, F, Fut>(mut fetch_page: F) -> AppResult<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page = FIRST_PAGE;

    loop {
        let Page { items: batch, next } = fetch_page(page).await?;
        log::debug!("Fetched {} items (page {})", batch.len(), page);
        items.extend(batch);

        match next {
            Some(next) if next > page => page = next,
            Some(next) => {
                log::warn!(
                    "Pagination cursor did not advance (page {} -> {}), stopping",
                    page,
                    next
                );
                break;
            }
            None => break,
        }
    }

    Ok(items)
}
