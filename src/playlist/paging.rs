use crate::model::Page;

/// Requests pages of `limit` items until the total reported by the first page is reached and
/// returns all items in page order.
///
/// Progress is measured in remote entries ([`Page::fetched`]), not in converted items, so a page
/// that holds only entries dropped during conversion does not end the paging early.
///
/// Only the first page's total counts. If the collection shrinks while we are paging, we stop at
/// the first empty page; if it grows, the additional items are not fetched. In any case, no more
/// than `ceil(total / limit) + 1` requests are made.
pub fn fetch_all_pages<T, E, F>(limit: u32, mut get_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(u32, u32) -> Result<Page<T>, E>,
{
    let limit = limit.max(1);
    let first_page = get_page(limit, 0)?;
    let total = first_page.total as usize;
    let max_requests = total.div_ceil(limit as usize) + 1;

    let mut fetched = first_page.fetched as usize;
    let mut last_page_was_empty = first_page.fetched == 0;
    let mut items = first_page.items;
    let mut requests = 1;
    let mut offset = limit;

    while fetched < total {
        if last_page_was_empty {
            warn!(
                "Expected {} entries, but received only {}: the collection probably changed \
                while paging.",
                total, fetched
            );
            break;
        }
        if requests >= max_requests {
            warn!("Stopping after {} requests with {} of {} entries.", requests, fetched, total);
            break;
        }
        let page = get_page(limit, offset)?;
        requests += 1;
        offset += limit;
        fetched += page.fetched as usize;
        last_page_was_empty = page.fetched == 0;
        items.extend(page.items);
    }

    debug!(
        "Fetched {} items from {} entries in {} requests.",
        items.len(),
        fetched,
        requests
    );
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_source(total: u32, available: usize) -> impl FnMut(u32, u32) -> Result<Page<usize>, ()> {
        move |limit, offset| {
            let start = (offset as usize).min(available);
            let end = (start + limit as usize).min(available);
            Ok(Page::new(total, (start..end).collect()))
        }
    }

    #[test]
    fn fetches_all_pages_in_order() {
        let mut offsets = vec![];
        let mut source = page_source(120, 120);
        let items = fetch_all_pages(50, |limit, offset| {
            offsets.push((limit, offset));
            source(limit, offset)
        })
        .unwrap();

        assert_eq!(offsets, vec![(50, 0), (50, 50), (50, 100)]);
        assert_eq!(items, (0..120).collect::<Vec<usize>>());
    }

    #[test]
    fn exact_multiple_of_page_size() {
        let mut calls = 0;
        let mut source = page_source(100, 100);
        let items = fetch_all_pages(50, |limit, offset| {
            calls += 1;
            source(limit, offset)
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(items.len(), 100);
    }

    #[test]
    fn zero_total_needs_a_single_request() {
        let mut calls = 0;
        let items: Vec<usize> = fetch_all_pages(50, |_, _| {
            calls += 1;
            Ok::<_, ()>(Page::new(0, vec![]))
        })
        .unwrap();

        assert_eq!(calls, 1);
        assert!(items.is_empty());
    }

    #[test]
    fn shrinking_collection_stops_at_empty_page() {
        // Reports 120 items, but only 60 are left by the time we page.
        let mut calls = 0;
        let mut source = page_source(120, 60);
        let items = fetch_all_pages(50, |limit, offset| {
            calls += 1;
            source(limit, offset)
        })
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(items, (0..60).collect::<Vec<usize>>());
    }

    #[test]
    fn later_totals_are_ignored() {
        let mut calls = 0;
        let items = fetch_all_pages(2, |limit, offset| {
            calls += 1;
            // The total grows with every request, only the first one counts.
            let total = 3 + offset;
            let items: Vec<u32> = (offset..offset + limit).collect();
            Ok::<_, ()>(Page::new(total, items))
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(items, vec![0, 1, 2, 3]);
    }

    #[test]
    fn requests_are_capped_when_pages_are_short() {
        // Every page returns a single item although 50 were requested.
        let mut calls = 0;
        let items = fetch_all_pages(50, |_, offset| {
            calls += 1;
            Ok::<_, ()>(Page::new(120, vec![offset]))
        })
        .unwrap();

        assert_eq!(calls, 4);
        assert_eq!(items, vec![0, 50, 100, 150]);
    }

    #[test]
    fn errors_are_propagated() {
        let result: Result<Vec<u32>, &str> = fetch_all_pages(50, |_, offset| {
            if offset == 0 {
                Ok(Page::new(80, (0..50).collect()))
            } else {
                Err("boom")
            }
        });

        assert_eq!(result, Err("boom"));
    }

    #[test]
    fn pages_without_convertible_entries_do_not_end_paging() {
        // 100 remote entries: the first 50 are dropped on conversion, the rest are real items.
        let mut calls = 0;
        let items = fetch_all_pages(50, |limit, offset| {
            calls += 1;
            let entries: Vec<u32> = (offset..(offset + limit).min(100)).collect();
            Ok::<_, ()>(Page {
                total: 100,
                fetched: entries.len() as u32,
                items: entries.into_iter().filter(|entry| *entry >= 50).collect(),
            })
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(items, (50..100).collect::<Vec<u32>>());
    }

    #[test]
    fn partially_dropped_pages_count_their_remote_entries() {
        // Every other entry is dropped, so 60 remote entries yield 30 items in two requests.
        let mut offsets = vec![];
        let items = fetch_all_pages(50, |limit, offset| {
            offsets.push(offset);
            let entries: Vec<u32> = (offset..(offset + limit).min(60)).collect();
            Ok::<_, ()>(Page {
                total: 60,
                fetched: entries.len() as u32,
                items: entries.into_iter().filter(|entry| entry % 2 == 0).collect(),
            })
        })
        .unwrap();

        assert_eq!(offsets, vec![0, 50]);
        assert_eq!(items.len(), 30);
    }
}
