/// Rows per printed page.
pub const PAGE_SIZE: usize = 10;

/// Inserted between printed pages, never after the last one.
pub const PAGE_BREAK: &str = r#"<div style="page-break-after: always;"></div>"#;

/// Splits rows into pages in their original order. There is always at least
/// one page so an invoice without rows still prints its table and totals.
/// A zero page size means the default.
pub fn paginate<T>(items: &[T], page_size: usize) -> Vec<&[T]> {
    let page_size = if page_size == 0 { PAGE_SIZE } else { page_size };
    if items.is_empty() {
        return vec![items];
    }
    items.chunks(page_size).collect()
}

#[cfg(test)]
mod paginate_tests {
    use super::*;

    #[test]
    fn empty_list_is_one_empty_page() {
        let pages = paginate::<u32>(&[], PAGE_SIZE);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
    }

    #[test]
    fn last_page_is_shorter() {
        let items: Vec<usize> = (0..23).collect();
        let pages = paginate(&items, PAGE_SIZE);
        let sizes: Vec<usize> = pages.iter().map(|page| page.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert_eq!(pages.concat(), items);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_page() {
        let items: Vec<usize> = (0..20).collect();
        assert_eq!(paginate(&items, 10).len(), 2);
        assert_eq!(paginate(&items, 0).len(), 2);
        assert_eq!(paginate(&items[..1], 10).len(), 1);
    }
}
