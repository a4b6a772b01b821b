//! Numeric page-range parsing for the split/extract workflow.

use crate::error::PageDeckError;
use std::collections::BTreeSet;

/// Parse a page selection like `"1-3, 5, 8-10"` against a document with
/// `page_count` pages.
///
/// Tokens are 1-based; the result is 0-based, deduplicated and ascending.
/// Out-of-bounds numbers and malformed tokens are dropped rather than
/// rejected, so a selection like `"2,99"` on a 6-page document still yields
/// page 2. Only a selection with nothing valid left is an error.
pub fn parse_ranges(input: &str, page_count: u32) -> Result<Vec<u32>, PageDeckError> {
    let mut pages = BTreeSet::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match token.split_once('-') {
            Some((start, end)) => {
                let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>())
                else {
                    continue;
                };
                if start == 0 || start > end {
                    continue;
                }
                for page in start..=end.min(page_count) {
                    pages.insert(page - 1);
                }
            }
            None => {
                let Ok(page) = token.parse::<u32>() else {
                    continue;
                };
                if page >= 1 && page <= page_count {
                    pages.insert(page - 1);
                }
            }
        }
    }

    if pages.is_empty() {
        return Err(PageDeckError::NoPagesSelected);
    }

    Ok(pages.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_page() {
        assert_eq!(parse_ranges("5", 6).unwrap(), vec![4]);
    }

    #[test]
    fn test_range_and_single() {
        assert_eq!(parse_ranges("1-3,5", 6).unwrap(), vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_degenerate_range() {
        assert_eq!(parse_ranges("2-2", 6).unwrap(), vec![1]);
    }

    #[test]
    fn test_out_of_bounds_dropped() {
        assert!(matches!(
            parse_ranges("10", 6),
            Err(PageDeckError::NoPagesSelected)
        ));
        assert_eq!(parse_ranges("2,99", 6).unwrap(), vec![1]);
    }

    #[test]
    fn test_range_clamped_to_document() {
        assert_eq!(parse_ranges("5-20", 6).unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_duplicates_merged() {
        assert_eq!(parse_ranges("1-3, 2-4", 6).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(parse_ranges(" 1 - 2 , 4 ", 6).unwrap(), vec![0, 1, 3]);
    }

    #[test]
    fn test_malformed_tokens_dropped() {
        assert_eq!(parse_ranges("abc, 3, 5-x", 6).unwrap(), vec![2]);
    }

    #[test]
    fn test_reversed_range_dropped() {
        assert!(parse_ranges("5-2", 6).is_err());
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(
            parse_ranges("", 6),
            Err(PageDeckError::NoPagesSelected)
        ));
        assert!(parse_ranges(" , , ", 6).is_err());
    }

    #[test]
    fn test_split_scenario_from_ten_pages() {
        assert_eq!(parse_ranges("1-2,9-10", 10).unwrap(), vec![0, 1, 8, 9]);
    }

    proptest::proptest! {
        #[test]
        fn prop_result_sorted_unique_in_bounds(
            input in "[0-9,\\- ]{0,24}",
            count in 1u32..64,
        ) {
            if let Ok(pages) = parse_ranges(&input, count) {
                proptest::prop_assert!(!pages.is_empty());
                proptest::prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
                proptest::prop_assert!(pages.iter().all(|&p| p < count));
            }
        }
    }
}
