/// Selector for an in-page anchor link, or `None` when the link should keep
/// its default behaviour.
pub fn anchor_target(href: &str) -> Option<&str> {
    (href.starts_with('#') && href.len() > 1).then_some(href)
}

/// Whether the page should be forced to the top on load, countering the
/// browser's scroll restoration.
pub fn should_reset_scroll(location_hash: &str) -> bool {
    location_hash.is_empty() || location_hash == "#"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hash_is_not_a_target() {
        assert_eq!(anchor_target("#"), None);
        assert_eq!(anchor_target("#map-section"), Some("#map-section"));
        assert_eq!(anchor_target("/about"), None);
    }

    #[test]
    fn scroll_reset_only_without_fragment() {
        assert!(should_reset_scroll(""));
        assert!(should_reset_scroll("#"));
        assert!(!should_reset_scroll("#stats"));
    }
}
