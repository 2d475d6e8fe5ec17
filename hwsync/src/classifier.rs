use hwsync_store::SiteCategory;

/// Classify a page by hostname. Total and deterministic: anything outside
/// the supported sites is `Miscellaneous`.
pub fn classify(hostname: &str) -> SiteCategory {
    if hostname.contains("gradescope") {
        SiteCategory::Gradescope
    } else if hostname.contains("courseworks") {
        SiteCategory::Courseworks
    } else {
        SiteCategory::Miscellaneous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_hostnames() {
        assert_eq!(classify("www.gradescope.com"), SiteCategory::Gradescope);
        assert_eq!(
            classify("courseworks2.columbia.edu"),
            SiteCategory::Courseworks
        );
    }

    #[test]
    fn unknown_hostnames_fall_back() {
        assert_eq!(classify("example.com"), SiteCategory::Miscellaneous);
        assert_eq!(classify(""), SiteCategory::Miscellaneous);
        assert_eq!(classify("accounts.google.com"), SiteCategory::Miscellaneous);
    }
}
