use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated dashboard uids.
pub const SHORT_UID_LEN: usize = 9;

/// Derives a URL slug from a dashboard title.
///
/// Lowercases ASCII letters, keeps alphanumerics, and collapses every run of
/// other characters into a single `-`. Leading and trailing separators are
/// dropped.
///
/// # Examples
///
/// ```
/// use dashalert_common::text::slugify;
///
/// assert_eq!(slugify("dashboard with alerts"), "dashboard-with-alerts");
/// assert_eq!(slugify("  CPU / Memory  "), "cpu-memory");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_sep = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// Generates a random alphanumeric uid of [`SHORT_UID_LEN`] characters.
pub fn short_uid() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_UID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("--lead"), "lead");
        assert_eq!(slugify("trail!!"), "trail");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn short_uid_has_expected_shape() {
        let uid = short_uid();
        assert_eq!(uid.len(), SHORT_UID_LEN);
        assert!(uid.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(uid, short_uid());
    }
}
