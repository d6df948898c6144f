//! Values derived from user input: slugs, read time and form normalization.

/// Reading speed used by [`estimate_read_time`].
pub const WORDS_PER_MINUTE: usize = 200;

/// Derive a URL-safe slug from a post title.
///
/// The title is lower-cased and every character outside `[a-z0-9 -]` is
/// dropped. Runs of spaces and hyphens become a single hyphen and hyphens at
/// either end are trimmed. Two different titles can produce the same slug;
/// uniqueness is left to the store.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.to_lowercase().chars() {
        match ch {
            'a'..='z' | '0'..='9' => slug.push(ch),
            ' ' | '-' => {
                if !slug.is_empty() && !slug.ends_with('-') {
                    slug.push('-');
                }
            },
            _ => {},
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Estimated minutes to read `content`, never less than one.
pub fn estimate_read_time(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Trim and lower-case an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim optional text; blank input becomes `None`.
pub fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Append a trimmed tag unless it is blank or already present.
///
/// Returns whether the list changed.
pub fn add_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let tag = tag.trim();
    if tag.is_empty() || tags.iter().any(|existing| existing == tag) {
        return false;
    }
    tags.push(tag.to_string());
    true
}

/// Remove every exact occurrence of `tag`. Returns whether the list changed.
pub fn remove_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let before = tags.len();
    tags.retain(|existing| existing != tag);
    tags.len() != before
}

/// Build a clean tag list: trimmed, no blanks, first occurrence wins.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cleaned = Vec::new();
    for tag in tags {
        add_tag(&mut cleaned, tag.as_ref());
    }
    cleaned
}
