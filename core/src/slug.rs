//! Key derivation and label normalization.

/// Maximum length of a generated key.
pub const MAX_KEY_LEN: usize = 64;

/// Key used when a title contains no usable characters.
pub const FALLBACK_KEY: &str = "field";

const KEY_STOPWORDS: &[&str] = &[
    "a", "an", "the", "are", "is", "was", "were", "do", "does", "did", "you", "your", "yours",
    "have", "has", "had", "under", "currently", "of", "for", "to", "please", "any", "in", "on",
    "at", "if", "with", "by", "this", "that", "my", "i", "me", "be", "been", "being",
];

const KEY_MAX_TOKENS: usize = 6;

/// Converts arbitrary text into a slug key.
///
/// Lowercases ASCII letters, replaces every other character with `_`,
/// collapses runs of underscores, and trims them from both ends. The result
/// is at most [`MAX_KEY_LEN`] characters; empty input yields
/// [`FALLBACK_KEY`]. Applying `slugify` to its own output is a no-op.
///
/// # Examples
///
/// ```
/// use form_schema_core::slugify;
///
/// assert_eq!(slugify("Marital Status"), "marital_status");
/// assert_eq!(slugify("  Work Phone #  "), "work_phone");
/// assert_eq!(slugify(&slugify("E-mail Address")), slugify("E-mail Address"));
/// assert_eq!(slugify("???"), "field");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if slug.len() > MAX_KEY_LEN {
        slug.truncate(MAX_KEY_LEN);
        while slug.ends_with('_') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        FALLBACK_KEY.to_string()
    } else {
        slug
    }
}

/// Derives a compact field key from a human-readable title.
///
/// Drops possessives and common function words, keeps at most six
/// remaining tokens, then slugifies. Falls back to [`slugify`] of the whole
/// title when nothing survives.
///
/// # Examples
///
/// ```
/// use form_schema_core::derive_key;
///
/// assert_eq!(derive_key("Are you under a physician's care now?"), "physician_care_now");
/// assert_eq!(derive_key("Marital Status"), "marital_status");
/// assert_eq!(derive_key("Apt"), "apt");
/// ```
pub fn derive_key(title: &str) -> String {
    let tokens: Vec<String> = title
        .split(|c: char| c.is_whitespace() || c == '/' || c == '-')
        .map(strip_possessive)
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|token| !token.is_empty())
        .filter(|token| !KEY_STOPWORDS.contains(&token.as_str()))
        .take(KEY_MAX_TOKENS)
        .collect();

    if tokens.is_empty() {
        return slugify(title);
    }
    slugify(&tokens.join(" "))
}

fn strip_possessive(token: &str) -> &str {
    let token = token.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '’');
    token
        .strip_suffix("'s")
        .or_else(|| token.strip_suffix("’s"))
        .unwrap_or(token)
}

/// Normalizes a label for comparison.
///
/// Lowercases, turns punctuation and underscores into spaces, and collapses
/// whitespace. Two labels that differ only in case, punctuation, or spacing
/// normalize to the same string.
///
/// # Examples
///
/// ```
/// use form_schema_core::normalize_label;
///
/// assert_eq!(normalize_label("  High Blood-Pressure "), "high blood pressure");
/// assert_eq!(normalize_label("first_name"), "first name");
/// ```
pub fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
