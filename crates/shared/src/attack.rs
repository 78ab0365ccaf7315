/// Trim surrounding whitespace from a secret before it is stored or matched.
pub fn normalize_secret(secret: &str) -> &str {
    secret.trim()
}

/// True if `secret` appears in `response` as a whole word, ignoring case.
///
/// A match needs a non-alphanumeric character (or the string edge) on both
/// sides, so "cat" is not revealed by "concatenate". Empty secrets never match.
pub fn secret_revealed(response: &str, secret: &str) -> bool {
    let secret = normalize_secret(secret).to_lowercase();
    if secret.is_empty() {
        return false;
    }
    let haystack = response.to_lowercase();

    let mut from = 0;
    while let Some(offset) = haystack[from..].find(&secret) {
        let start = from + offset;
        let end = start + secret.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        // step one char forward so overlapping candidates are still checked
        from = start
            + haystack[start..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
    }
    false
}
