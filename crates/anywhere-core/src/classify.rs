use crate::Classification;

/// Decide whether raw input names a website or is a search query.
///
/// A heuristic, not a validator: every string gets an answer and the text is
/// taken exactly as typed, surrounding whitespace included.
pub fn classify(text: &str) -> Classification {
    if text.starts_with("http://") || text.starts_with("https://") {
        return Classification::Address;
    }
    if text.starts_with("www.") {
        return Classification::Address;
    }
    if looks_like_host(text) {
        return Classification::Address;
    }
    Classification::Query
}

fn looks_like_host(text: &str) -> bool {
    if !text.contains('.') || text.chars().any(char::is_whitespace) {
        return false;
    }
    text.split('.').filter(|segment| !segment.is_empty()).count() >= 2
}
