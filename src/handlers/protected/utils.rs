use crate::config::ApiConfig;
use crate::database::Page;

/// Leading-integer parse: optional whitespace and sign, then digits up to the
/// first non-digit. `"20abc"` is 20, `"abc"` is `None`.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }

    // Saturate instead of failing on absurdly long inputs.
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// Resolve `limit`/`offset` query values. Anything missing, unparseable or out
/// of range falls back to the default instead of failing the request.
pub fn parse_page(limit: Option<&str>, offset: Option<&str>, api: &ApiConfig) -> Page {
    let limit = limit
        .and_then(parse_leading_int)
        .filter(|l| *l >= 1)
        .unwrap_or(api.default_limit)
        .min(api.max_limit);

    // Keep `offset + limit` representable.
    let offset = offset
        .and_then(parse_leading_int)
        .filter(|o| *o >= 0)
        .unwrap_or(0)
        .min(i64::MAX.saturating_sub(api.max_limit));

    Page { limit, offset }
}
