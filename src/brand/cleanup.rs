use regex::Regex;
use std::sync::LazyLock;

static SEPARATORS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_.]+").unwrap());
static REPEATED_HYPHENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

static YEAR_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{4}-\d{4}\b").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\d{4}\b").unwrap());
static NUMERIC_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_]\d+$").unwrap());
static PARENTHESES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(.*?\)").unwrap());
static BRACKETS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\[.*?\]").unwrap());

static VERSION_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^v\d+$").unwrap());
static HASH_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-f0-9]{8,}$").unwrap());

/// Removal patterns, applied in this order.
static SUFFIX_PATTERNS: LazyLock<[&'static Regex; 5]> = LazyLock::new(|| {
    [
        &*YEAR_RANGE_RE,
        &*YEAR_RE,
        &*NUMERIC_ID_RE,
        &*PARENTHESES_RE,
        &*BRACKETS_RE,
    ]
});

/// Tokens that scraped logo sites append to brand names.
pub const NOISE_WORDS: &[&str] = &[
    "logo", "vector", "download", "sign", "eps", "art", "png", "jpg", "jpeg", "black", "white",
    "icon", "button", "racing", "team", "group", "fc", "club", "sports", "auto", "motors",
    "company", "international", "corporation", "limited", "inc", "gmbh", "ag", "sa", "llc",
    "ltd", "preview", "wordmark", "type", "design", "creative", "studio", "solutions", "systems",
    "technologies", "official", "original", "new", "old",
];

pub const MIN_FALLBACK_CHARS: usize = 3;

/// Lowercases `raw` and folds every separator run into a single hyphen.
pub fn normalize(raw: &str) -> String {
    tidy(&raw.to_lowercase())
}

/// Collapses separators and strips edge hyphens without touching case.
fn tidy(name: &str) -> String {
    let hyphenated = SEPARATORS_RE.replace_all(name, "-");
    let collapsed = REPEATED_HYPHENS_RE.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

/// Strips dates, ids, annotations and noise tokens from a normalized name.
pub fn clean(normalized: &str) -> String {
    let mut name = normalized.to_string();
    for pattern in SUFFIX_PATTERNS.iter() {
        name = tidy(&pattern.replace_all(&name, ""));
    }
    tidy(&strip_noise_tokens(&name))
}

/// Drops noise tokens after the first one. The leading token is never a
/// suffix, so a brand that is itself a noise word is left alone.
fn strip_noise_tokens(name: &str) -> String {
    let mut tokens = name.split('-');
    let Some(head) = tokens.next() else {
        return String::new();
    };

    let mut kept = vec![head];
    kept.extend(tokens.filter(|token| !is_noise_token(token)));
    kept.join("-")
}

fn is_noise_token(token: &str) -> bool {
    NOISE_WORDS.contains(&token) || VERSION_TOKEN_RE.is_match(token)
}

/// Whether a cleaned, unregistered name is still usable as a class label.
pub fn is_usable_fallback(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() >= MIN_FALLBACK_CHARS
        && !name.chars().all(char::is_numeric)
        && !HASH_LIKE_RE.is_match(name)
}
