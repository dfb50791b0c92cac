//! Text Normalizer: strips noise from raw posting text before skill matching.

use once_cell::sync::Lazy;
use regex::Regex;

/// Every ASCII punctuation character.
const PUNCTUATION: &str = r##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;

static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"]+|www\.[^\s<>"]+"#).expect("url regex"));
static RE_BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").expect("bracket regex"));
static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit regex"));
static RE_DIGIT_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w*\d\w*").expect("digit-word regex"));
static RE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("[{}]", regex::escape(PUNCTUATION))).expect("punctuation regex")
});
static RE_CURLY: Lazy<Regex> = Lazy::new(|| Regex::new("[‘’“”…]").expect("curly-quote regex"));
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Cleanses posting text for matching. Steps run in a fixed order:
/// lowercase, URLs, `[...]` segments, digit runs, digit-bearing words,
/// punctuation, curly quotes and ellipsis, newlines, whitespace runs.
///
/// Newlines are removed outright, so `"a\nb"` becomes `"ab"`. The result is
/// not trimmed.
pub fn normalize(text: &str) -> String {
    let text = text.to_lowercase();
    let text = RE_URL.replace_all(&text, "");
    let text = RE_BRACKETED.replace_all(&text, "");
    let text = RE_DIGITS.replace_all(&text, "");
    let text = RE_DIGIT_WORD.replace_all(&text, "");
    let text = RE_PUNCTUATION.replace_all(&text, "");
    let text = RE_CURLY.replace_all(&text, "");
    let text = text.replace('\n', "");
    RE_WHITESPACE.replace_all(&text, " ").into_owned()
}
