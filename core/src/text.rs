use crate::content::Heading;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

const WORDS_PER_MINUTE: usize = 200;

lazy_static! {
    // One CJK ideograph/kana/hangul is one word; everything else counts by runs.
    static ref WORD: Regex = Regex::new(
        r"(?u)[\p{Han}\p{Hiragana}\p{Katakana}\p{Hangul}]|[[\p{L}\p{N}]--[\p{Han}\p{Hiragana}\p{Katakana}\p{Hangul}]]+(?:['_][[\p{L}\p{N}]--[\p{Han}\p{Hiragana}\p{Katakana}\p{Hangul}]]+)*"
    ).expect("valid regex");
    static ref HEADING: Regex = Regex::new(r"^ {0,3}(#{1,6})[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$").expect("valid regex");
    static ref LINK: Regex = Regex::new(
        r#"(!?)\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)|<(https?://[^>\s]+)>"#
    ).expect("valid regex");
    // Separators for slugs: anything but a letter or a decimal digit.
    static ref NON_SLUG: Regex = Regex::new(r"[^\p{L}\p{Nd}]+").expect("valid regex");
}

/// URL-safe identifier: letters and digits kept (ASCII folded to lower case),
/// every other run of characters collapsed to one `-`, no leading/trailing `-`.
pub fn slugify(s: &str) -> String {
    NON_SLUG.replace_all(s.trim(), "-").trim_matches('-').to_ascii_lowercase()
}

/// Word count of a document body after NFKC normalization.
pub fn word_count(body: &str) -> usize {
    let normalized = body.nfkc().collect::<String>();
    WORD.find_iter(&normalized).count()
}

pub fn reading_minutes(words: usize) -> usize {
    if words == 0 { 0 } else { words.div_ceil(WORDS_PER_MINUTE) }
}

/// ATX heading outline, skipping fenced code blocks. Ids are slugs of the
/// heading text, suffixed `-1`, `-2`, ... when repeated.
pub fn headings(body: &str) -> Vec<Heading> {
    let mut out = Vec::new();
    let mut used: HashMap<String, usize> = HashMap::new();
    for line in prose_lines(body) {
        let Some(caps) = HEADING.captures(line) else { continue };
        let text = caps[2].trim().to_string();
        if text.is_empty() { continue; }
        let base = slugify(&text);
        let id = match used.get_mut(&base) {
            Some(n) => {
                *n += 1;
                format!("{base}-{n}")
            }
            None => {
                used.insert(base.clone(), 0);
                base
            }
        };
        out.push(Heading { level: caps[1].len() as u8, id, text });
    }
    out
}

/// Targets of inline links and autolinks, first-seen order, deduplicated.
/// Image sources are not links.
pub fn out_links(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in prose_lines(body) {
        for caps in LINK.captures_iter(line) {
            let target = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(bang), _, _) if bang.as_str() == "!" => continue,
                (_, Some(t), _) => t.as_str(),
                (_, _, Some(t)) => t.as_str(),
                _ => continue,
            };
            if seen.insert(target.to_string()) {
                out.push(target.to_string());
            }
        }
    }
    out
}

fn prose_lines(body: &str) -> impl Iterator<Item = &str> {
    let mut in_fence = false;
    body.lines().filter(move |line| {
        let t = line.trim_start();
        if t.starts_with("```") || t.starts_with("~~~") {
            in_fence = !in_fence;
            return false;
        }
        !in_fence
    })
}
