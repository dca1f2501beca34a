//! Ordering of personal names the way a Ukrainian reader expects it.
//!
//! Primary level: letters by the Ukrainian alphabet (ґ after г, є after е,
//! і and ї after и), Cyrillic before Latin, case folded, apostrophes ignored.
//! Ties fall back to lowercase-before-uppercase, then the shorter spelling,
//! then code points, so the order is total and independent of input order.

use std::cmp::Ordering;

const UKRAINIAN_ALPHABET: &str = "абвгґдеєжзиіїйклмнопрстуфхцчшщьюя";

const APOSTROPHES: [char; 4] = ['\'', '\u{2019}', '\u{02BC}', '`'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Group {
    Space,
    Punctuation,
    Digit,
    Cyrillic,
    Latin,
    Other,
}

fn primary_weight(c: char) -> Option<(Group, u32)> {
    if APOSTROPHES.contains(&c) {
        return None;
    }

    let lower = c.to_lowercase().next().unwrap_or(c);

    if lower.is_whitespace() {
        return Some((Group::Space, 0));
    }
    if let Some(index) = UKRAINIAN_ALPHABET.chars().position(|letter| letter == lower) {
        return Some((Group::Cyrillic, index as u32));
    }
    if ('\u{0400}'..='\u{04FF}').contains(&lower) {
        // Cyrillic letters outside the Ukrainian alphabet sort after я.
        return Some((Group::Cyrillic, 100 + lower as u32));
    }
    if lower.is_ascii_digit() {
        return Some((Group::Digit, lower as u32));
    }
    if lower.is_alphabetic() && lower.is_ascii() {
        return Some((Group::Latin, lower as u32));
    }
    if lower.is_ascii_punctuation() {
        return Some((Group::Punctuation, lower as u32));
    }
    Some((Group::Other, lower as u32))
}

fn primary_key(s: &str) -> Vec<(Group, u32)> {
    s.chars().filter_map(primary_weight).collect()
}

fn case_key(s: &str) -> Vec<bool> {
    s.chars()
        .filter(|c| !APOSTROPHES.contains(c))
        .map(char::is_uppercase)
        .collect()
}

/// Compares two names under Ukrainian collation.
pub fn compare_uk(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| case_key(a).cmp(&case_key(b)))
        .then_with(|| a.chars().count().cmp(&b.chars().count()))
        .then_with(|| a.cmp(b))
}
