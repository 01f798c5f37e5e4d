use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;

lazy_static! {
    static ref ACCENT_RE: Regex =
        Regex::new(r"\\(hat|bar|tilde|dot)\s*\{([A-Za-z])\}").expect("accent pattern");
    static ref ACCENT_MAP: HashMap<(&'static str, char), &'static str> = {
        let mut m = HashMap::new();
        let tables: [(&str, &[(char, &str)]); 4] = [
            (
                "hat",
                &[
                    ('a', "â"),
                    ('e', "ê"),
                    ('i', "î"),
                    ('o', "ô"),
                    ('u', "û"),
                    ('y', "ŷ"),
                    ('c', "ĉ"),
                    ('g', "ĝ"),
                    ('h', "ĥ"),
                    ('j', "ĵ"),
                    ('s', "ŝ"),
                    ('w', "ŵ"),
                    ('z', "ẑ"),
                    ('A', "Â"),
                    ('E', "Ê"),
                    ('I', "Î"),
                    ('O', "Ô"),
                    ('U', "Û"),
                    ('Y', "Ŷ"),
                ],
            ),
            (
                "bar",
                &[
                    ('a', "ā"),
                    ('e', "ē"),
                    ('i', "ī"),
                    ('o', "ō"),
                    ('u', "ū"),
                    ('y', "ȳ"),
                    // No precomposed form; combining macron.
                    ('x', "x\u{0304}"),
                    ('A', "Ā"),
                    ('E', "Ē"),
                    ('I', "Ī"),
                    ('O', "Ō"),
                    ('U', "Ū"),
                    ('Y', "Ȳ"),
                    ('X', "X\u{0304}"),
                ],
            ),
            (
                "tilde",
                &[
                    ('a', "ã"),
                    ('n', "ñ"),
                    ('o', "õ"),
                    ('i', "ĩ"),
                    ('u', "ũ"),
                    ('y', "ỹ"),
                    ('A', "Ã"),
                    ('N', "Ñ"),
                    ('O', "Õ"),
                    ('I', "Ĩ"),
                    ('U', "Ũ"),
                    ('Y', "Ỹ"),
                ],
            ),
            (
                "dot",
                &[
                    ('a', "ȧ"),
                    ('b', "ḃ"),
                    ('c', "ċ"),
                    ('d', "ḋ"),
                    ('e', "ė"),
                    ('f', "ḟ"),
                    ('g', "ġ"),
                    ('m', "ṁ"),
                    ('n', "ṅ"),
                    ('o', "ȯ"),
                    ('p', "ṗ"),
                    ('r', "ṙ"),
                    ('s', "ṡ"),
                    ('t', "ṫ"),
                    ('x', "ẋ"),
                    ('y', "ẏ"),
                    ('z', "ż"),
                    ('E', "Ė"),
                ],
            ),
        ];
        for (macro_name, pairs) in tables {
            for (letter, replacement) in pairs {
                m.insert((macro_name, *letter), *replacement);
            }
        }
        m
    };
}

/// Rewrites `\hat{a}`-style accent macros over single letters into their
/// Unicode forms. Letters without a mapping (and unknown macros) pass through
/// untouched. Applied to prose and to raw math content alike, before any
/// math rendering.
pub fn normalize_accents(text: &str) -> String {
    ACCENT_RE
        .replace_all(text, |caps: &Captures| {
            let macro_name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let letter = caps
                .get(2)
                .and_then(|m| m.as_str().chars().next())
                .unwrap_or('\0');
            match ACCENT_MAP.get(&(macro_name, letter)) {
                Some(replacement) => replacement.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
