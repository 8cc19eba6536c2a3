//! The four rule-matcher variants that feed the lexer's state-queue search.
//! Each is a pure strategy: given what's left of the keys and letters (plus
//! the full originals, for matchers that need whole-stroke or whole-word
//! context), it proposes zero or more ways to consume a prefix of both.

use crate::keys::STROKE_SEP;
use crate::trie::PrefixTrie;
use std::collections::{HashMap, HashSet};

/// One proposed extension of a lexer state: consume `rule_id`, covering
/// `[rule_start, rule_start + rule_length)` of the remaining letters, and
/// leave `leftover_skeys` as what's left of the keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub rule_id: String,
    pub leftover_skeys: String,
    pub rule_start: usize,
    pub rule_length: usize,
}

/// Shared contract for all four matcher variants.
pub trait RuleMatcher {
    fn matches(
        &self,
        remaining_skeys: &str,
        remaining_letters: &str,
        full_skeys: &str,
        full_letters: &str,
    ) -> Vec<MatchCandidate>;
}

fn current_stroke(remaining_skeys: &str) -> &str {
    match remaining_skeys.find(STROKE_SEP) {
        Some(idx) => &remaining_skeys[..idx],
        None => remaining_skeys,
    }
}

/// Matches rules whose `keys` is a prefix of the remaining stroke, modulo a
/// small set of "unordered" keys (e.g. the star key) that may appear
/// anywhere in the stroke rather than strictly in sequence.
pub struct PrefixMatcher {
    trie: PrefixTrie<PrefixEntry>,
    unordered_keys: HashSet<char>,
}

#[derive(Clone)]
struct PrefixEntry {
    rule_id: String,
    letters: String,
    required_unordered: Vec<char>,
    core_len: usize,
}

#[derive(Default)]
pub struct PrefixMatcherBuilder {
    entries: Vec<(String, String, String)>,
    unordered_keys: HashSet<char>,
}

impl PrefixMatcherBuilder {
    pub fn new(unordered_keys: impl IntoIterator<Item = char>) -> Self {
        Self { entries: Vec::new(), unordered_keys: unordered_keys.into_iter().collect() }
    }

    pub fn add(&mut self, rule_id: impl Into<String>, skeys: impl Into<String>, letters: impl Into<String>) {
        self.entries.push((rule_id.into(), skeys.into(), letters.into()));
    }

    pub fn build(self) -> PrefixMatcher {
        let mut trie = PrefixTrie::new();
        for (rule_id, skeys, letters) in self.entries {
            let mut core = String::new();
            let mut required_unordered = Vec::new();
            for c in skeys.chars() {
                if self.unordered_keys.contains(&c) {
                    required_unordered.push(c);
                } else {
                    core.push(c);
                }
            }
            let core_len = core.chars().count();
            trie.insert(core.as_bytes(), PrefixEntry { rule_id, letters, required_unordered, core_len });
        }
        PrefixMatcher { trie, unordered_keys: self.unordered_keys }
    }
}

impl RuleMatcher for PrefixMatcher {
    fn matches(
        &self,
        remaining_skeys: &str,
        remaining_letters: &str,
        _full_skeys: &str,
        _full_letters: &str,
    ) -> Vec<MatchCandidate> {
        let stroke = current_stroke(remaining_skeys);
        let stroke_chars: Vec<char> = stroke.chars().collect();

        let mut cleaned: Vec<char> = Vec::with_capacity(stroke_chars.len());
        let mut cleaned_origin: Vec<usize> = Vec::with_capacity(stroke_chars.len());
        let mut present_unordered: HashSet<char> = HashSet::new();
        for (i, &c) in stroke_chars.iter().enumerate() {
            if self.unordered_keys.contains(&c) {
                present_unordered.insert(c);
            } else {
                cleaned.push(c);
                cleaned_origin.push(i);
            }
        }
        let cleaned_bytes: String = cleaned.iter().collect();

        let mut out = Vec::new();
        for (entry, core_chars_matched) in self.trie.find_all(cleaned_bytes.as_bytes()) {
            if core_chars_matched != entry.core_len {
                continue;
            }
            if !remaining_letters.starts_with(entry.letters.as_str()) {
                continue;
            }
            if !entry.required_unordered.iter().all(|c| present_unordered.contains(c)) {
                continue;
            }

            let mut consumed: HashSet<usize> = cleaned_origin[..core_chars_matched].iter().copied().collect();
            for req in &entry.required_unordered {
                if let Some(pos) = stroke_chars
                    .iter()
                    .enumerate()
                    .position(|(i, c)| c == req && !consumed.contains(&i))
                {
                    consumed.insert(pos);
                }
            }
            let leftover_stroke: String = stroke_chars
                .iter()
                .enumerate()
                .filter(|(i, _)| !consumed.contains(i))
                .map(|(_, c)| *c)
                .collect();
            let leftover_skeys = format!("{}{}", leftover_stroke, &remaining_skeys[stroke.len()..]);

            out.push(MatchCandidate {
                rule_id: entry.rule_id.clone(),
                leftover_skeys,
                rule_start: 0,
                rule_length: entry.letters.len(),
            });
        }
        out
    }
}

/// Matches only when the remaining keys begin with a complete stroke that
/// exactly equals a registered one.
#[derive(Default)]
pub struct StrokeMatcher {
    by_stroke: HashMap<String, Vec<(String, String)>>,
}

impl StrokeMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule_id: impl Into<String>, skeys: impl Into<String>, letters: impl Into<String>) {
        self.by_stroke.entry(skeys.into()).or_default().push((rule_id.into(), letters.into()));
    }
}

impl RuleMatcher for StrokeMatcher {
    fn matches(
        &self,
        remaining_skeys: &str,
        remaining_letters: &str,
        _full_skeys: &str,
        _full_letters: &str,
    ) -> Vec<MatchCandidate> {
        let stroke = current_stroke(remaining_skeys);
        let Some(rules) = self.by_stroke.get(stroke) else { return Vec::new() };
        rules
            .iter()
            .filter(|(_, letters)| remaining_letters.starts_with(letters.as_str()))
            .map(|(rule_id, letters)| MatchCandidate {
                rule_id: rule_id.clone(),
                leftover_skeys: remaining_skeys[stroke.len()..].to_string(),
                rule_start: 0,
                rule_length: letters.len(),
            })
            .collect()
    }
}

/// Matches whole words, case-insensitively, only at a word boundary.
#[derive(Default)]
pub struct WordMatcher {
    by_word: HashMap<String, Vec<(String, String)>>,
}

impl WordMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule_id: impl Into<String>, skeys: impl Into<String>, letters: impl Into<String>) {
        self.by_word.entry(letters.into().to_lowercase()).or_default().push((rule_id.into(), skeys.into()));
    }
}

fn is_word_boundary(full_letters: &str, remaining_letters: &str) -> bool {
    let wordptr = full_letters.len() - remaining_letters.len();
    wordptr == 0 || full_letters[..wordptr].chars().next_back().map_or(true, |c| c.is_whitespace())
}

impl RuleMatcher for WordMatcher {
    fn matches(
        &self,
        remaining_skeys: &str,
        remaining_letters: &str,
        _full_skeys: &str,
        full_letters: &str,
    ) -> Vec<MatchCandidate> {
        if !is_word_boundary(full_letters, remaining_letters) {
            return Vec::new();
        }
        let word_end = remaining_letters
            .find(|c: char| c.is_whitespace())
            .unwrap_or(remaining_letters.len());
        let word = remaining_letters[..word_end].to_lowercase();
        let Some(rules) = self.by_word.get(&word) else { return Vec::new() };
        rules
            .iter()
            .filter(|(_, skeys)| remaining_skeys.starts_with(skeys.as_str()))
            .map(|(rule_id, skeys)| MatchCandidate {
                rule_id: rule_id.clone(),
                leftover_skeys: remaining_skeys[skeys.len()..].to_string(),
                rule_start: 0,
                rule_length: word_end,
            })
            .collect()
    }
}

/// Matches named end-conditions rather than literal keys. The only
/// condition registered in practice is `"separator"`, which fires whenever
/// the remaining keys begin with the stroke separator and consumes it
/// while contributing zero letters — this is what lets the rulemap carry a
/// zero-length marker between strokes.
#[derive(Default)]
pub struct SpecialMatcher {
    names: HashSet<String>,
}

impl SpecialMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }
}

impl RuleMatcher for SpecialMatcher {
    fn matches(
        &self,
        remaining_skeys: &str,
        _remaining_letters: &str,
        _full_skeys: &str,
        _full_letters: &str,
    ) -> Vec<MatchCandidate> {
        if !self.names.contains("separator") || !remaining_skeys.starts_with(STROKE_SEP) {
            return Vec::new();
        }
        vec![MatchCandidate {
            rule_id: "separator".to_string(),
            leftover_skeys: remaining_skeys[STROKE_SEP.len_utf8()..].to_string(),
            rule_start: 0,
            rule_length: 0,
        }]
    }
}

/// A closed tagged variant over the four matcher kinds, so the lexer can
/// hold them all in one ordered list without dynamic dispatch.
pub enum Matcher {
    Prefix(PrefixMatcher),
    Stroke(StrokeMatcher),
    Word(WordMatcher),
    Special(SpecialMatcher),
}

impl RuleMatcher for Matcher {
    fn matches(
        &self,
        remaining_skeys: &str,
        remaining_letters: &str,
        full_skeys: &str,
        full_letters: &str,
    ) -> Vec<MatchCandidate> {
        match self {
            Matcher::Prefix(m) => m.matches(remaining_skeys, remaining_letters, full_skeys, full_letters),
            Matcher::Stroke(m) => m.matches(remaining_skeys, remaining_letters, full_skeys, full_letters),
            Matcher::Word(m) => m.matches(remaining_skeys, remaining_letters, full_skeys, full_letters),
            Matcher::Special(m) => m.matches(remaining_skeys, remaining_letters, full_skeys, full_letters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matcher_matches_simple_prefix() {
        let mut builder = PrefixMatcherBuilder::new([]);
        builder.add("H", "H", "h");
        let matcher = builder.build();
        let got = matcher.matches("HELO", "helo", "HELO", "helo");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].rule_id, "H");
        assert_eq!(got[0].leftover_skeys, "ELO");
        assert_eq!(got[0].rule_length, 1);
    }

    #[test]
    fn prefix_matcher_handles_unordered_star_key() {
        let mut builder = PrefixMatcherBuilder::new(['*']);
        builder.add("HSTAR", "H*", "h");
        let matcher = builder.build();
        // The star appears after H in the input, not adjacent in the core.
        let got = matcher.matches("H*T", "h", "H*T", "h");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].leftover_skeys, "T");
    }

    #[test]
    fn stroke_matcher_requires_exact_whole_stroke() {
        let mut matcher = StrokeMatcher::new();
        matcher.add("GREET", "TKPWREUT", "greetings");
        let got = matcher.matches("TKPWREUT/HELO", "greetings helo", "TKPWREUT/HELO", "greetings helo");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].leftover_skeys, "/HELO");
    }

    #[test]
    fn word_matcher_requires_word_boundary() {
        let mut matcher = WordMatcher::new();
        matcher.add("THE", "THE", "the");
        let got = matcher.matches("THE", "the cat", "THE", "the cat");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].rule_length, 3);

        let got_mid_word = matcher.matches("THE", "the", "SOMETHE", "bathe");
        assert!(got_mid_word.is_empty());
    }

    #[test]
    fn special_matcher_consumes_separator_with_no_letters() {
        let mut matcher = SpecialMatcher::new();
        matcher.add("separator");
        let got = matcher.matches("/HELO", "helo", "HEL/HELO", "helhelo");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].rule_id, "separator");
        assert_eq!(got[0].rule_length, 0);
        assert_eq!(got[0].leftover_skeys, "HELO");
    }
}
