//! Conversion between human RTFCRE chord notation and canonical s-keys form.
//!
//! RTFCRE lists one character per key in a fixed steno order, with an
//! optional `-` divider between the left bank/centre and the right bank and
//! a `/` separating strokes. S-keys uses the same ordering but guarantees a
//! single, distinct character per physical key, so strokes can be compared
//! and sliced without re-parsing the divider rules. Several letters (S, T,
//! P, R) denote two different physical keys depending on which bank they
//! sit in; the divider (or, failing that, the position of the first
//! vowel/star key) disambiguates which one an RTFCRE letter refers to.

use crate::error::InvalidKeys;
use std::collections::HashMap;

/// Stroke separator used in both RTFCRE and s-keys notation.
pub const STROKE_SEP: char = '/';

/// Left/centre-bank divider used only in RTFCRE notation.
const RTFCRE_DIVIDER: char = '-';

/// One physical key: its RTFCRE label and its canonical s-keys character.
struct KeyEntry {
    rtfcre: char,
    skey: char,
    is_center: bool,
}

/// The 22 physical keys in canonical steno order (`STKPWHRAO*EUFRPBLGTSDZ`).
/// S, T, P, and R each occupy both a left-bank and a right-bank slot; the
/// right-bank instance keeps the lowercase form of its RTFCRE letter in
/// s-keys so the two are never confused.
const KEY_TABLE: &[KeyEntry] = &[
    KeyEntry { rtfcre: 'S', skey: 'S', is_center: false },
    KeyEntry { rtfcre: 'T', skey: 'T', is_center: false },
    KeyEntry { rtfcre: 'K', skey: 'K', is_center: false },
    KeyEntry { rtfcre: 'P', skey: 'P', is_center: false },
    KeyEntry { rtfcre: 'W', skey: 'W', is_center: false },
    KeyEntry { rtfcre: 'H', skey: 'H', is_center: false },
    KeyEntry { rtfcre: 'R', skey: 'R', is_center: false },
    KeyEntry { rtfcre: 'A', skey: 'A', is_center: true },
    KeyEntry { rtfcre: 'O', skey: 'O', is_center: true },
    KeyEntry { rtfcre: '*', skey: '*', is_center: true },
    KeyEntry { rtfcre: 'E', skey: 'E', is_center: true },
    KeyEntry { rtfcre: 'U', skey: 'U', is_center: true },
    KeyEntry { rtfcre: 'F', skey: 'F', is_center: false },
    KeyEntry { rtfcre: 'R', skey: 'r', is_center: false },
    KeyEntry { rtfcre: 'P', skey: 'p', is_center: false },
    KeyEntry { rtfcre: 'B', skey: 'B', is_center: false },
    KeyEntry { rtfcre: 'L', skey: 'L', is_center: false },
    KeyEntry { rtfcre: 'G', skey: 'G', is_center: false },
    KeyEntry { rtfcre: 'T', skey: 't', is_center: false },
    KeyEntry { rtfcre: 'S', skey: 's', is_center: false },
    KeyEntry { rtfcre: 'D', skey: 'D', is_center: false },
    KeyEntry { rtfcre: 'Z', skey: 'Z', is_center: false },
];

fn right_bank_start() -> usize {
    KEY_TABLE
        .iter()
        .position(|k| k.rtfcre == 'F')
        .expect("F is always present in the key table")
}

/// Parse one RTFCRE stroke (no `/`) into its s-keys form.
///
/// Input need not list keys in strict canonical order; only ambiguous
/// letters (those with both a left- and right-bank instance) rely on a
/// divider, or the first vowel/star key, to tell which instance is meant.
/// The output is always emitted in canonical steno order.
fn stroke_from_rtfcre(stroke: &str) -> Result<String, InvalidKeys> {
    let mut divider_at: Option<usize> = None;
    let mut plain: Vec<char> = Vec::new();
    for c in stroke.chars() {
        if c == RTFCRE_DIVIDER {
            if divider_at.is_none() {
                divider_at = Some(plain.len());
            }
        } else {
            plain.push(c);
        }
    }
    if plain.is_empty() {
        return Err(InvalidKeys::new(stroke, "empty stroke"));
    }
    let vowel_pos = plain.iter().position(|c| {
        KEY_TABLE
            .iter()
            .any(|entry| entry.rtfcre == *c && entry.is_center)
    });
    let split = divider_at.or(vowel_pos).unwrap_or(usize::MAX);

    let mut used = vec![false; KEY_TABLE.len()];
    let mut chosen_indices: Vec<usize> = Vec::with_capacity(plain.len());
    for (i, c) in plain.iter().enumerate() {
        let candidates: Vec<usize> = KEY_TABLE
            .iter()
            .enumerate()
            .filter(|(_, e)| e.rtfcre == *c)
            .map(|(idx, _)| idx)
            .collect();
        if candidates.is_empty() {
            return Err(InvalidKeys::new(stroke, format!("unknown symbol {:?}", c)));
        }
        let is_right_side = i >= split;
        let chosen = if candidates.len() == 1 {
            candidates[0]
        } else if is_right_side {
            *candidates.iter().max().unwrap()
        } else {
            *candidates.iter().min().unwrap()
        };
        if used[chosen] {
            return Err(InvalidKeys::new(stroke, format!("duplicate key {:?}", c)));
        }
        used[chosen] = true;
        chosen_indices.push(chosen);
    }
    chosen_indices.sort_unstable();
    Ok(chosen_indices.iter().map(|&idx| KEY_TABLE[idx].skey).collect())
}

/// Convert an RTFCRE chord string into canonical s-keys form.
pub fn from_rtfcre(input: &str) -> Result<String, InvalidKeys> {
    let mut strokes = Vec::new();
    for stroke in input.split(STROKE_SEP) {
        if stroke.is_empty() {
            return Err(InvalidKeys::new(input, "empty stroke"));
        }
        strokes.push(stroke_from_rtfcre(stroke)?);
    }
    Ok(strokes.join(&STROKE_SEP.to_string()))
}

/// Convert one s-keys stroke back into RTFCRE notation.
fn stroke_to_rtfcre(stroke: &str) -> Result<String, InvalidKeys> {
    let right_start = right_bank_start();
    let mut has_center = false;
    let mut has_right = false;
    let mut labeled: Vec<(usize, char)> = Vec::with_capacity(stroke.len());
    let mut seen: HashMap<char, ()> = HashMap::new();
    for c in stroke.chars() {
        let (idx, entry) = KEY_TABLE
            .iter()
            .enumerate()
            .find(|(_, e)| e.skey == c)
            .ok_or_else(|| InvalidKeys::new(stroke, format!("unknown s-key {:?}", c)))?;
        if seen.insert(c, ()).is_some() {
            return Err(InvalidKeys::new(stroke, format!("duplicate s-key {:?}", c)));
        }
        if entry.is_center {
            has_center = true;
        }
        if idx >= right_start {
            has_right = true;
        }
        labeled.push((idx, entry.rtfcre));
    }
    labeled.sort_unstable_by_key(|(idx, _)| *idx);
    if !has_center && has_right {
        let mut left = String::new();
        let mut right = String::new();
        for (idx, label) in &labeled {
            if *idx >= right_start {
                right.push(*label);
            } else {
                left.push(*label);
            }
        }
        return Ok(format!("{}{}{}", left, RTFCRE_DIVIDER, right));
    }
    Ok(labeled.into_iter().map(|(_, label)| label).collect())
}

/// Convert canonical s-keys form back into an RTFCRE chord string.
pub fn to_rtfcre(skeys: &str) -> Result<String, InvalidKeys> {
    let mut strokes = Vec::new();
    for stroke in skeys.split(STROKE_SEP) {
        if stroke.is_empty() {
            return Err(InvalidKeys::new(skeys, "empty stroke"));
        }
        strokes.push(stroke_to_rtfcre(stroke)?);
    }
    Ok(strokes.join(&STROKE_SEP.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonically_ordered_stroke() {
        let skeys = from_rtfcre("HEL").unwrap();
        assert_eq!(to_rtfcre(&skeys).unwrap(), "HEL");
    }

    #[test]
    fn round_trips_multi_stroke() {
        let skeys = from_rtfcre("HEL/TEFT").unwrap();
        assert_eq!(skeys.matches(STROKE_SEP).count(), 1);
        assert_eq!(to_rtfcre(&skeys).unwrap(), "HEL/TEFT");
    }

    #[test]
    fn disambiguates_left_and_right_via_divider() {
        let skeys = from_rtfcre("SKWR-PB").unwrap();
        assert_eq!(to_rtfcre(&skeys).unwrap(), "SKWR-PB");
    }

    #[test]
    fn divider_is_optional_when_vowel_present() {
        let skeys = from_rtfcre("TEFT").unwrap();
        assert_eq!(to_rtfcre(&skeys).unwrap(), "TEFT");
    }

    #[test]
    fn out_of_order_input_is_tolerated_and_canonicalized() {
        // Not a strictly ordered stroke, but not ambiguous either: both
        // letters have only one possible physical key.
        let skeys = from_rtfcre("LO").unwrap();
        assert_eq!(skeys, "OL");
    }

    #[test]
    fn rejects_unknown_symbol() {
        assert!(from_rtfcre("XYZ").is_err());
    }

    #[test]
    fn rejects_conflicting_duplicate_use() {
        // Both 'S's would resolve to the same left-bank slot with no
        // divider or vowel to push the second one to the right bank.
        assert!(from_rtfcre("SS").is_err());
    }
}
