//! Bit-level majority vote across up to N noisy SAME header copies, followed
//! by two layered contextual repair passes: a general, table-driven
//! grammar-position pass (every hyphen and the purge `+`, anywhere in the
//! header, via neighbor agreement) and a narrower closed-vocabulary pass
//! over the originator and event-code fields specifically.
//!
//! See spec.md §4.1. The averager never fails outright; a badly reconstructed
//! byte shows up as low confidence rather than an error, and it is up to the
//! caller (the SAME parser) to reject a reconstruction whose required
//! positions fall below a trust threshold.

use super::header::{originator_codes, EVENT_CODE_WIDTH, FIPS_WIDTH, ORIGINATOR_WIDTH};

/// Confidence values are clamped to this range; 9 marks "confirmed by
/// grammar context", one above the richest raw per-byte input confidence.
pub const CONFIDENCE_MAX: u8 = 9;

const ORIGINATOR_FIELD_START: usize = 1;
const EVENT_CODE_FIELD_START: usize = 5;

/// One byte position's expected shape under the SAME wire grammar in
/// spec.md §6 (`-ORG-EEE-PSSFFF[-PSSFFF]*+TTTT-JJJHHMM-LLLLLLLL[-]`).
///
/// Only `Literal` positions have a single determinable correct byte — a
/// separator is either `-` or `+` and nothing else, so a grammar violation
/// there can be corrected outright. `Upper`/`Digit` positions constrain
/// which *class* of byte is valid but not which member of that class is
/// correct (there's no way to tell, from grammar alone, that a corrupted
/// digit should have been a `7` rather than a `3`); violations there are
/// left for the closed-vocabulary pass (for the fields that have one) or
/// simply kept at their already-voted confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrammarSlot {
    Literal(u8),
    Upper,
    Digit,
    FipsDigitGroup,
    Any,
}

impl GrammarSlot {
    fn matches(self, b: u8) -> bool {
        match self {
            GrammarSlot::Literal(c) => b == c,
            GrammarSlot::Upper => b.is_ascii_uppercase(),
            GrammarSlot::Digit | GrammarSlot::FipsDigitGroup => b.is_ascii_digit(),
            GrammarSlot::Any => true,
        }
    }
}

/// Classify every byte position of a reconstructed header. The fixed
/// 8-byte prefix (`-ORG-EEE`) is always the same shape; the tail's shape
/// depends on how many FIPS groups precede the purge `+`, so it's walked
/// byte by byte, trusting the already-bit-voted byte at each prospective
/// separator position the same way `ORIGINATOR_FIELD_START`/
/// `EVENT_CODE_FIELD_START` already trust fixed anchors. This is built
/// fresh per call (from the grammar, not hand-unrolled per message) rather
/// than being a single static table, since the tail's length is variable.
fn classify_positions(bytes: &[u8]) -> Vec<GrammarSlot> {
    let len = bytes.len();
    let mut slots = vec![GrammarSlot::Any; len];

    if len > 0 {
        slots[0] = GrammarSlot::Literal(b'-');
    }
    for slot in slots.iter_mut().take(4.min(len)).skip(1) {
        *slot = GrammarSlot::Upper;
    }
    if len > 4 {
        slots[4] = GrammarSlot::Literal(b'-');
    }
    for slot in slots.iter_mut().take(8.min(len)).skip(5) {
        *slot = GrammarSlot::Upper;
    }

    let mut pos = 8;
    while pos < len {
        if bytes[pos] == b'+' {
            slots[pos] = GrammarSlot::Literal(b'+');
            pos += 1;
            for slot in slots.iter_mut().take((pos + 4).min(len)).skip(pos) {
                *slot = GrammarSlot::Digit;
            }
            pos = (pos + 4).min(len);
            if pos < len {
                slots[pos] = GrammarSlot::Literal(b'-');
                pos += 1;
            }
            for slot in slots.iter_mut().take((pos + 7).min(len)).skip(pos) {
                *slot = GrammarSlot::Digit;
            }
            pos = (pos + 7).min(len);
            if pos < len {
                slots[pos] = GrammarSlot::Literal(b'-');
                pos += 1;
            }
            // Remainder is the station id — up to 8 characters, no fixed
            // character class (real station ids include `/`), so left as
            // `Any` and never touched by grammar repair.
            break;
        }
        slots[pos] = GrammarSlot::Literal(b'-');
        pos += 1;
        for slot in slots.iter_mut().take((pos + FIPS_WIDTH).min(len)).skip(pos) {
            *slot = GrammarSlot::FipsDigitGroup;
        }
        pos = (pos + FIPS_WIDTH).min(len);
    }

    slots
}

/// The general per-position repair rule from spec.md §4.1: if position
/// `p`'s byte violates the grammar at `p` and both neighbors (`p-1`,
/// `p+1`) agree with the grammar at their own positions, correct `p`.
/// Only `Literal` positions have a single correct byte to repair to;
/// `Upper`/`Digit`/`FipsDigitGroup` violations are detected but left
/// alone — see `GrammarSlot`'s doc comment for why.
fn repair_grammar_positions(bytes: &mut [u8], confidence: &mut [u8]) {
    let slots = classify_positions(bytes);
    let mut corrections = Vec::new();
    for p in 0..bytes.len() {
        if slots[p].matches(bytes[p]) {
            continue;
        }
        let left_ok = p == 0 || slots[p - 1].matches(bytes[p - 1]);
        let right_ok = p + 1 >= bytes.len() || slots[p + 1].matches(bytes[p + 1]);
        if left_ok && right_ok {
            if let GrammarSlot::Literal(expected) = slots[p] {
                corrections.push((p, expected));
            }
        }
    }
    for (p, expected) in corrections {
        bytes[p] = expected;
        confidence[p] = CONFIDENCE_MAX;
    }
}

/// A modest table of known SAME event codes used only to recognize a valid
/// field during grammar repair — not the authoritative priority taxonomy
/// (see `EventCategory`, which may legitimately classify codes outside
/// this list as `Unknown` per spec.md §7).
fn known_event_codes() -> &'static [&'static str] {
    &[
        "RWT", "RMT", "DMO", "NPT", "TOR", "SVR", "FFW", "FLW", "HUW", "TSW", "WSW", "BZW", "EWW",
        "CFW", "SVA", "TOA", "FFA", "FLA", "HUA", "FLS", "CFA", "SPS",
    ]
}

/// Reconstruct one SAME header from up to N noisy copies.
///
/// Each copy is `(bytes, per_byte_confidence)` with `confidence[i] in 0..=3`
/// describing the demodulator's trust in `bytes[i]`. Returns the
/// reconstructed bytes and a same-length confidence vector in `0..=9`.
pub fn average_message(copies: &[(Vec<u8>, Vec<u8>)]) -> (Vec<u8>, Vec<u8>) {
    let max_len = copies.iter().map(|(b, _)| b.len()).max().unwrap_or(0);
    let mut out = Vec::with_capacity(max_len);
    let mut confidence = Vec::with_capacity(max_len);

    for i in 0..max_len {
        let mut bit_weight = [[0u32; 2]; 8];
        let mut conf_sum: u32 = 0;
        for (bytes, confs) in copies {
            if i >= bytes.len() {
                continue;
            }
            let byte = bytes[i];
            let c = *confs.get(i).unwrap_or(&0) as u32;
            conf_sum += c;
            let weight = c + 1;
            for bit in 0..8 {
                let v = ((byte >> bit) & 1) as usize;
                bit_weight[bit][v] += weight;
            }
        }
        let mut byte = 0u8;
        for bit in 0..8 {
            // tie (equal weight) breaks toward 0, so only set the bit when 1
            // strictly outweighs 0.
            if bit_weight[bit][1] > bit_weight[bit][0] {
                byte |= 1 << bit;
            }
        }
        out.push(byte);
        confidence.push(conf_sum.min(CONFIDENCE_MAX as u32) as u8);
    }

    repair_grammar_positions(&mut out, &mut confidence);
    repair_closed_set_field(&mut out, &mut confidence, ORIGINATOR_FIELD_START, ORIGINATOR_WIDTH, originator_codes());
    repair_closed_set_field(
        &mut out,
        &mut confidence,
        EVENT_CODE_FIELD_START,
        EVENT_CODE_WIDTH,
        known_event_codes(),
    );

    (out, confidence)
}

/// Second repair pass, narrower than `repair_grammar_positions`: a
/// fixed-width closed-vocabulary field (originator or event code) can be
/// content-repaired, not just class-checked, because its vocabulary is
/// small enough to reconstruct from context. If the reconstructed field
/// doesn't exactly match a known code but exactly one candidate differs
/// from it at exactly one position, that position is corrected and every
/// position in the field is marked confirmed (confidence 9). An exact
/// match is likewise confirmed even with no correction needed, since the
/// grammar at that position is now unambiguous.
fn repair_closed_set_field(
    bytes: &mut [u8],
    confidence: &mut [u8],
    start: usize,
    width: usize,
    candidates: &[&str],
) {
    if bytes.len() < start + width {
        return;
    }
    let field = &bytes[start..start + width];

    if candidates.iter().any(|c| c.as_bytes() == field) {
        for conf in confidence.iter_mut().skip(start).take(width) {
            *conf = CONFIDENCE_MAX;
        }
        return;
    }

    let mut single_diff_match: Option<(&str, usize)> = None;
    for cand in candidates {
        let cb = cand.as_bytes();
        if cb.len() != width {
            continue;
        }
        let diffs: Vec<usize> = (0..width).filter(|&i| cb[i] != field[i]).collect();
        if diffs.len() == 1 {
            if single_diff_match.is_some() {
                // ambiguous: more than one candidate fits — leave as is.
                return;
            }
            single_diff_match = Some((cand, diffs[0]));
        }
    }

    if let Some((cand, diff_pos)) = single_diff_match {
        let cb = cand.as_bytes();
        bytes[start + diff_pos] = cb[diff_pos];
        for conf in confidence.iter_mut().skip(start).take(width) {
            *conf = CONFIDENCE_MAX;
        }
    }
}
