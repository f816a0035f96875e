//! Synthesis text pre-checks.
//!
//! Runs before either path is tried, so input that no model can speak is
//! rejected without a network call or a script launch.

/// Upper bound on text sent for synthesis; longer input is cut with `…`.
pub const MAX_SYNTHESIS_CHARS: usize = 2_000;

/// Share of non-Latin letters at which text stops counting as the target
/// language.
const NON_LATIN_LIMIT: f64 = 0.1;

/// `true` for pictographic code points and the joiners, modifiers and
/// selectors that build emoji sequences.
pub fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x00A9 | 0x00AE     // © ®
            | 0x203C | 0x2049   // ‼ ⁉
            | 0x2122 | 0x2139   // ™ ℹ
            | 0x2194..=0x2199 | 0x21A9..=0x21AA
            | 0x231A..=0x23FF   // watches, hourglasses, media controls
            | 0x24C2 | 0x25AA..=0x25AB | 0x25B6 | 0x25C0 | 0x25FB..=0x25FE
            | 0x2600..=0x26FF   // misc symbols
            | 0x2700..=0x27BF   // dingbats
            | 0x2934..=0x2935
            | 0x2B05..=0x2B07 | 0x2B1B..=0x2B1C | 0x2B50 | 0x2B55
            | 0x3030 | 0x303D | 0x3297 | 0x3299
            | 0x200D            // zero-width joiner
            | 0x20E3            // combining keycap
            | 0xFE00..=0xFE0F   // variation selectors
            | 0x1F000..=0x1F0FF // mahjong, dominoes, playing cards
            | 0x1F100..=0x1F2FF // enclosed alphanumerics and ideographs
            | 0x1F300..=0x1F5FF // symbols & pictographs
            | 0x1F600..=0x1F64F // emoticons
            | 0x1F680..=0x1F6FF // transport & map
            | 0x1F700..=0x1F8FF // geometric shapes ext, arrows-C
            | 0x1F900..=0x1F9FF // supplemental symbols
            | 0x1FA00..=0x1FAFF // symbols & pictographs ext-A
            | 0xE0020..=0xE007F // tag sequences (subdivision flags)
    )
}

pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|c| !is_emoji(*c)).collect()
}

/// Trim and collapse runs of whitespace to one space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean `text` for synthesis.  `None` when nothing speakable is left.
pub fn prepare_synthesis_text(text: &str) -> Option<String> {
    let clean = normalize_whitespace(&strip_emoji(text));
    if clean.is_empty() {
        return None;
    }
    if clean.chars().count() > MAX_SYNTHESIS_CHARS {
        let mut cut: String = clean.chars().take(MAX_SYNTHESIS_CHARS).collect();
        cut.push('…');
        return Some(cut);
    }
    Some(clean)
}

fn is_latin(c: char) -> bool {
    c.is_ascii_alphabetic() || ('\u{00C0}'..='\u{024F}').contains(&c)
}

/// `true` when fewer than 10 % of the letters in `text` are non-Latin.
/// Text without letters counts as the target language.
pub fn is_target_language(text: &str) -> bool {
    let (letters, non_latin) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(total, other), c| {
            (total + 1, other + usize::from(!is_latin(c)))
        });
    if letters == 0 {
        return true;
    }
    (non_latin as f64 / letters as f64) < NON_LATIN_LIMIT
}
