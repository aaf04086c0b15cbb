//! Example-number masks and country flags for the identify panel

/// One cell of the example number mask
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskCell {
    /// Gap between digit groups
    Spacer,
    /// Blurred digit; `position` counts from 1, `placeholder` is the glyph
    /// shown under the blur
    Digit { position: u32, placeholder: char },
}

/// Build the blurred mask for an example number
///
/// The mask opens with a spacer so the first group is detached from the
/// prefix. Placeholders count 1..9 and then stay at `0`.
pub fn number_mask(example: &str) -> Vec<MaskCell> {
    let mut position = 0u32;

    std::iter::once(' ')
        .chain(example.chars())
        .map(|c| {
            if c == ' ' {
                return MaskCell::Spacer;
            }
            position += 1;
            let placeholder = char::from_digit(position, 10).unwrap_or('0');
            MaskCell::Digit {
                position,
                placeholder,
            }
        })
        .collect()
}

/// Regional-indicator flag for an ISO 3166-1 alpha-2 code
pub fn flag_emoji(iso2: &str) -> Option<String> {
    const REGIONAL_A: u32 = 0x1F1E6;

    if iso2.len() != 2 || !iso2.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    iso2.bytes()
        .map(|b| char::from_u32(REGIONAL_A + u32::from(b.to_ascii_uppercase() - b'A')))
        .collect()
}
