//! Floor label parsing.
//!
//! Deal sources store the floor as free text ("ground", "קומה 3", "-1").
//! Everything downstream works with `Option<i32>`; this is the only place
//! that knows about the textual forms.

/// Named floors, checked before any digits in the label.
///
/// Basement must precede the ordinals so "first basement" is not read as 1.
const FLOOR_NAMES: &[(&str, i32)] = &[
    ("basement", -1),
    ("מרתף", -1),
    ("ground", 0),
    ("קרקע", 0),
    ("first", 1),
    ("ראשונה", 1),
    ("second", 2),
    ("שנייה", 2),
    ("שניה", 2),
    ("third", 3),
    ("שלישית", 3),
    ("fourth", 4),
    ("רביעית", 4),
    ("fifth", 5),
    ("חמישית", 5),
    ("sixth", 6),
    ("שישית", 6),
    ("seventh", 7),
    ("שביעית", 7),
    ("eighth", 8),
    ("שמינית", 8),
    ("ninth", 9),
    ("תשיעית", 9),
    ("tenth", 10),
    ("עשירית", 10),
];

/// Parse a textual floor label into a floor number.
///
/// Returns `None` when the label is empty or carries no recognizable floor.
pub fn parse_floor_label(label: &str) -> Option<i32> {
    let normalized = label.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    if let Some(&(_, floor)) = FLOOR_NAMES
        .iter()
        .find(|(name, _)| normalized.contains(name))
    {
        return Some(floor);
    }

    first_integer(&normalized)
}

/// First (optionally negative) integer embedded in the text.
fn first_integer(text: &str) -> Option<i32> {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.iter().position(|c| c.is_ascii_digit())?;
    let end = chars[start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(chars.len(), |offset| start + offset);

    let digits: String = chars[start..end].iter().collect();
    let value: i32 = digits.parse().ok()?;

    if start > 0 && chars[start - 1] == '-' {
        Some(-value)
    } else {
        Some(value)
    }
}
