//! ROOT colour codes from names like `kRed+2` or plain numbers

/// Base colours of ROOT's wheel
const COLORS: &[(&str, i32)] = &[
    ("kWhite", 0),
    ("kBlack", 1),
    ("kGray", 920),
    ("kGrey", 920),
    ("kRed", 632),
    ("kGreen", 416),
    ("kBlue", 600),
    ("kYellow", 400),
    ("kMagenta", 616),
    ("kCyan", 432),
    ("kOrange", 800),
    ("kSpring", 820),
    ("kTeal", 840),
    ("kAzure", 860),
    ("kViolet", 880),
    ("kPink", 900),
];

/// `kBlack`
pub const DEFAULT_COLOR: i32 = 1;

/// Parse `"632"`, `"kRed"`, `"kRed+2"`, `"kAzure - 1"`. Spaces are ignored.
///
/// At most one sign is allowed, and an offset that leaves the `i32` range
/// is rejected like any other bad value.
pub fn parse_color(input: &str) -> Option<i32> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if let Ok(code) = compact.parse::<i32>() {
        return (code >= 0).then_some(code);
    }
    if !compact.starts_with('k') {
        return None;
    }

    let split = compact.find(|c: char| c == '+' || c == '-').unwrap_or(compact.len());
    let (name, offset) = compact.split_at(split);
    let base = COLORS.iter().find(|(n, _)| *n == name).map(|(_, code)| *code)?;

    let shift = match offset.chars().next() {
        None => 0,
        Some(sign) => {
            let digits = &offset[1..];
            if digits.contains(|c: char| c == '+' || c == '-') {
                return None;
            }
            let amount: i32 = digits.parse().ok()?;
            if sign == '-' {
                amount.checked_neg()?
            } else {
                amount
            }
        }
    };
    base.checked_add(shift).filter(|code| *code >= 0)
}
