//! Scalar casts and list splitting for config values
//!
//! Plain functions, no shared state: a raw string goes in, typed values come out.

/// Types that can be read from a scalar config value
pub trait FromConfigValue: Sized {
    /// Human-readable type name used in `MalformedValue` errors
    const EXPECTED: &'static str;

    fn from_config_value(raw: &str) -> Option<Self>;
}

impl FromConfigValue for String {
    const EXPECTED: &'static str = "string";

    fn from_config_value(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromConfigValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_config_value(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

macro_rules! impl_from_str_value {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromConfigValue for $ty {
                const EXPECTED: &'static str = $name;

                fn from_config_value(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

impl_from_str_value! {
    i32 => "integer",
    i64 => "integer",
    u32 => "non-negative integer",
    u64 => "non-negative integer",
    usize => "non-negative integer",
    f64 => "number",
}

/// How a scalar is cut into list items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Comma,
    Whitespace,
    CommaOrWhitespace,
}

impl Separator {
    fn splits_at(self, c: char) -> bool {
        match self {
            Separator::Comma => c == ',',
            Separator::Whitespace => c.is_whitespace(),
            Separator::CommaOrWhitespace => c == ',' || c.is_whitespace(),
        }
    }
}

/// Split `raw` into trimmed, non-empty tokens.
pub fn split_list(raw: &str, sep: Separator) -> Vec<&str> {
    raw.split(|c| sep.splits_at(c))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split and cast every token. Returns the first token that fails to cast.
pub fn parse_list<T: FromConfigValue>(raw: &str, sep: Separator) -> Result<Vec<T>, String> {
    split_list(raw, sep)
        .into_iter()
        .map(|token| T::from_config_value(token).ok_or_else(|| token.to_string()))
        .collect()
}
