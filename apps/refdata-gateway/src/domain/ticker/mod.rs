//! Ticker Normalization
//!
//! Converts user-supplied symbol tokens into the terminal's security
//! identifier syntax (`<code> <exchange> EQUITY`).
//!
//! # Rules
//!
//! | Input      | Output            |
//! |------------|-------------------|
//! | `7203`     | `7203 JT EQUITY`  |
//! | `7203.T`   | `7203 JT EQUITY`  |
//! | `7203.JT`  | `7203 JT EQUITY`  |
//! | `VOD.ln`   | `VOD LN EQUITY`   |
//! | `msft`     | `MSFT US EQUITY`  |

/// Exchange code for Tokyo-listed equities.
pub const DOMESTIC_EXCHANGE: &str = "JT";

/// Exchange code applied when a token carries no market suffix.
pub const US_EXCHANGE: &str = "US";

/// Yellow key appended to every equity identifier.
pub const EQUITY_MARKER: &str = "EQUITY";

/// Market suffix spellings that denote the domestic exchange.
const DOMESTIC_SUFFIXES: [&str; 2] = ["T", "JT"];

/// Normalize a single, already trimmed ticker token.
///
/// Only ASCII digits make a numeric exchange code, so full-width or other
/// Unicode digits take the US equity default like any unrecognized form.
#[must_use]
pub fn normalize_ticker(token: &str) -> String {
    if is_numeric_code(token) {
        return format!("{token} {DOMESTIC_EXCHANGE} {EQUITY_MARKER}");
    }

    if token.contains('.') {
        let mut parts = token.split('.');
        let code = parts.next().unwrap_or_default();
        let suffix = parts.next().unwrap_or_default().to_uppercase();

        if DOMESTIC_SUFFIXES.contains(&suffix.as_str()) {
            return format!("{code} {DOMESTIC_EXCHANGE} {EQUITY_MARKER}");
        }
        return format!("{code} {suffix} {EQUITY_MARKER}");
    }

    format!("{} {US_EXCHANGE} {EQUITY_MARKER}", token.to_uppercase())
}

/// Split a comma-separated `ticker` query value into normalized identifiers.
///
/// Tokens are trimmed before normalization; blank tokens are dropped.
#[must_use]
pub fn parse_ticker_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(normalize_ticker)
        .collect()
}

/// Split a comma-separated `fields` query value into field mnemonics.
///
/// Blank tokens are dropped, so `fields=` yields an empty list; the HTTP
/// handler then requests the configured default fields rather than none.
#[must_use]
pub fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn is_numeric_code(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

// =============================================================================
// Tests
// =============================================================================
