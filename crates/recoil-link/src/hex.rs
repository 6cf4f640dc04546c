//! Hex helpers for frame diagnostics and capture scripts.

/// Lower-case hex with no separators.
pub fn encode(data: &[u8]) -> String {
    ::hex::encode(data)
}

/// Parse hex, ignoring whitespace, `:` and `-` separators and an optional `0x` prefix.
pub fn decode(input: &str) -> Result<Vec<u8>, String> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':' && *c != '-')
        .collect();

    ::hex::decode(&digits).map_err(|err| err.to_string())
}
