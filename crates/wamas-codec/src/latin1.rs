//! Telegrams travel as ISO-8859-1; every byte maps to the code point of the
//! same value.

/// Decode Latin-1 bytes. Never fails.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode text as Latin-1, replacing characters outside the charset with `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
