/// Whether an edge seen at `now_ms` falls outside the debounce window opened
/// by the previously accepted edge at `last_ms`.
///
/// `last_ms == None` means no edge has been accepted yet.
#[inline]
pub fn debounce_accepts(last_ms: Option<u64>, now_ms: u64, window_ms: u64) -> bool {
    match last_ms {
        None => true,
        Some(last) => now_ms.saturating_sub(last) >= window_ms,
    }
}

/// Reduce a 10-bit MCP3008 conversion to the 8-bit resolution the reference
/// readers scale from.
#[inline]
pub fn ten_bit_to_u8(raw: u16) -> u8 {
    (raw.min(0x3FF) >> 2) as u8
}
