use rstest::rstest;
use treadmill_hardware::util::{debounce_accepts, ten_bit_to_u8};

#[rstest]
#[case(None, 0, 500, true)]
#[case(Some(0), 499, 500, false)]
#[case(Some(0), 500, 500, true)]
#[case(Some(1_000), 900, 500, false)] // clock went backwards: saturates to 0
#[case(Some(10), 10, 0, true)]
fn debounce_window(
    #[case] last: Option<u64>,
    #[case] now: u64,
    #[case] window: u64,
    #[case] expected: bool,
) {
    assert_eq!(debounce_accepts(last, now, window), expected);
}

#[test]
fn ten_bit_reduction_keeps_full_scale() {
    assert_eq!(ten_bit_to_u8(0), 0);
    assert_eq!(ten_bit_to_u8(0x3FF), 255);
    assert_eq!(ten_bit_to_u8(0x200), 128);
    // Out-of-range words clamp instead of wrapping.
    assert_eq!(ten_bit_to_u8(0xFFFF), 255);
}
