use std::error::Error;

use rstest::rstest;
use treadmill_core::ReferenceReader;
use treadmill_core::config::ReferenceCfg;
use treadmill_traits::AnalogInput;

/// Replays a fixed pattern of 8-bit conversions.
struct Pattern(Vec<u8>);

impl AnalogInput for Pattern {
    fn read_timed(
        &mut self,
        buf: &mut [u8],
        _sample_hz: u32,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        for (slot, v) in buf.iter_mut().zip(self.0.iter().cycle()) {
            *slot = *v;
        }
        Ok(())
    }
}

struct Broken;

impl AnalogInput for Broken {
    fn read_timed(&mut self, _: &mut [u8], _: u32) -> Result<(), Box<dyn Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("spi transfer failed")))
    }
}

#[test]
fn sample_averages_and_scales() {
    let mut r = ReferenceReader::new("speed", Pattern(vec![128]), ReferenceCfg::speed());
    assert!((r.sample().unwrap() - 7.5).abs() < 1e-6);
    assert_eq!(r.last(), Some(7.5));
}

#[test]
fn average_is_integer_like_the_adc() {
    // ten samples alternating 0/255: 1275 / 10 = 127
    let mut r = ReferenceReader::new("speed", Pattern(vec![0, 255]), ReferenceCfg::speed());
    let expected = 127.0 * 15.0 / 256.0;
    assert!((r.sample().unwrap() - expected).abs() < 1e-6);
}

#[rstest]
#[case(ReferenceCfg::speed(), 34, true)] // 1.99 km/h
#[case(ReferenceCfg::speed(), 35, false)] // 2.05 km/h
#[case(ReferenceCfg::slope(), 25, true)] // 0.098
#[case(ReferenceCfg::slope(), 26, false)] // 0.102
fn rest_threshold(#[case] cfg: ReferenceCfg, #[case] level: u8, #[case] at_rest: bool) {
    let mut r = ReferenceReader::new("knob", Pattern(vec![level]), cfg);
    assert_eq!(r.is_at_rest(), at_rest);
}

#[test]
fn failed_capture_is_never_at_rest() {
    let mut r = ReferenceReader::new("slope", Broken, ReferenceCfg::slope());
    assert!(r.sample().is_err());
    assert!(!r.is_at_rest());
    assert_eq!(r.last(), None);
}
