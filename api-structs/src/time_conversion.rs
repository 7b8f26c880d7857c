pub const NANOS_IN_1_MS: u64 = 1_000_000;

/// Length of `[start, end]` in fractional milliseconds. The subtraction is done on integers
/// since epoch nanos don't fit the f64 mantissa. An `end` before `start` gives a negative value.
pub fn nanos_interval_to_millis(start: u64, end: u64) -> f64 {
    let nanos = i128::from(end) - i128::from(start);
    nanos as f64 / NANOS_IN_1_MS as f64
}

#[test]
fn nanos_interval_to_millis_keeps_sub_millisecond_precision() {
    let start = 1_700_000_000_123_456_789;
    assert_eq!(nanos_interval_to_millis(start, start + 2_500_000), 2.5);
    assert_eq!(nanos_interval_to_millis(start, start + 1), 0.000001);
    assert_eq!(nanos_interval_to_millis(start + 1_000_000, start), -1.0);
}
