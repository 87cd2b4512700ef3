use serde::Serializer;

/// Rate per 90 minutes, zero when nothing was played.
pub fn per90(total: f64, minutes: u32) -> f64 {
    if minutes == 0 {
        0.0
    } else {
        total / f64::from(minutes) * 90.0
    }
}

pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

pub(crate) fn serialize_2dp<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round_dp(*value, 2))
}

pub(crate) fn serialize_3dp<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round_dp(*value, 3))
}

#[cfg(test)]
mod tests {
    use super::{per90, round_dp};

    #[test]
    fn per90_scales_to_a_full_match() {
        assert!((per90(2.0, 180) - 1.0).abs() < 1e-12);
        assert!((per90(0.5, 45) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn per90_is_zero_without_minutes() {
        assert_eq!(per90(3.2, 0), 0.0);
    }

    #[test]
    fn round_dp_matches_two_decimals() {
        assert_eq!(round_dp(1.23456, 2), 1.23);
        assert_eq!(round_dp(0.005, 1), 0.0);
    }
}
