//! Property tests for the color model.

use imagery_common::{distance, luminosity, Band, BandVector, Color};
use proptest::prelude::*;

fn band_vector() -> impl Strategy<Value = BandVector> {
    (0.0f64..20000.0, 0.0f64..20000.0, 0.0f64..20000.0)
        .prop_map(|(b, g, r)| BandVector::new(b, g, r))
}

proptest! {
    #[test]
    fn hex_channels_roundtrip(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let hex = format!("{:02x}{:02x}{:02x}", r, g, b);
        let color = Color::from_hex(&hex).unwrap();
        prop_assert_eq!(color, Color::new(r, g, b));
        prop_assert_eq!(color.to_string(), hex);
    }

    #[test]
    fn uppercase_hex_accepted(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let hex = format!("{:02X}{:02X}{:02X}", r, g, b);
        prop_assert_eq!(Color::from_hex(&hex).unwrap(), Color::new(r, g, b));
    }

    #[test]
    fn wrong_length_rejected(s in "[0-9a-f]{0,5}|[0-9a-f]{7,10}") {
        prop_assert!(Color::from_hex(&s).is_err());
    }

    #[test]
    fn luminosity_monotonic_per_channel(a in 0u8..255, step in 1u8..=255) {
        let b = a.saturating_add(step);
        prop_assume!(b > a);
        prop_assert!(luminosity(Color::new(a, 0, 0)) < luminosity(Color::new(b, 0, 0)));
        prop_assert!(luminosity(Color::new(0, a, 0)) < luminosity(Color::new(0, b, 0)));
        prop_assert!(luminosity(Color::new(0, 0, a)) < luminosity(Color::new(0, 0, b)));
    }

    #[test]
    fn distance_to_self_is_zero(v in band_vector()) {
        prop_assert_eq!(distance(&v, &v), 0.0);
    }

    #[test]
    fn distance_is_symmetric(a in band_vector(), b in band_vector()) {
        prop_assert_eq!(distance(&a, &b), distance(&b, &a));
    }

    #[test]
    fn target_axes_sum_to_luminosity(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let color = Color::new(r, g, b);
        let target = BandVector::target(color);
        let sum: f64 = Band::ALL.iter().map(|band| target[*band]).sum();
        prop_assert!((sum - luminosity(color)).abs() < 1e-6);
    }
}
