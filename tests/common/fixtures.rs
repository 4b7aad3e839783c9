use keratovision::{StoredProfile, VisionProfile};

/// Named profiles covering the corners of the input space.
pub fn profile_fixtures() -> Vec<(&'static str, VisionProfile)> {
    let base = VisionProfile::default();
    vec![
        ("defaults", base),
        (
            "quiet",
            VisionProfile {
                kerato_severity: 0.0,
                astigmat_power: 0.0,
                coma_intensity: 0.0,
                reading_guide: false,
                ..base
            },
        ),
        (
            "advanced_keratoconus",
            VisionProfile {
                kerato_severity: 5.0,
                astigmat_axis: 135.0,
                astigmat_power: 6.0,
                coma_angle: 250.0,
                coma_intensity: 4.5,
                font_size: 30.0,
                luminance_clamp: 0.65,
                reading_guide: true,
                ..base
            },
        ),
        (
            "glare_sensitive",
            VisionProfile {
                polarity_reversed: true,
                luminance_clamp: 0.7,
                reading_guide: true,
                ..base
            },
        ),
        (
            "out_of_range",
            VisionProfile {
                astigmat_axis: -725.0,
                astigmat_power: 40.0,
                kerato_severity: 99.0,
                font_size: 2.0,
                luminance_clamp: 3.0,
                coma_angle: 1e9,
                coma_intensity: -4.0,
                ..base
            },
        ),
        (
            "non_finite",
            VisionProfile {
                astigmat_axis: f64::NAN,
                astigmat_power: f64::INFINITY,
                kerato_severity: f64::NAN,
                coma_angle: f64::NEG_INFINITY,
                ..base
            },
        ),
        (
            "no_edges",
            VisionProfile {
                edge_enhancement: false,
                chromatic_correction: false,
                ..base
            },
        ),
    ]
}

/// Stored record as a controller would persist it.
pub fn stored_fixture() -> StoredProfile {
    StoredProfile {
        astigmat_axis: Some(20.0),
        astigmat_power: Some(2.25),
        kerato_severity: Some(3.0),
        reading_guide: Some(true),
        ..StoredProfile::default()
    }
}

pub const STORED_JSON: &str = r#"{
  "astigmatAxis": 20,
  "astigmatPower": 2.25,
  "keratoSeverity": 3,
  "readingGuide": true,
  "someFutureField": "ignored"
}"#;
