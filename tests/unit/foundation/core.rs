use super::*;

#[test]
fn location_rejects_out_of_range_and_non_finite() {
    assert!(Location::new(90.0, 180.0).is_ok());
    assert!(Location::new(-90.0, -180.0).is_ok());
    assert!(matches!(
        Location::new(90.5, 0.0),
        Err(CityPaperError::InvalidCoordinate(_))
    ));
    assert!(matches!(
        Location::new(0.0, -180.01),
        Err(CityPaperError::InvalidCoordinate(_))
    ));
    assert!(Location::new(f64::NAN, 0.0).is_err());
    assert!(Location::new(0.0, f64::INFINITY).is_err());
}

#[test]
fn location_deserialize_validates() {
    let ok: Location = serde_json::from_str(r#"{"lat": 35.6762, "lng": 139.6503}"#).unwrap();
    assert_eq!(ok.lat(), 35.6762);
    let alias: Location = serde_json::from_str(r#"{"lat": 1.0, "lon": 2.0}"#).unwrap();
    assert_eq!(alias.lng(), 2.0);
    assert!(serde_json::from_str::<Location>(r#"{"lat": 91.0, "lng": 0.0}"#).is_err());
}

#[test]
fn coordinate_line_uses_hemispheres() {
    let loc = Location::new(-33.8688, 151.2093).unwrap();
    assert_eq!(loc.coordinate_line(), "33.8688\u{b0} S / 151.2093\u{b0} E");
    let loc = Location::new(40.7128, -74.006).unwrap();
    assert_eq!(loc.coordinate_line(), "40.7128\u{b0} N / 74.0060\u{b0} W");
}

#[test]
fn zoom_is_clamped_never_rejected() {
    assert_eq!(clamp_zoom(3.0), MIN_ZOOM);
    assert_eq!(clamp_zoom(25.0), MAX_ZOOM);
    assert_eq!(clamp_zoom(13.5), 13.5);
    assert_eq!(clamp_zoom(f64::NAN), MIN_ZOOM);
    assert_eq!(ViewportSpec::new(99.0, AspectRatioId::Phone9x16).effective_zoom(), MAX_ZOOM);
}

#[test]
fn aspect_ratio_logical_size() {
    let s = AspectRatioId::Phone9x19.logical_size(340.0);
    assert_eq!((s.width, s.height), (340.0, 718.0));
    let s = AspectRatioId::Phone9x16.logical_size(360.0);
    assert_eq!((s.width, s.height), (360.0, 640.0));
}

#[test]
fn aspect_ratio_parses_both_forms() {
    assert_eq!("9:20".parse::<AspectRatioId>().unwrap(), AspectRatioId::Phone9x20);
    assert_eq!("9x16".parse::<AspectRatioId>().unwrap(), AspectRatioId::Phone9x16);
    assert!("4:3".parse::<AspectRatioId>().is_err());
}
