use super::*;

#[test]
fn catalog_has_one_entry_per_id() {
    let catalog = style_catalog();
    assert_eq!(catalog.len(), StyleId::ALL.len());
    for id in StyleId::ALL {
        assert_eq!(catalog.iter().filter(|s| s.id == id).count(), 1);
        assert_eq!(id.spec().id, id);
    }
}

#[test]
fn next_cycles_through_catalog() {
    let mut id = StyleId::Dark;
    let mut seen = Vec::new();
    for _ in 0..StyleId::ALL.len() {
        seen.push(id);
        id = id.next();
    }
    assert_eq!(id, StyleId::Dark);
    assert_eq!(seen, StyleId::ALL.to_vec());
}

#[test]
fn style_id_parse_and_serde() {
    assert_eq!("Retro".parse::<StyleId>().unwrap(), StyleId::Retro);
    assert!("sepia".parse::<StyleId>().is_err());
    let id: StyleId = serde_json::from_str("\"silver\"").unwrap();
    assert_eq!(id, StyleId::Silver);
}

#[test]
fn retro_colors_match_catalog() {
    let s = StyleId::Retro.spec();
    assert_eq!(s.text_color.to_hex(), "#4a3728");
    assert_eq!(s.background_color.to_hex(), "#fffcf0");
    assert!(!s.tile_source_template.contains("{r}"));
}

#[test]
fn label_defaults_and_placeholder() {
    let label: PlaceLabel = serde_json::from_str(r#"{"display_name": "Kyoto"}"#).unwrap();
    assert_eq!(label.accent_color, Color::WHITE);
    assert!(label.description.is_empty());
    assert!(!label.is_resolving());
    assert!(PlaceLabel::named(RESOLVING_NAME).is_resolving());
}
