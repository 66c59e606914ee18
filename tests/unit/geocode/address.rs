use super::*;
use serde_json::json;

fn fields(v: serde_json::Value) -> AddressFields {
    AddressFields::from_json(&v)
}

fn city(v: serde_json::Value) -> String {
    pick_admin_name(&fields(v), Granularity::City, FALLBACK_NAME)
}

#[test]
fn plain_city_field_wins_when_unsuffixed() {
    assert_eq!(
        city(json!({"state": "California", "city": "Los Angeles"})),
        "Los Angeles"
    );
}

#[test]
fn district_in_city_slot_falls_back_to_state_district() {
    assert_eq!(
        city(json!({"city": "Pudong District", "state_district": "Shanghai"})),
        "Shanghai"
    );
    assert_eq!(city(json!({"city": "浦东新区", "state_district": "上海市"})), "上海市");
}

#[test]
fn nothing_usable_gives_fallback() {
    assert_eq!(city(json!({})), FALLBACK_NAME);
    assert_eq!(city(json!({"city": "", "state": null, "road": "Main St"})), FALLBACK_NAME);
    assert_eq!(
        pick_admin_name(&AddressFields::default(), Granularity::District, FALLBACK_NAME),
        FALLBACK_NAME
    );
    assert_eq!(
        pick_admin_name(&AddressFields::default(), Granularity::Province, "Somewhere"),
        "Somewhere"
    );
}

#[test]
fn city_rules_apply_in_order() {
    assert_eq!(
        city(json!({"municipality": "Ville", "state_district": "Foo City", "city": "Bar"})),
        "Ville"
    );
    assert_eq!(
        city(json!({"state_district": "杭州市", "city": "西湖区"})),
        "杭州市"
    );
    assert_eq!(
        city(json!({"state_district": "Osaka Prefecture", "city": "Osaka"})),
        "Osaka Prefecture"
    );
    assert_eq!(city(json!({"city": "Kita Ward"})), "Kita Ward");
    assert_eq!(city(json!({"city": "Hennepin County"})), "Hennepin County");
    assert_eq!(city(json!({"state": "重庆市", "county": "渝中区"})), "重庆市");
    assert_eq!(city(json!({"state": "Tianjin", "suburb": "Heping"})), "Tianjin");
    assert_eq!(city(json!({"state": "Texas", "town": "Marfa"})), "Marfa");
}

#[test]
fn province_is_verbatim() {
    let f = fields(json!({"state": "Zhejiang Province", "city": "Hangzhou"}));
    assert_eq!(
        pick_admin_name(&f, Granularity::Province, FALLBACK_NAME),
        "Zhejiang Province"
    );
    let f = fields(json!({"province": "Ontario"}));
    assert_eq!(pick_admin_name(&f, Granularity::Province, FALLBACK_NAME), "Ontario");
}

#[test]
fn district_prefers_suffixed_city_then_sub_city_fields() {
    let f = fields(json!({"city": "Pudong District", "suburb": "Lujiazui"}));
    assert_eq!(
        pick_admin_name(&f, Granularity::District, FALLBACK_NAME),
        "Pudong District"
    );

    let f = fields(json!({"city": "Shanghai", "county": "Chongming", "suburb": "Baozhen"}));
    assert_eq!(pick_admin_name(&f, Granularity::District, FALLBACK_NAME), "Chongming");

    let f = fields(json!({"city": "上海市", "district": "陆家嘴街道", "suburb": "浦东新区"}));
    assert_eq!(pick_admin_name(&f, Granularity::District, FALLBACK_NAME), "浦东新区");

    let f = fields(json!({"city_district": "Mitte", "town": "Berlin"}));
    assert_eq!(pick_admin_name(&f, Granularity::District, FALLBACK_NAME), "Mitte");
}

#[test]
fn loose_values_are_tolerated() {
    let f = fields(json!({"city": 42, "state": ["x"], "town": "  Oslo  "}));
    assert_eq!(f.city.as_deref(), Some("42"));
    assert_eq!(f.state, None);
    assert_eq!(f.town.as_deref(), Some("Oslo"));
}

#[test]
fn granularity_parses_and_serializes() {
    assert_eq!("District".parse::<Granularity>().unwrap(), Granularity::District);
    assert_eq!("state".parse::<Granularity>().unwrap(), Granularity::Province);
    assert!("street".parse::<Granularity>().is_err());
    assert_eq!(Granularity::default(), Granularity::City);
    assert_eq!(
        serde_json::to_string(&Granularity::Province).unwrap(),
        "\"province\""
    );
}
