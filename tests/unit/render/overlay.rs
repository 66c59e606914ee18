use super::*;
use crate::scene::model::{RESOLVING_NAME, StyleId};

fn tokyo() -> Location {
    Location::new(35.6762, 139.6503).unwrap()
}

fn label(name: &str) -> PlaceLabel {
    PlaceLabel {
        display_name: name.to_owned(),
        country_or_region: "Japan".to_owned(),
        description: "A neon-lit metropolis where tradition meets the future.".to_owned(),
        accent_color: "#ff0055".parse().unwrap(),
    }
}

#[test]
fn regions_fit_inside_the_target() {
    let r = LabelRegions::for_size(Size::new(340.0, 718.0));
    assert!(r.top > 0.0);
    assert!(r.accent_y < r.name_top);
    assert!(r.name_top < r.country_top);
    assert!(r.country_top < r.coords_top);
    assert!(r.coords_top < r.rule_y);
    assert!(r.rule_y < r.desc_top);
    assert!(r.desc_top < r.bottom);
    assert_eq!(r.bottom, 718.0 - 64.0);
}

#[test]
fn long_names_shrink_but_not_below_minimum() {
    assert_eq!(fit_name_size("Tokyo", 276.0), NAME_SIZE);
    let long = fit_name_size("Llanfairpwllgwyngyll", 276.0);
    assert!(long < NAME_SIZE);
    assert!(long >= MIN_NAME_SIZE);
    assert_eq!(fit_name_size(&"W".repeat(200), 276.0), MIN_NAME_SIZE);
}

#[test]
fn description_wraps_to_three_lines_with_ellipsis() {
    let text = "word ".repeat(200);
    let lines = wrap_lines(&text, 11.0, 200.0, DESC_MAX_LINES);
    assert_eq!(lines.len(), DESC_MAX_LINES);
    assert!(lines[2].ends_with('\u{2026}'));

    let short = wrap_lines("Where the mountain meets two oceans.", 11.0, 234.0, 3);
    assert_eq!(short.len(), 1);
    assert!(!short[0].ends_with('\u{2026}'));

    assert!(wrap_lines("", 11.0, 234.0, 3).is_empty());
}

#[test]
fn unspaced_text_breaks_between_characters() {
    let text = "东方明珠塔与外滩的万国建筑群隔江相望夜晚灯光璀璨";
    let lines = wrap_lines(text, 11.0, 100.0, 3);
    assert!(lines.len() > 1);
    assert!(lines.iter().all(|l| estimate_width(l, 11.0, 0.0) <= 100.0 + 11.0));
}

#[test]
fn svg_escapes_label_text_and_honors_show_labels() {
    let style = StyleId::Dark.spec();
    let svg = overlay_svg(
        Size::new(340.0, 718.0),
        &style,
        &label("Fish & <Chips>"),
        tokyo(),
        true,
    );
    assert!(svg.contains("Fish &amp; &lt;Chips&gt;"));
    assert!(svg.contains("JAPAN"));
    assert!(svg.contains("35.6762\u{b0} N / 139.6503\u{b0} E"));
    assert!(svg.contains("url(#vignette)"));

    let bare = overlay_svg(Size::new(340.0, 718.0), &style, &label("Tokyo"), tokyo(), false);
    assert!(!bare.contains("<text"));
    assert!(bare.contains("url(#dots)"));
}

#[test]
fn empty_and_placeholder_names_keep_the_layout() {
    let style = StyleId::Light.spec();
    let size = Size::new(340.0, 718.0);
    let coords_line = |svg: &str| {
        svg.split("<text")
            .find(|t| t.contains("monospace"))
            .map(|t| t.split('>').next().unwrap_or_default().to_owned())
    };

    let full = overlay_svg(size, &style, &label("Tokyo"), tokyo(), true);
    let empty = overlay_svg(size, &style, &label(""), tokyo(), true);
    let resolving = overlay_svg(size, &style, &label(RESOLVING_NAME), tokyo(), true);

    assert!(coords_line(&full).is_some());
    assert_eq!(coords_line(&full), coords_line(&empty));
    assert_eq!(coords_line(&full), coords_line(&resolving));
    assert!(resolving.contains("opacity=\"0.5\">Locating"));
}

#[test]
fn label_block_is_centered() {
    let style = StyleId::Dark.spec();
    let svg = overlay_svg(Size::new(340.0, 718.0), &style, &label("Tokyo"), tokyo(), true);

    let texts: Vec<&str> = svg.split("<text ").skip(1).collect();
    assert!(texts.len() >= 4, "{svg}");
    for t in &texts {
        assert!(t.starts_with(r#"x="170.00""#), "{t}");
        assert!(t.contains(r#"text-anchor="middle""#), "{t}");
    }
    assert!(svg.contains(r#"<rect x="146.00""#), "{svg}");
    assert!(svg.contains(r#"<line x1="52.70""#) && svg.contains(r#"x2="287.30""#), "{svg}");
}
