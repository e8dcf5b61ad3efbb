//! Popup HTML bound to map features.

use geojson::Feature;

use super::style::indicator_value;
use crate::data::model::Value;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Text of a code property; empty, zero, false and missing read as `N/A`.
fn code_or_na(feature: &Feature, key: &str) -> String {
    match feature.property(key).map(Value::from) {
        None | Some(Value::Null) | Some(Value::Bool(false)) | Some(Value::Integer(0)) => {
            "N/A".to_string()
        }
        Some(Value::Float(v)) if v == 0.0 || v.is_nan() => "N/A".to_string(),
        Some(Value::String(s)) if s.is_empty() => "N/A".to_string(),
        Some(v) => escape(&v.to_string()),
    }
}

/// Commune and îlot lines shared by every îlot popup.
fn ilot_header(feature: &Feature) -> String {
    format!(
        "<b>Code Commune:</b> {}<br>\n<b>Code Îlot:</b> {}",
        code_or_na(feature, "depcom_2018"),
        code_or_na(feature, "code")
    )
}

/// One decimal with ties rounded away from zero (`12.25` → `12.3`), the
/// way the page's number formatting does it.
fn one_decimal(v: f64) -> String {
    format!("{:.1}", (v * 10.0).round() / 10.0)
}

/// Popup of a choropleth îlot: codes plus the indicator rounded to one decimal.
pub fn ilot_popup(feature: &Feature, indicator: &str, label: &str, unit: &str) -> String {
    let value = match indicator_value(feature, indicator) {
        Some(v) if !v.is_nan() => format!("{}{unit}", one_decimal(v)),
        _ => "NA".to_string(),
    };
    format!("{}<br>\n<b>{}:</b> {value}", ilot_header(feature), escape(label))
}

/// Popup of an îlot outline.
pub fn boundary_popup(feature: &Feature) -> String {
    ilot_header(feature)
}

/// Popup of a NUTS cluster outline.
pub fn cluster_popup(feature: &Feature) -> String {
    format!("<b>NUTS ID:</b> {}<br>", code_or_na(feature, "NUTS_ID"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn feature(props: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    #[test]
    fn shows_rounded_value_with_unit() {
        let f = feature(json!({ "depcom_2018": "97101", "code": "0001", "evol": 12.345 }));
        assert_eq!(
            ilot_popup(&f, "evol", "Variation de Surface absolue", "m²"),
            "<b>Code Commune:</b> 97101<br>\n<b>Code Îlot:</b> 0001<br>\n\
             <b>Variation de Surface absolue:</b> 12.3m²"
        );
    }

    #[test]
    fn ties_round_away_from_zero() {
        let f = feature(json!({ "depcom_2018": "97101", "code": "0001", "evol": 12.25 }));
        assert!(ilot_popup(&f, "evol", "Evol", "%").ends_with("<b>Evol:</b> 12.3%"));
        assert_eq!(one_decimal(0.25), "0.3");
        assert_eq!(one_decimal(-12.25), "-12.3");
        assert_eq!(one_decimal(7.0), "7.0");
    }

    #[test]
    fn missing_or_text_value_is_na() {
        let f = feature(json!({ "depcom_2018": "97101", "code": "0001", "evol": null }));
        assert!(ilot_popup(&f, "evol", "Evol", "%").ends_with("<b>Evol:</b> NA"));

        let f = feature(json!({ "depcom_2018": "97101", "code": "0001", "evol": "n/a" }));
        assert!(ilot_popup(&f, "evol", "Evol", "%").ends_with("<b>Evol:</b> NA"));
    }

    #[test]
    fn missing_codes_read_na() {
        let f = feature(json!({ "code": "" }));
        assert_eq!(
            boundary_popup(&f),
            "<b>Code Commune:</b> N/A<br>\n<b>Code Îlot:</b> N/A"
        );
    }

    #[test]
    fn cluster_popup_shows_nuts_id() {
        let f = feature(json!({ "NUTS_ID": "FRY10" }));
        assert_eq!(cluster_popup(&f), "<b>NUTS ID:</b> FRY10<br>");
        assert_eq!(cluster_popup(&feature(json!({}))), "<b>NUTS ID:</b> N/A<br>");
    }

    #[test]
    fn escapes_markup_in_codes() {
        let f = feature(json!({ "depcom_2018": "<x>", "code": "a&b" }));
        assert!(boundary_popup(&f).contains("&lt;x&gt;"));
        assert!(boundary_popup(&f).contains("a&amp;b"));
    }
}
