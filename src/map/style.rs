use geojson::Feature;
use serde::Serialize;

use crate::classify::Classifier;
use crate::color::ColorToken;
use crate::data::model::Value;

/// Path options of one rendered feature, named as Leaflet expects them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    pub fill_color: String,
    pub fill_opacity: f64,
    /// Stroke color.
    pub color: String,
    /// Stroke width in pixels.
    pub weight: f64,
    /// Stroke opacity.
    pub opacity: f64,
}

impl FeatureStyle {
    /// Filled îlot of a choropleth layer.
    pub fn choropleth(fill: ColorToken) -> Self {
        Self {
            fill_color: fill.to_string(),
            fill_opacity: 0.7,
            color: "black".to_string(),
            weight: 0.7,
            opacity: 1.0,
        }
    }

    /// Unfilled outline (îlot or cluster boundaries).
    pub fn outline(weight: f64) -> Self {
        Self {
            fill_color: "transparent".to_string(),
            fill_opacity: 0.0,
            color: "black".to_string(),
            weight,
            opacity: 1.0,
        }
    }
}

/// Numeric value of `indicator` on `feature`, if any.
pub fn indicator_value(feature: &Feature, indicator: &str) -> Option<f64> {
    feature
        .property(indicator)
        .and_then(|v| Value::from(v).as_f64())
}

/// Per-feature style callback for `indicator`.
pub fn style_function<'a>(
    indicator: &'a str,
    classifier: &'a Classifier,
) -> impl Fn(&Feature) -> FeatureStyle + 'a {
    move |feature: &Feature| {
        FeatureStyle::choropleth(classifier.color(indicator_value(feature, indicator)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::classify::compute_quantiles;
    use crate::color::ColorScale;

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
    fn serializes_with_leaflet_names() {
        let style = FeatureStyle::choropleth(ColorToken::rgb(0, 0, 0x8B));
        let json = serde_json::to_value(&style).unwrap();
        assert_eq!(
            json,
            json!({
                "fillColor": "#00008B",
                "fillOpacity": 0.7,
                "color": "black",
                "weight": 0.7,
                "opacity": 1.0,
            })
        );
    }

    #[test]
    fn style_function_colors_by_indicator() {
        let q = compute_quantiles(&[0.0, 50.0, 100.0], &[0.0, 0.5, 1.0]).unwrap();
        let scale = ColorScale::ramp(2);
        let classifier = Classifier::new(q, scale.clone()).unwrap();
        let style = style_function("evol", &classifier);

        let low = style(&feature(json!({ "evol": 10 })));
        let high = style(&feature(json!({ "evol": 90.5 })));
        let missing = style(&feature(json!({ "evol": null })));

        assert_eq!(low.fill_color, scale.colors()[0].to_string());
        assert_eq!(high.fill_color, scale.colors()[1].to_string());
        assert_eq!(missing.fill_color, scale.colors()[1].to_string());
        assert_eq!(low.weight, 0.7);
    }

    #[test]
    fn outline_is_transparent() {
        let style = FeatureStyle::outline(2.0);
        assert_eq!(style.fill_color, "transparent");
        assert_eq!(style.fill_opacity, 0.0);
        assert_eq!(style.weight, 2.0);
    }

    #[test]
    fn indicator_value_ignores_text() {
        let f = feature(json!({ "a": "12", "b": 3 }));
        assert_eq!(indicator_value(&f, "a"), None);
        assert_eq!(indicator_value(&f, "b"), Some(3.0));
        assert_eq!(indicator_value(&f, "c"), None);
    }
}
