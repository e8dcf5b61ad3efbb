use std::collections::HashMap;

use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};

use super::legend::legend_html;
use super::popup::{boundary_popup, cluster_popup, ilot_popup};
use super::style::{indicator_value, style_function, FeatureStyle};
use crate::classify::{compute_quantiles, Classifier, ClassifyError};
use crate::color::ColorScale;
use crate::config::Indicator;
use crate::data::model::{Record, Value};
use crate::join::{ilot_key, key_text, KEY_FIELDS};

/// Store `style` and `popup` as foreign members of `feature`.
fn decorate(feature: &mut Feature, style: &FeatureStyle, popup: String) {
    let members = feature.foreign_members.get_or_insert_with(JsonObject::new);
    members.insert(
        "style".to_string(),
        serde_json::to_value(style).unwrap_or(JsonValue::Null),
    );
    members.insert("popup".to_string(), JsonValue::String(popup));
}

fn collection_of(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Îlots colored by the quantile bucket of one indicator.
#[derive(Debug, Clone)]
pub struct ChoroplethLayer {
    pub indicator: Indicator,
    pub classifier: Classifier,
    /// Input features, each decorated with `style` and `popup` members.
    pub features: FeatureCollection,
}

impl ChoroplethLayer {
    /// Classify `collection` by `indicator` at the quantiles `probs`.
    ///
    /// Breakpoints are computed from the features carrying a numeric value;
    /// the others are kept and drawn with the scale's last color.
    pub fn build(
        collection: &FeatureCollection,
        indicator: &Indicator,
        probs: &[f64],
        scale: &ColorScale,
    ) -> Result<Self, ClassifyError> {
        let values: Vec<f64> = collection
            .features
            .iter()
            .filter_map(|f| indicator_value(f, &indicator.indicator))
            .collect();
        let breakpoints = compute_quantiles(&values, probs)?;
        log::debug!(
            "{}: breakpoints {:?} from {} of {} features",
            indicator.indicator,
            breakpoints.values(),
            values.len(),
            collection.features.len()
        );
        let classifier = Classifier::new(breakpoints, scale.clone())?;

        let features = {
            let style = style_function(&indicator.indicator, &classifier);
            collection
                .features
                .iter()
                .map(|f| {
                    let mut feature = f.clone();
                    let popup =
                        ilot_popup(f, &indicator.indicator, &indicator.label, &indicator.unit);
                    decorate(&mut feature, &style(f), popup);
                    feature
                })
                .collect()
        };

        Ok(Self {
            indicator: indicator.clone(),
            classifier,
            features: collection_of(features),
        })
    }

    pub fn legend_html(&self) -> String {
        legend_html(&self.indicator.label, &self.indicator.unit, &self.classifier)
    }
}

/// Outline layer: transparent fill, black stroke, codes in the popup.
pub struct BoundaryLayer;

impl BoundaryLayer {
    /// Îlot outlines (stroke width 2).
    pub fn ilots(collection: &FeatureCollection) -> FeatureCollection {
        Self::outline(collection, 2.0, boundary_popup)
    }

    /// NUTS cluster outlines (stroke width 1).
    pub fn clusters(collection: &FeatureCollection) -> FeatureCollection {
        Self::outline(collection, 1.0, cluster_popup)
    }

    fn outline(
        collection: &FeatureCollection,
        weight: f64,
        popup: fn(&Feature) -> String,
    ) -> FeatureCollection {
        let style = FeatureStyle::outline(weight);
        let features = collection
            .features
            .iter()
            .map(|f| {
                let mut feature = f.clone();
                decorate(&mut feature, &style, popup(f));
                feature
            })
            .collect();
        collection_of(features)
    }
}

/// Copy the fields of `records` onto the properties of the matching
/// features (same `code` and `depcom_2018`). Returns how many features
/// were enriched.
pub fn attach_records(collection: &mut FeatureCollection, records: &[Record]) -> usize {
    let mut by_key: HashMap<(String, String), &Record> = HashMap::new();
    for rec in records {
        if let (Some(code), Some(depcom)) = ilot_key(rec) {
            by_key.entry((code, depcom)).or_insert(rec);
        }
    }

    let mut matched = 0;
    for feature in &mut collection.features {
        let code = key_text(feature.property(KEY_FIELDS[0]).map(Value::from).as_ref());
        let depcom = key_text(feature.property(KEY_FIELDS[1]).map(Value::from).as_ref());
        let (Some(code), Some(depcom)) = (code, depcom) else {
            continue;
        };
        let Some(rec) = by_key.get(&(code, depcom)) else {
            continue;
        };
        for (k, v) in rec.iter() {
            let json = serde_json::to_value(v).unwrap_or(JsonValue::Null);
            feature.set_property(k, json);
        }
        matched += 1;
    }

    log::debug!(
        "Attached {} records to {matched} of {} features",
        records.len(),
        collection.features.len()
    );
    matched
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn feature(props: JsonValue) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    fn indicator() -> Indicator {
        Indicator {
            indicator: "evol".to_string(),
            label: "Evolution".to_string(),
            color_scale: "ramp".to_string(),
            unit: "%".to_string(),
        }
    }

    fn collection() -> FeatureCollection {
        collection_of(vec![
            feature(json!({ "code": "1", "depcom_2018": "97101", "evol": 0.0 })),
            feature(json!({ "code": "2", "depcom_2018": "97101", "evol": 50.0 })),
            feature(json!({ "code": "3", "depcom_2018": "97101", "evol": 100.0 })),
            feature(json!({ "code": "4", "depcom_2018": "97101", "evol": null })),
        ])
    }

    fn member<'a>(f: &'a Feature, key: &str) -> &'a JsonValue {
        &f.foreign_members.as_ref().unwrap()[key]
    }

    #[test]
    fn choropleth_decorates_every_feature() {
        let scale = ColorScale::ramp(2);
        let layer = ChoroplethLayer::build(&collection(), &indicator(), &[0.0, 0.5, 1.0], &scale)
            .unwrap();

        assert_eq!(layer.classifier.breakpoints().values(), [0.0, 50.0, 100.0]);
        let features = &layer.features.features;
        assert_eq!(features.len(), 4);

        let fill = |i: usize| member(&features[i], "style")["fillColor"].clone();
        assert_eq!(fill(0), json!(scale.colors()[0].to_string()));
        assert_eq!(fill(1), json!(scale.colors()[0].to_string()));
        assert_eq!(fill(2), json!(scale.colors()[1].to_string()));
        assert_eq!(fill(3), json!(scale.colors()[1].to_string()));

        let popup = member(&features[3], "popup").as_str().unwrap();
        assert!(popup.ends_with("<b>Evolution:</b> NA"));
        assert!(layer.legend_html().contains("Evolution (%)"));
    }

    #[test]
    fn choropleth_without_values_is_empty_input() {
        let empty = collection_of(vec![feature(json!({ "evol": null }))]);
        let err = ChoroplethLayer::build(&empty, &indicator(), &[0.0, 1.0], &ColorScale::ramp(1))
            .unwrap_err();
        assert_eq!(err, ClassifyError::EmptyInput);
    }

    #[test]
    fn boundary_layers_use_outline_styles() {
        let ilots = BoundaryLayer::ilots(&collection());
        assert_eq!(member(&ilots.features[0], "style")["weight"], json!(2.0));
        assert!(member(&ilots.features[0], "popup")
            .as_str()
            .unwrap()
            .contains("Code Îlot:</b> 1"));

        let clusters = BoundaryLayer::clusters(&collection());
        assert_eq!(member(&clusters.features[0], "style")["weight"], json!(1.0));
        assert_eq!(
            member(&clusters.features[0], "popup"),
            &json!("<b>NUTS ID:</b> N/A<br>")
        );
    }

    #[test]
    fn attaches_records_by_composite_key() {
        let mut fc = collection();
        let records: Vec<Record> = vec![
            [
                ("code", Value::from("2")),
                ("depcom_2018", Value::Integer(97101)),
                ("aire_2020", Value::Float(120.0)),
            ]
            .into_iter()
            .collect(),
            [
                ("code", Value::from("9")),
                ("depcom_2018", Value::from("97101")),
                ("aire_2020", Value::Float(1.0)),
            ]
            .into_iter()
            .collect(),
        ];

        assert_eq!(attach_records(&mut fc, &records), 1);
        assert_eq!(fc.features[1].property("aire_2020"), Some(&json!(120.0)));
        assert_eq!(fc.features[0].property("aire_2020"), None);
    }
}
