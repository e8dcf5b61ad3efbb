use geojson::{FeatureCollection, Value as Geometry};

use crate::data::model::Value;

fn property_text(feature: &geojson::Feature, key: &str) -> Option<String> {
    feature.property(key).map(|v| Value::from(v).to_string())
}

/// Center of the îlot `code` in commune `depcom`, as `[lat, lon]`.
///
/// Averages the vertices of the first exterior ring (of the first polygon
/// for multi-polygons). Missing îlots are logged and yield `None`.
pub fn ilot_centroid(collection: &FeatureCollection, depcom: &str, code: &str) -> Option<[f64; 2]> {
    let feature = collection.features.iter().find(|f| {
        property_text(f, "depcom_2018").as_deref() == Some(depcom)
            && property_text(f, "code").as_deref() == Some(code)
    });
    let Some(feature) = feature else {
        log::error!("No feature found for depcom {depcom} and code {code}");
        return None;
    };

    let ring = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Geometry::Polygon(rings)) => rings.first(),
        Some(Geometry::MultiPolygon(polygons)) => polygons.first().and_then(|p| p.first()),
        _ => None,
    };
    let Some(ring) = ring.filter(|r| !r.is_empty()) else {
        log::warn!("Îlot {depcom}/{code} has no polygon ring");
        return None;
    };

    let (mut sum_lon, mut sum_lat) = (0.0, 0.0);
    for position in ring {
        sum_lon += position.first().copied().unwrap_or_default();
        sum_lat += position.get(1).copied().unwrap_or_default();
    }
    let n = ring.len() as f64;
    Some([sum_lat / n, sum_lon / n])
}
