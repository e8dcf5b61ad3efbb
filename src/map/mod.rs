/// Map artifacts: styled layers, popups, legend and îlot lookup.
///
/// Nothing here draws anything; the output is GeoJSON and HTML for a
/// Leaflet page to consume.

pub mod centroid;
pub mod layer;
pub mod legend;
pub mod popup;
pub mod style;
