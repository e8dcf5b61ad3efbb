use crate::classify::Classifier;
use crate::color::ColorToken;

const TEXT_STYLE: &str = "color:black; text-shadow: -1px 0px 1px white, 0px -1px 1px white, \
                          1px 0px 1px white, 0px 1px 1px white;";

const BOX_STYLE: &str = "opacity: 1; background-color: white; padding: 8px; \
                         border-radius: 5px; box-shadow: 0 0 15px rgba(0, 0, 0, 0.2);";

/// One legend line: a bucket's bounds and its color.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub from: f64,
    pub to: f64,
    pub color: ColorToken,
}

/// Legend lines of `classifier`, one per bucket.
pub fn legend_entries(classifier: &Classifier) -> Vec<LegendEntry> {
    classifier
        .breakpoints()
        .ranges()
        .zip(classifier.scale().colors())
        .map(|((from, to), color)| LegendEntry {
            from,
            to,
            color: *color,
        })
        .collect()
}

/// Round half up, as the legend bounds have always been rounded
/// (`-2.5` → `-2`, `2.5` → `3`).
fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Legend box for a choropleth layer.
pub fn legend_html(label: &str, unit: &str, classifier: &Classifier) -> String {
    let lines: Vec<String> = legend_entries(classifier)
        .iter()
        .map(|entry| {
            format!(
                "<i style=\"background:{}; width:18px; height:18px; float:left; \
                 margin-right:8px; opacity:1;\"></i>\
                 <span style=\"{TEXT_STYLE}\">{} &ndash; {}</span> {unit}",
                entry.color,
                round_half_up(entry.from),
                round_half_up(entry.to),
            )
        })
        .collect();

    format!(
        "<div class=\"info legend\" style=\"{BOX_STYLE}\">\
         <h4 style=\"{TEXT_STYLE}\">{label} ({unit})</h4>{}</div>",
        lines.join("<br>")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::compute_quantiles;
    use crate::color::ColorScale;

    fn classifier() -> Classifier {
        let q = compute_quantiles(&[-2.5, 0.0, 10.4, 20.6, 40.5], &[0.0, 0.25, 0.5, 0.75, 1.0])
            .unwrap();
        let scale = ColorScale::from_hex(
            "blueScale",
            &["#F0F8FF", "#ADD8E6", "#87CEFA", "#4682B4", "#00008B"],
        )
        .unwrap();
        Classifier::new(q, scale).unwrap()
    }

    #[test]
    fn one_entry_per_bucket() {
        let entries = legend_entries(&classifier());
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].from, -2.5);
        assert_eq!(entries[3].to, 40.5);
        assert_eq!(entries[3].color.to_string(), "#4682B4");
    }

    #[test]
    fn html_lists_rounded_bounds() {
        let html = legend_html("Variation de Surface absolue", "m²", &classifier());
        assert!(html.starts_with("<div class=\"info legend\""));
        assert!(html.contains(">Variation de Surface absolue (m²)</h4>"));
        assert_eq!(html.matches("&ndash;").count(), 4);
        assert!(html.contains(">-2 &ndash; 0</span> m²"));
        assert!(html.contains(">21 &ndash; 41</span> m²"));
        assert!(html.contains("background:#F0F8FF;"));
        assert!(!html.contains("#00008B"));
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
    }
}
