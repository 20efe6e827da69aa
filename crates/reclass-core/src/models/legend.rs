use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ClassCatalog, ClassValue};

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional)
    pub fn parse_hex(s: &str) -> Option<Rgba> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let digits: Vec<u8> = hex
                    .chars()
                    .filter_map(|c| c.to_digit(16))
                    .map(|d| (d * 17) as u8)
                    .collect();
                Some(Rgba { r: digits[0], g: digits[1], b: digits[2], a: 255 })
            }
            6 => Some(Rgba { r: channel(0)?, g: channel(2)?, b: channel(4)?, a: 255 }),
            8 => Some(Rgba { r: channel(0)?, g: channel(2)?, b: channel(4)?, a: channel(6)? }),
            _ => None,
        }
    }

    /// Parse a hex color, falling back to opaque black
    pub fn from_hex_or_black(s: &str) -> Rgba {
        Rgba::parse_hex(s).unwrap_or_else(|| {
            tracing::warn!("Color '{}' is not a hex color, using black", s);
            Rgba::BLACK
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One categorical legend item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub code: i64,
    pub label: String,
    pub color: Rgba,
}

/// Categorical color table attached to raster outputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legend {
    entries: Vec<LegendEntry>,
}

impl Legend {
    /// Build the legend from a destination catalog. Only integer codes can
    /// appear in a raster, text codes are skipped.
    pub fn from_catalog(catalog: &ClassCatalog) -> Legend {
        let entries = catalog
            .iter()
            .filter_map(|entry| match entry.code {
                ClassValue::Int(code) => Some(LegendEntry {
                    code,
                    label: entry.label.clone(),
                    color: Rgba::from_hex_or_black(&entry.color),
                }),
                ClassValue::Text(ref code) => {
                    tracing::warn!("Destination class '{}' is not an integer code, left out of the legend", code);
                    None
                }
            })
            .collect();
        // catalog iteration is ordered, so entries are sorted by code
        Legend { entries }
    }

    pub fn entries(&self) -> &[LegendEntry] {
        &self.entries
    }

    pub fn get(&self, code: i64) -> Option<&LegendEntry> {
        self.entries
            .binary_search_by_key(&code, |e| e.code)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_code(&self) -> Option<i64> {
        self.entries.last().map(|e| e.code)
    }

    /// Image properties understood by the remote service's categorical
    /// visualization
    pub fn visualization_properties(&self, band: &str) -> BTreeMap<String, String> {
        let join = |f: &dyn Fn(&LegendEntry) -> String| {
            self.entries.iter().map(f).collect::<Vec<_>>().join(",")
        };

        let mut props = BTreeMap::new();
        props.insert("visualization_0_name".to_string(), "Classification".to_string());
        props.insert("visualization_0_bands".to_string(), band.to_string());
        props.insert("visualization_0_type".to_string(), "categorical".to_string());
        props.insert("visualization_0_labels".to_string(), join(&|e| e.label.clone()));
        props.insert("visualization_0_palette".to_string(), join(&|e| e.color.to_hex()));
        props.insert("visualization_0_values".to_string(), join(&|e| e.code.to_string()));
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassEntry;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgba::parse_hex("#ff0000"), Some(Rgba { r: 255, g: 0, b: 0, a: 255 }));
        assert_eq!(Rgba::parse_hex("0f0"), Some(Rgba { r: 0, g: 255, b: 0, a: 255 }));
        assert_eq!(Rgba::parse_hex("#0000ff80"), Some(Rgba { r: 0, g: 0, b: 255, a: 128 }));
        assert_eq!(Rgba::parse_hex("green"), None);
        assert_eq!(Rgba::parse_hex("#12345"), None);
    }

    #[test]
    fn test_invalid_color_falls_back_to_black() {
        assert_eq!(Rgba::from_hex_or_black("not-a-color"), Rgba::BLACK);
    }

    #[test]
    fn test_legend_from_catalog() {
        let catalog: ClassCatalog = vec![
            ClassEntry::new(20, "crop", "#ffff00"),
            ClassEntry::new(10, "forest", "#00ff00"),
            ClassEntry::new("other", "text code", "#ffffff"),
        ]
        .into_iter()
        .collect();

        let legend = Legend::from_catalog(&catalog);
        assert_eq!(legend.entries().len(), 2);
        assert_eq!(legend.entries()[0].code, 10);
        assert_eq!(legend.max_code(), Some(20));
        assert_eq!(legend.get(20).unwrap().label, "crop");
        assert!(legend.get(30).is_none());
    }

    #[test]
    fn test_visualization_properties() {
        let catalog: ClassCatalog = vec![
            ClassEntry::new(1, "forest", "#00ff00"),
            ClassEntry::new(2, "water", "#0000ff"),
        ]
        .into_iter()
        .collect();

        let props = Legend::from_catalog(&catalog).visualization_properties("landcover");
        assert_eq!(props["visualization_0_bands"], "landcover");
        assert_eq!(props["visualization_0_labels"], "forest,water");
        assert_eq!(props["visualization_0_palette"], "#00ff00,#0000ff");
        assert_eq!(props["visualization_0_values"], "1,2");
    }
}
