//! Vector features and labeled sample regions

use crate::error::{Error, Result};
use geo_types::{coord, Geometry, Polygon, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Land-cover class identifier. Small non-negative integers; 255 is no-data.
pub type ClassLabel = u8;

/// Class value written to unclassified cells
pub const NODATA_CLASS: ClassLabel = u8::MAX;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: HashMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Polygonal footprint of the feature, if it has one
    pub fn polygon(&self) -> Option<Polygon<f64>> {
        match self.geometry.as_ref()? {
            Geometry::Polygon(p) => Some(p.clone()),
            Geometry::Rect(r) => Some(r.to_polygon()),
            Geometry::Triangle(t) => Some(t.to_polygon()),
            _ => None,
        }
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Append all features of `other`, keeping order
    pub fn merge(mut self, other: FeatureCollection) -> Self {
        self.features.extend(other.features);
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Turn polygon features into labeled sample regions, reading the class
    /// from the integer attribute `property`.
    ///
    /// Every feature must carry a polygonal geometry and an integer class in
    /// `0..255`; anything else is an `InvalidParameter` error naming the
    /// offending feature index.
    pub fn labeled_regions(&self, property: &str) -> Result<Vec<LabeledRegion>> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, feature)| {
                let geometry = feature.polygon().ok_or_else(|| Error::InvalidParameter {
                    name: "geometry",
                    value: format!("feature {}", i),
                    reason: "sample features must be polygons or rectangles".into(),
                })?;

                let label = match feature.get_property(property) {
                    Some(AttributeValue::Int(v)) if (0..NODATA_CLASS as i64).contains(v) => {
                        *v as ClassLabel
                    }
                    other => {
                        return Err(Error::InvalidParameter {
                            name: "class",
                            value: format!("{:?}", other),
                            reason: format!(
                                "feature {} needs an integer '{}' in 0..{}",
                                i, property, NODATA_CLASS
                            ),
                        })
                    }
                };

                Ok(LabeledRegion { geometry, label })
            })
            .collect()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// A hand-drawn training footprint tagged with its land-cover class.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRegion {
    pub geometry: Polygon<f64>,
    pub label: ClassLabel,
}

impl LabeledRegion {
    pub fn new(geometry: Polygon<f64>, label: ClassLabel) -> Self {
        Self { geometry, label }
    }

    /// Axis-aligned rectangle from two opposite corners in any order
    pub fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64, label: ClassLabel) -> Self {
        Self::new(rectangle(x0, y0, x1, y1), label)
    }
}

/// Axis-aligned rectangle polygon from two opposite corners in any order
pub fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::point;

    fn class_feature(x0: f64, y0: f64, x1: f64, y1: f64, class: i64) -> Feature {
        Feature::new(Geometry::Rect(Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 })))
            .with_property("class", AttributeValue::Int(class))
    }

    #[test]
    fn labeled_regions_from_merged_collections() {
        let mut ponds = FeatureCollection::new();
        ponds.push(class_feature(104.732, 8.622, 104.722, 8.612, 0));
        let mut water = FeatureCollection::new();
        water.push(class_feature(104.73, 8.70, 104.72, 8.69, 1));

        let regions = ponds.merge(water).labeled_regions("class").unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].label, 0);
        assert_eq!(regions[1].label, 1);
    }

    #[test]
    fn labeled_regions_rejects_bad_features() {
        let mut fc = FeatureCollection::new();
        fc.push(class_feature(0.0, 0.0, 1.0, 1.0, 300));
        assert!(fc.labeled_regions("class").is_err());

        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(Geometry::Point(point! { x: 0.0, y: 0.0 }))
            .with_property("class", AttributeValue::Int(1)));
        assert!(fc.labeled_regions("class").is_err());

        let mut fc = FeatureCollection::new();
        fc.push(class_feature(0.0, 0.0, 1.0, 1.0, 1));
        assert!(fc.labeled_regions("landcover").is_err());
    }

    #[test]
    fn rectangle_normalises_corners() {
        let r = LabeledRegion::rectangle(104.89, 8.73, 104.7, 8.55, 2);
        let ext = r.geometry.exterior();
        let xs: Vec<f64> = ext.coords().map(|c| c.x).collect();
        assert!(xs.iter().all(|x| (104.7..=104.89).contains(x)));
        assert_eq!(r.label, 2);
    }
}
