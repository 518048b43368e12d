use std::path::Path;

use geo_types::{coord, Rect};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{error::Result, types::AnnotationRecord};

/// A box corner as `[x, y]` in pixel coordinates
pub type Corner = [f64; 2];

/// Where overlay text is anchored relative to its box
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TextAnchor {
    Center,
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

/// Overlay text styling for the instance labels
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TextStyle {
    /// Format string, `{instance}` is replaced by the instance label
    pub format: String,
    pub size: u32,
    pub color: String,
    pub anchor: TextAnchor,
    /// Offset applied to the anchor point, `[dy, dx]`
    pub translation: [f64; 2],
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            format: "instance: {instance}".to_string(),
            size: 8,
            color: "green".to_string(),
            anchor: TextAnchor::UpperLeft,
            translation: [-3.0, 0.0],
        }
    }
}

impl TextStyle {
    pub fn render(&self, instance: &str) -> String {
        self.format.replace("{instance}", instance)
    }
}

/// Box outline styling
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BoxStyle {
    pub face_color: String,
    pub edge_color: String,
    pub edge_width: f32,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            face_color: "transparent".to_string(),
            edge_color: "green".to_string(),
            edge_width: 3.0,
        }
    }
}

/// Everything a viewer needs to draw the bounding boxes of one image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayGeometry {
    /// Four corners per instance: top-left, top-right, bottom-right, bottom-left
    pub boxes: Vec<[Corner; 4]>,
    /// Stringified instance index per box
    pub instances: Vec<String>,
    /// Category per box, parallel to `boxes`
    pub category_ids: Vec<u64>,
    pub text: TextStyle,
    pub style: BoxStyle,
    pub image_width: u32,
    pub image_height: u32,
}

impl DisplayGeometry {
    pub fn from_records(records: &[AnnotationRecord], image_width: u32, image_height: u32) -> Self {
        let boxes = records
            .iter()
            .map(|record| {
                let [x0, y0, x1, y1] = record.bbox_xyxy().map(f64::from);
                [[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
            })
            .collect();

        Self {
            boxes,
            instances: (0..records.len()).map(|i| i.to_string()).collect(),
            category_ids: records.iter().map(|r| r.category_id).collect(),
            text: TextStyle::default(),
            style: BoxStyle::default(),
            image_width,
            image_height,
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Overlay text for each box
    pub fn labels(&self) -> Vec<String> {
        self.instances.iter().map(|i| self.text.render(i)).collect()
    }

    /// Export the boxes as a GeoJSON feature collection
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.boxes.len());

        for (i, corners) in self.boxes.iter().enumerate() {
            let rect = Rect::new(
                coord! { x: corners[0][0], y: corners[0][1] },
                coord! { x: corners[2][0], y: corners[2][1] },
            );
            let geometry = Geometry::new(Value::from(&rect.to_polygon()));

            let mut properties = serde_json::Map::new();
            properties.insert("instance".to_string(), serde_json::Value::from(self.instances[i].clone()));
            properties.insert("category_id".to_string(), serde_json::Value::from(self.category_ids[i]));

            features.push(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: Some(geojson::feature::Id::Number(serde_json::Number::from(i))),
                properties: Some(properties),
                foreign_members: None,
            });
        }

        // Add metadata to foreign members of the FeatureCollection
        let mut foreign_members = serde_json::Map::new();
        foreign_members.insert("image_width".to_string(), serde_json::Value::from(self.image_width));
        foreign_members.insert("image_height".to_string(), serde_json::Value::from(self.image_height));
        foreign_members.insert("instance_count".to_string(), serde_json::Value::from(self.boxes.len()));

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        }
    }

    /// Export to GeoJSON and serialize to JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    /// Save GeoJSON to file
    pub fn save_geojson(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let geojson_string = self.to_geojson_string()?;
        std::fs::write(path, geojson_string).map_err(|source| crate::error::AnnotationError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoxMode;
    use mask::{BinaryMask, CocoRleCodec, MaskCodec};

    fn record(bbox: [u32; 4], mode: Option<BoxMode>) -> AnnotationRecord {
        let mut record = AnnotationRecord::new(CocoRleCodec.encode(&BinaryMask::new(4, 4)), bbox, 3);
        record.bbox_mode = mode;
        record
    }

    #[test]
    fn test_corners_follow_box() {
        let geometry = DisplayGeometry::from_records(&[record([1, 2, 5, 7], None)], 10, 10);
        assert_eq!(geometry.boxes[0], [[1.0, 2.0], [5.0, 2.0], [5.0, 7.0], [1.0, 7.0]]);
        assert_eq!(geometry.instances, vec!["0".to_string()]);
    }

    #[test]
    fn test_xywh_boxes_are_converted() {
        let geometry = DisplayGeometry::from_records(&[record([1, 2, 4, 5], Some(BoxMode::XywhAbs))], 10, 10);
        assert_eq!(geometry.boxes[0][2], [5.0, 7.0]);
    }

    #[test]
    fn test_default_styling() {
        let geometry = DisplayGeometry::from_records(&[record([0, 0, 1, 1], None), record([1, 1, 2, 2], None)], 4, 4);
        assert_eq!(geometry.text.size, 8);
        assert_eq!(geometry.text.color, "green");
        assert_eq!(geometry.text.anchor, TextAnchor::UpperLeft);
        assert_eq!(geometry.text.translation, [-3.0, 0.0]);
        assert_eq!(geometry.style.edge_width, 3.0);
        assert_eq!(geometry.labels(), vec!["instance: 0", "instance: 1"]);
    }

    #[test]
    fn test_geojson_export() {
        let geometry = DisplayGeometry::from_records(&[record([1, 2, 5, 7], None)], 10, 12);
        let collection = geometry.to_geojson();
        assert_eq!(collection.features.len(), 1);

        let members = collection.foreign_members.as_ref().unwrap();
        assert_eq!(members["image_height"], serde_json::Value::from(12));
        assert_eq!(members["instance_count"], serde_json::Value::from(1));

        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["category_id"], serde_json::Value::from(3));
    }
}
