// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Polyline decoding and map rendering for activity notes.
//!
//! Strava encodes routes as Google polylines with precision 5. Decoded
//! coordinates are `(longitude, latitude)` pairs, matching GeoJSON order.

use crate::models::ActivityRecord;
use geo::{BoundingRect, LineString, Point};
use geojson::{Feature, FeatureCollection, JsonObject};
use serde_json::json;

/// Line colour used for the route feature (Strava orange).
const ROUTE_STROKE: &str = "#FC4C02";
const ROUTE_STROKE_WIDTH: u32 = 4;

/// Fraction of the span added on each side of the bounding box.
const PADDING_RATIO: f64 = 0.1;
/// Padding used when a track has no extent in one dimension.
const MIN_PADDING_DEGREES: f64 = 0.01;
const DEFAULT_ZOOM: u8 = 15;

/// Decode an encoded polyline into a `geo` line string (x = lng, y = lat).
pub fn decode_line(encoded: &str) -> Result<LineString<f64>, GeometryError> {
    polyline::decode_polyline(encoded, 5).map_err(|e| GeometryError::Decode(e.to_string()))
}

/// Decode an encoded polyline into ordered `(longitude, latitude)` pairs.
pub fn decode(encoded: &str) -> Result<Vec<(f64, f64)>, GeometryError> {
    Ok(decode_line(encoded)?.coords().map(|c| (c.x, c.y)).collect())
}

/// Build the GeoJSON written next to each note: route line, start and end.
///
/// `detailed` selects the full-resolution polyline from the detail endpoint
/// instead of the summary polyline from the list endpoint.
pub fn to_feature_collection(
    activity: &ActivityRecord,
    detailed: bool,
) -> Result<FeatureCollection, GeometryError> {
    let encoded = if detailed {
        activity.detailed_polyline()
    } else {
        activity.summary_polyline()
    }
    .ok_or(GeometryError::MissingPolyline(activity.id))?;

    let line = decode_line(encoded)?;
    let (first, last) = match (line.0.first(), line.0.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(GeometryError::Empty(activity.id)),
    };

    let mut line_props = JsonObject::new();
    line_props.insert(
        "name".to_string(),
        json!(activity.name.as_deref().unwrap_or_default()),
    );
    line_props.insert("stroke".to_string(), json!(ROUTE_STROKE));
    line_props.insert("stroke-width".to_string(), json!(ROUTE_STROKE_WIDTH));

    let features = vec![
        feature(geojson::Value::from(&line), line_props),
        feature(geojson::Value::from(&Point::from(first)), named("Start")),
        feature(geojson::Value::from(&Point::from(last)), named("End")),
    ];

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn named(name: &str) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("name".to_string(), json!(name));
    props
}

fn feature(value: geojson::Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Larger of the latitude and longitude spans.
    pub fn max_span(&self) -> f64 {
        (self.max_lat - self.min_lat).max(self.max_lng - self.min_lng)
    }

    /// Bounds grown by 10 % of the span on every side.
    pub fn padded(&self) -> Bounds {
        let lat_pad = padding(self.max_lat - self.min_lat);
        let lng_pad = padding(self.max_lng - self.min_lng);
        Bounds {
            min_lat: self.min_lat - lat_pad,
            max_lat: self.max_lat + lat_pad,
            min_lng: self.min_lng - lng_pad,
            max_lng: self.max_lng + lng_pad,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

fn padding(span: f64) -> f64 {
    let pad = span * PADDING_RATIO;
    if pad > 0.0 {
        pad
    } else {
        MIN_PADDING_DEGREES
    }
}

/// Pick a map zoom level from the larger of the lat/lng spans.
pub fn zoom_for_span(span: f64) -> u8 {
    if span > 1.0 {
        8
    } else if span > 0.5 {
        10
    } else if span > 0.1 {
        12
    } else if span > 0.05 {
        14
    } else {
        DEFAULT_ZOOM
    }
}

/// Map view derived from an activity's route. Never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoVisualization {
    pub activity_id: u64,
    pub coordinates: Vec<(f64, f64)>,
    pub bounds: Option<Bounds>,
    /// Bounds with a 10 % margin, at least 0.01° for point-like tracks.
    pub padded: Option<Bounds>,
    /// `(lat, lng)`
    pub center: Option<(f64, f64)>,
    pub zoom: Option<u8>,
}

impl GeoVisualization {
    /// Descriptor for an activity without usable geometry.
    pub fn empty(activity_id: u64) -> Self {
        Self {
            activity_id,
            coordinates: Vec::new(),
            bounds: None,
            padded: None,
            center: None,
            zoom: None,
        }
    }

    /// Render as a Leaflet code block for the note body.
    pub fn leaflet_block(&self) -> String {
        let mut config = format!("id: {}\n", self.activity_id);
        if let (Some((lat, lng)), Some(zoom)) = (self.center, self.zoom) {
            config.push_str(&format!("lat: {}\nlong: {}\nzoom: {}\n", lat, lng, zoom));
        } else {
            config.push_str("zoomFeatures: true\n");
        }
        config.push_str("maxZoom: 18\nzoomDelta: 0.5\ngeojsonFolder: .\n");
        format!("~~~leaflet\n{}~~~", config)
    }
}

/// Compute the map view for an activity (detailed polyline preferred).
pub fn visualize(activity: &ActivityRecord) -> Result<GeoVisualization, GeometryError> {
    let Some(encoded) = activity.get_polyline() else {
        return Ok(GeoVisualization::empty(activity.id));
    };

    let line = decode_line(encoded)?;
    let Some(rect) = line.bounding_rect() else {
        return Ok(GeoVisualization::empty(activity.id));
    };

    let bounds = Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    };

    Ok(GeoVisualization {
        activity_id: activity.id,
        coordinates: line.coords().map(|c| (c.x, c.y)).collect(),
        bounds: Some(bounds),
        padded: Some(bounds.padded()),
        center: Some(bounds.center()),
        zoom: Some(zoom_for_span(bounds.max_span())),
    })
}

/// Leaflet map block for an activity's note.
pub fn leaflet_block(activity: &ActivityRecord) -> Result<String, GeometryError> {
    visualize(activity).map(|view| view.leaflet_block())
}

/// Errors from geometry operations.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Failed to decode polyline: {0}")]
    Decode(String),

    #[error("Polyline not found in activity {0}")]
    MissingPolyline(u64),

    #[error("Polyline for activity {0} has no coordinates")]
    Empty(u64),
}
