//! Map framing: bounding regions and pins for a scope.

use serde::Serialize;

use filmcatalog_shared::{Coordinate, Location};

use crate::graph::{ContentGraph, LocationId};
use crate::query::{self, Category, Scope};

/// Span multiplier applied around the tight bounding box.
pub const REGION_PADDING: f64 = 1.5;

/// Token presentation uses for the accent tint when no season is selected.
pub const ACCENT_TOKEN: &str = "all-seasons";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinateSpan {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

/// A center point plus the span to show around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapRegion {
    pub center: Coordinate,
    pub span: CoordinateSpan,
}

impl MapRegion {
    /// Clamp each span axis to at least `floor` degrees.
    ///
    /// A single pin has zero span; hosts apply this before handing the
    /// region to a map.
    pub fn with_min_span(self, floor: f64) -> Self {
        let floor = floor.max(0.0);
        Self {
            center: self.center,
            span: CoordinateSpan {
                latitude_delta: self.span.latitude_delta.max(floor),
                longitude_delta: self.span.longitude_delta.max(floor),
            },
        }
    }
}

/// Region framing `locations`, or `None` when there is nothing to frame.
pub fn bounding_region<'a, I>(locations: I) -> Option<MapRegion>
where
    I: IntoIterator<Item = &'a Location>,
{
    let mut points = locations.into_iter().map(|location| location.coordinate);
    let first = points.next()?;
    let (mut min_lat, mut max_lat) = (first.latitude, first.latitude);
    let (mut min_lon, mut max_lon) = (first.longitude, first.longitude);
    for point in points {
        min_lat = min_lat.min(point.latitude);
        max_lat = max_lat.max(point.latitude);
        min_lon = min_lon.min(point.longitude);
        max_lon = max_lon.max(point.longitude);
    }

    Some(MapRegion {
        center: Coordinate::new((min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0),
        span: CoordinateSpan {
            latitude_delta: (max_lat - min_lat) * REGION_PADDING,
            longitude_delta: (max_lon - min_lon) * REGION_PADDING,
        },
    })
}

/// One marker on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPin {
    #[serde(serialize_with = "serialize_id")]
    pub location: LocationId,
    pub title: String,
    pub coordinate: Coordinate,
    /// Category of the selected season; `None` renders with the accent color.
    pub tint: Option<Category>,
}

impl MapPin {
    pub fn tint_token(&self) -> &'static str {
        self.tint.map_or(ACCENT_TOKEN, |category| category.token())
    }
}

fn serialize_id<S: serde::Serializer>(id: &LocationId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

/// Pins for every location in `scope`, in [`query::flatten_locations`] order.
pub fn pins_for_scope(graph: &ContentGraph, scope: Scope) -> Vec<MapPin> {
    let tint = scope
        .season(graph)
        .and_then(|season| graph.season(season))
        .map(query::classify_season);

    query::flatten_locations(graph, scope)
        .into_iter()
        .map(|(id, location)| MapPin {
            location: id,
            title: location.title.clone(),
            coordinate: location.coordinate,
            tint,
        })
        .collect()
}

/// Bounding region of everything in `scope`.
pub fn frame_scope(graph: &ContentGraph, scope: Scope) -> Option<MapRegion> {
    bounding_region(
        query::flatten_locations(graph, scope)
            .into_iter()
            .map(|(_, location)| location),
    )
}
