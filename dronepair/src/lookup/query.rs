//! Overpass query construction and response parsing.
//!
//! The lookup asks for the single nearest building-tagged way around a point
//! and its centroid:
//!
//! ```text
//! [out:json][timeout:25];way["building"](around:500,48.000000,2.000000);out center 1;
//! ```
//!
//! The query travels URL-encoded in the `data` parameter of a GET request.

use reqwest::Url;
use serde::Deserialize;

use super::types::LookupError;
use crate::coord::Coordinate;

/// Default search radius around a sampled coordinate, in meters.
pub const DEFAULT_SEARCH_RADIUS_M: u32 = 500;

/// Server-side evaluation timeout embedded in the query, in seconds.
pub const QUERY_TIMEOUT_SECS: u32 = 25;

/// Builds the Overpass QL text for the nearest building around `coord`.
pub fn building_query(coord: Coordinate, radius_m: u32) -> String {
    format!(
        "[out:json][timeout:{}];way[\"building\"](around:{},{:.6},{:.6});out center 1;",
        QUERY_TIMEOUT_SECS, radius_m, coord.lat, coord.lon
    )
}

/// Builds the full request URL against `endpoint`.
pub fn request_url(endpoint: &str, coord: Coordinate, radius_m: u32) -> Result<String, LookupError> {
    let query = building_query(coord, radius_m);
    Url::parse_with_params(endpoint, &[("data", query.as_str())])
        .map(String::from)
        .map_err(|e| LookupError::Unavailable {
            endpoint: endpoint.to_string(),
            reason: format!("invalid endpoint URL: {}", e),
        })
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(default)]
    center: Option<OverpassCenter>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

/// Extracts the first element's center from a response body.
///
/// An element without a `center` resolves to the query coordinate. An empty
/// `elements` array is [`LookupError::NotFound`].
pub fn parse_building_center(
    endpoint: &str,
    body: &[u8],
    query: Coordinate,
    radius_m: u32,
) -> Result<Coordinate, LookupError> {
    let response: OverpassResponse =
        serde_json::from_slice(body).map_err(|e| LookupError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

    let first = response
        .elements
        .into_iter()
        .next()
        .ok_or(LookupError::NotFound { query, radius_m })?;

    Ok(first
        .center
        .map(|c| Coordinate::new(c.lat, c.lon))
        .unwrap_or(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://overpass.example/api/interpreter";

    #[test]
    fn test_query_text() {
        let q = building_query(Coordinate::new(48.0, 2.0), 500);
        assert_eq!(
            q,
            "[out:json][timeout:25];way[\"building\"](around:500,48.000000,2.000000);out center 1;"
        );
    }

    #[test]
    fn test_request_url_encodes_query() {
        let url = request_url(ENDPOINT, Coordinate::new(48.0, 2.0), 300).unwrap();
        assert!(url.starts_with("https://overpass.example/api/interpreter?data="));
        assert!(!url.contains('"'), "quotes must be encoded: {}", url);
        assert!(!url.contains(' '));

        let parsed = Url::parse(&url).unwrap();
        let (key, value) = parsed.query_pairs().next().unwrap();
        assert_eq!(key, "data");
        assert!(value.contains("around:300,48.000000,2.000000"));
    }

    #[test]
    fn test_request_url_rejects_bad_endpoint() {
        let err = request_url("not a url", Coordinate::new(0.0, 0.0), 10).unwrap_err();
        assert!(matches!(err, LookupError::Unavailable { .. }));
    }

    #[test]
    fn test_parse_center() {
        let body = br#"{"version":0.6,"elements":[{"type":"way","id":1,"center":{"lat":48.0,"lon":2.0}}]}"#;
        let center = parse_building_center(ENDPOINT, body, Coordinate::new(47.9, 1.9), 500).unwrap();
        assert_eq!(center, Coordinate::new(48.0, 2.0));
    }

    #[test]
    fn test_parse_uses_first_element() {
        let body = br#"{"elements":[{"center":{"lat":1.0,"lon":2.0}},{"center":{"lat":3.0,"lon":4.0}}]}"#;
        let center = parse_building_center(ENDPOINT, body, Coordinate::new(0.0, 0.0), 500).unwrap();
        assert_eq!(center, Coordinate::new(1.0, 2.0));
    }

    #[test]
    fn test_parse_missing_center_falls_back_to_query() {
        let body = br#"{"elements":[{"type":"way","id":7}]}"#;
        let query = Coordinate::new(10.5, 20.5);
        let center = parse_building_center(ENDPOINT, body, query, 500).unwrap();
        assert_eq!(center, query);
    }

    #[test]
    fn test_parse_empty_is_not_found() {
        let body = br#"{"elements":[]}"#;
        let err = parse_building_center(ENDPOINT, body, Coordinate::new(0.0, 0.0), 250).unwrap_err();
        assert!(matches!(err, LookupError::NotFound { radius_m: 250, .. }));
    }

    #[test]
    fn test_parse_garbage_is_invalid_response() {
        let err = parse_building_center(ENDPOINT, b"<html>busy</html>", Coordinate::new(0.0, 0.0), 1)
            .unwrap_err();
        assert!(matches!(err, LookupError::InvalidResponse { .. }));
    }
}
