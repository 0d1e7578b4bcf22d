use crate::app::ports::{GeocodeError, GeocoderPort, RateLimiterPort};
use crate::config::GeocoderConfig;
use crate::error::Result;
use crate::types::Coordinate;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One entry of a Nominatim `/search?format=json` response. Coordinates are
/// sent as decimal strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim-compatible search endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
    rate_limiter: Option<Arc<dyn RateLimiterPort>>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            rate_limiter: None,
        })
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiterPort>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }
}

#[async_trait]
impl GeocoderPort for NominatimGeocoder {
    async fn lookup(&self, address: &str) -> std::result::Result<Option<Coordinate>, GeocodeError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        debug!("Nominatim returned {} bytes for '{}'", bytes.len(), address);
        parse_search_response(&bytes)
    }
}

/// Interprets a search response: an empty array is "no match", the first
/// place otherwise. Unparseable or out-of-range coordinates are faults.
fn parse_search_response(body: &[u8]) -> std::result::Result<Option<Coordinate>, GeocodeError> {
    let places: Vec<NominatimPlace> =
        serde_json::from_slice(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    let lat: f64 = place
        .lat
        .trim()
        .parse()
        .map_err(|_| GeocodeError::Malformed(format!("latitude '{}'", place.lat)))?;
    let lon: f64 = place
        .lon
        .trim()
        .parse()
        .map_err(|_| GeocodeError::Malformed(format!("longitude '{}'", place.lon)))?;

    Coordinate::new(lat, lon)
        .map(Some)
        .ok_or_else(|| GeocodeError::Malformed(format!("coordinate out of range ({lat}, {lon})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_first_place() {
        let body = br#"[
            {"place_id": 1, "lat": "40.7484284", "lon": "-73.9856546", "display_name": "Empire State Building"},
            {"place_id": 2, "lat": "0", "lon": "0"}
        ]"#;
        let coordinate = parse_search_response(body).unwrap().unwrap();
        assert!((coordinate.latitude() - 40.7484284).abs() < 1e-9);
        assert!((coordinate.longitude() + 73.9856546).abs() < 1e-9);
    }

    #[test]
    fn test_empty_array_is_no_match() {
        assert!(parse_search_response(b"[]").unwrap().is_none());
    }

    #[test]
    fn test_bad_payloads_are_faults() {
        assert!(matches!(
            parse_search_response(b"<html>rate limited</html>"),
            Err(GeocodeError::Malformed(_))
        ));
        assert!(matches!(
            parse_search_response(br#"[{"lat": "north", "lon": "1.0"}]"#),
            Err(GeocodeError::Malformed(_))
        ));
        assert!(matches!(
            parse_search_response(br#"[{"lat": "95.0", "lon": "1.0"}]"#),
            Err(GeocodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_builds_from_default_config() {
        let geocoder = NominatimGeocoder::new(&GeocoderConfig::default()).unwrap();
        assert!(geocoder.rate_limiter.is_none());
    }
}
