//! Hotel offer search.

use super::{parse_date, HotelOfferQuery, LocationKind, TravelApi};
use crate::config::TravelSettings;
use crate::error::{ConciergeError, Result};
use crate::formatter::{format_records, OutputMode, TableRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, info, instrument};

/// Arguments of the `hotel_search` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelSearchRequest {
    pub city_name: String,
    pub radius: u32,
    pub country: String,
    pub num_adults: u32,
    pub check_in_date: String,
    pub stay_days: u32,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One hotel with its best offer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelRecord {
    pub name: String,
    pub price: String,
    pub currency: String,
    pub check_in: String,
    pub check_out: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl TableRecord for HotelRecord {
    fn headers() -> Vec<String> {
        ["Hotel Name", "Price", "Check-in Date", "Check-out Date", "Latitude", "Longitude"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn cells(&self) -> Vec<String> {
        let coord = |c: Option<f64>| c.map(|v| v.to_string()).unwrap_or_else(|| "N/A".into());
        vec![
            self.name.clone(),
            format!("{} {}", self.price, self.currency),
            self.check_in.clone(),
            self.check_out.clone(),
            coord(self.latitude),
            coord(self.longitude),
        ]
    }
}

fn price_range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+-\d+$").expect("Invalid regex"))
}

/// Find hotels in a city and render the best offer of each.
///
/// Offer lookups run hotel by hotel; a hotel whose lookup fails or that has
/// no offer is skipped.
#[instrument(skip_all, fields(city = %request.city_name))]
pub async fn search_hotels(
    api: &dyn TravelApi,
    request: &HotelSearchRequest,
    settings: &TravelSettings,
    mode: OutputMode,
) -> Result<String> {
    let price_range = request
        .price_range
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if let Some(range) = price_range {
        if !price_range_pattern().is_match(range) {
            return Err(ConciergeError::Travel(
                "Invalid price range format. Please use min-max format.".into(),
            ));
        }
    }

    let check_in = parse_date(&request.check_in_date, "check-in date")?;
    if request.stay_days == 0 {
        return Err(ConciergeError::Travel("stay_days must be at least 1".into()));
    }
    let check_out = check_in
        .checked_add_days(chrono::Days::new(u64::from(request.stay_days)))
        .ok_or_else(|| ConciergeError::Travel("stay_days is out of range".into()))?
        .format("%Y-%m-%d")
        .to_string();

    let token = api.access_token().await?;
    let country_code = api.country_code(&request.country).await?;
    let city_code = api
        .location_code(&token, &request.city_name, LocationKind::City, &country_code)
        .await?;

    let hotel_ids = api.hotels_by_city(&token, &city_code, request.radius).await?;
    if hotel_ids.is_empty() {
        return Err(ConciergeError::Travel(format!(
            "No hotels found in {}, {}",
            request.city_name, request.country
        )));
    }

    let currency = request
        .currency
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| settings.default_currency.clone());

    let mut records = Vec::new();

    for hotel_id in hotel_ids.iter().take(settings.max_hotels_scanned) {
        let query = HotelOfferQuery {
            hotel_id: hotel_id.clone(),
            adults: request.num_adults,
            check_in: request.check_in_date.clone(),
            check_out: check_out.clone(),
            price_range: price_range.map(str::to_string),
            currency: currency.clone(),
        };

        let offers = match api.hotel_offers(&token, &query).await {
            Ok(offers) if !offers.is_empty() => offers,
            Ok(_) => {
                debug!("No offers for hotel {}", hotel_id);
                continue;
            }
            Err(e) => {
                debug!("Skipping hotel {}: {}", hotel_id, e);
                continue;
            }
        };

        records.extend(offers.into_iter().map(|offer| HotelRecord {
            name: offer.hotel_name,
            price: offer.total_price.unwrap_or_else(|| "N/A".into()),
            currency: currency.clone(),
            check_in: request.check_in_date.clone(),
            check_out: check_out.clone(),
            latitude: offer.latitude,
            longitude: offer.longitude,
        }));

        if records.len() >= settings.max_hotel_results {
            break;
        }
    }

    records.truncate(settings.max_hotel_results);
    info!("{} hotel offer(s) in {}", records.len(), city_code);

    if records.is_empty() {
        return Ok(format!(
            "No hotel offers found in {}, {}",
            request.city_name, request.country
        ));
    }

    Ok(format_records("hotels", &records, mode).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTravel;

    fn request() -> HotelSearchRequest {
        HotelSearchRequest {
            city_name: "Rome".into(),
            radius: 15,
            country: "Italy".into(),
            num_adults: 2,
            check_in_date: "2025-03-15".into(),
            stay_days: 3,
            price_range: None,
            currency: None,
        }
    }

    fn hotel_ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("HTROM{:03}", i)).collect()
    }

    fn json_hotels(out: &str) -> Vec<serde_json::Value> {
        let parsed: serde_json::Value = serde_json::from_str(out).unwrap();
        parsed["hotels"].as_array().unwrap().clone()
    }

    #[tokio::test]
    async fn test_failed_lookups_are_skipped() {
        let ids = hotel_ids(10);
        let api = FakeTravel {
            hotel_ids: ids.clone(),
            failing_hotels: vec![ids[1].clone(), ids[4].clone(), ids[8].clone()],
            ..Default::default()
        };

        let out = search_hotels(&api, &request(), &TravelSettings::default(), OutputMode::Json)
            .await
            .unwrap();

        let hotels = json_hotels(&out);
        assert_eq!(hotels.len(), 7);
        assert_eq!(hotels[0]["check_out"], "2025-03-18");
        assert!(hotels.iter().all(|h| h["name"] != "Hotel HTROM004"));
    }

    #[tokio::test]
    async fn test_results_are_capped() {
        let api = FakeTravel {
            hotel_ids: hotel_ids(60),
            ..Default::default()
        };

        let out = search_hotels(&api, &request(), &TravelSettings::default(), OutputMode::Json)
            .await
            .unwrap();

        assert_eq!(json_hotels(&out).len(), 15);
        assert_eq!(api.hotel_lookups(), 15);
    }

    #[tokio::test]
    async fn test_scan_limit_bounds_lookups() {
        let ids = hotel_ids(80);
        let api = FakeTravel {
            hotel_ids: ids.clone(),
            failing_hotels: ids.clone(),
            ..Default::default()
        };

        let out = search_hotels(&api, &request(), &TravelSettings::default(), OutputMode::Text)
            .await
            .unwrap();

        assert_eq!(out, "No hotel offers found in Rome, Italy");
        assert_eq!(api.hotel_lookups(), 50);
    }

    #[tokio::test]
    async fn test_invalid_price_range() {
        let api = FakeTravel::default();
        let mut req = request();
        req.price_range = Some("cheap".into());

        let err = search_hotels(&api, &req, &TravelSettings::default(), OutputMode::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("min-max"));
    }

    #[tokio::test]
    async fn test_stay_past_calendar_end_is_an_error() {
        let api = FakeTravel::default();
        let mut req = request();
        req.check_in_date = "2025-03-15".into();
        req.stay_days = 100_000_000;

        let err = search_hotels(&api, &req, &TravelSettings::default(), OutputMode::Text)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Travel search failed: stay_days is out of range");
        assert_eq!(api.token_requests(), 0);
    }

    #[tokio::test]
    async fn test_no_hotels_in_city_is_an_error() {
        let api = FakeTravel::default();
        let err = search_hotels(&api, &request(), &TravelSettings::default(), OutputMode::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No hotels found in Rome, Italy"));
    }

    #[test]
    fn test_table_cells() {
        let record = HotelRecord {
            name: "Hotel Artemide".into(),
            price: "540.00".into(),
            currency: "EUR".into(),
            check_in: "2025-03-15".into(),
            check_out: "2025-03-18".into(),
            latitude: Some(41.9),
            longitude: None,
        };
        let cells = record.cells();
        assert_eq!(cells[1], "540.00 EUR");
        assert_eq!(cells[5], "N/A");
    }
}
