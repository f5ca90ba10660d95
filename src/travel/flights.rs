//! Direct flight search.

use super::{parse_date, FlightOfferQuery, LocationKind, TravelApi};
use crate::config::TravelSettings;
use crate::error::Result;
use crate::formatter::{format_records, OutputMode, TableRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Arguments of the `flight_search` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSearchRequest {
    pub departure_city: String,
    pub departure_country: String,
    pub destination_city: String,
    pub destination_country: String,
    pub travel_date: String,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One direct flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightRecord {
    pub price: f64,
    pub currency: String,
    pub duration: String,
    pub flight_number: String,
    pub airline: String,
    pub departure_time: String,
}

impl TableRecord for FlightRecord {
    fn headers() -> Vec<String> {
        ["Price", "Currency", "Duration", "Flight Number", "Airline", "Departure Time"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            format!("{:.2}", self.price),
            self.currency.clone(),
            self.duration.clone(),
            self.flight_number.clone(),
            self.airline.clone(),
            self.departure_time.clone(),
        ]
    }
}

/// `PT2H10M` becomes `2h10m`.
fn format_duration(iso: &str) -> String {
    iso.strip_prefix("PT").unwrap_or(iso).to_lowercase()
}

/// Find direct flights and render them cheapest first.
#[instrument(skip_all, fields(from = %request.departure_city, to = %request.destination_city))]
pub async fn search_flights(
    api: &dyn TravelApi,
    request: &FlightSearchRequest,
    settings: &TravelSettings,
    mode: OutputMode,
) -> Result<String> {
    parse_date(&request.travel_date, "travel date")?;

    let token = api.access_token().await?;

    let departure_country = api.country_code(&request.departure_country).await?;
    let destination_country = api.country_code(&request.destination_country).await?;

    let origin = api
        .location_code(&token, &request.departure_city, LocationKind::Airport, &departure_country)
        .await?;
    let destination = api
        .location_code(
            &token,
            &request.destination_city,
            LocationKind::Airport,
            &destination_country,
        )
        .await?;

    let currency = request
        .currency
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| settings.default_currency.clone());

    let query = FlightOfferQuery {
        origin: origin.clone(),
        destination: destination.clone(),
        departure_date: request.travel_date.clone(),
        currency: currency.clone(),
        max_offers: settings.max_flight_offers,
    };

    let offers = api.flight_offers(&token, &query).await?;
    info!("{} -> {}: {} offer(s)", origin, destination, offers.len());

    if offers.is_empty() {
        return Ok(format!(
            "No direct flights found between {}, {} and {}, {} on {}",
            request.departure_city,
            request.departure_country,
            request.destination_city,
            request.destination_country,
            request.travel_date
        ));
    }

    let mut airlines: HashMap<String, String> = HashMap::new();
    let mut records = Vec::with_capacity(offers.len());

    for offer in offers {
        let airline = match airlines.get(&offer.carrier_code) {
            Some(name) => name.clone(),
            None => {
                let name = match api.airline_name(&token, &offer.carrier_code).await {
                    Ok(Some(name)) => name,
                    Ok(None) => offer.carrier_code.clone(),
                    Err(e) => {
                        debug!("Airline lookup for {} failed: {}", offer.carrier_code, e);
                        offer.carrier_code.clone()
                    }
                };
                airlines.insert(offer.carrier_code.clone(), name.clone());
                name
            }
        };

        records.push(FlightRecord {
            price: offer.total_price,
            currency: currency.clone(),
            duration: format_duration(&offer.duration),
            flight_number: format!("{} {}", offer.carrier_code, offer.number),
            airline,
            departure_time: offer.departure_at,
        });
    }

    records.sort_by(|a, b| a.price.total_cmp(&b.price));

    Ok(format_records("flights", &records, mode).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTravel;
    use crate::travel::FlightOffer;

    fn request() -> FlightSearchRequest {
        FlightSearchRequest {
            departure_city: "London".into(),
            departure_country: "United Kingdom".into(),
            destination_city: "Rome".into(),
            destination_country: "Italy".into(),
            travel_date: "2025-03-05".into(),
            currency: None,
        }
    }

    fn offer(price: f64, carrier: &str, number: &str) -> FlightOffer {
        FlightOffer {
            total_price: price,
            duration: "PT2H35M".into(),
            carrier_code: carrier.into(),
            number: number.into(),
            departure_at: "2025-03-05T07:15:00".into(),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration("PT2H10M"), "2h10m");
        assert_eq!(format_duration("Unknown"), "unknown");
    }

    #[tokio::test]
    async fn test_sorted_by_price_with_airline_fallback() {
        let api = FakeTravel {
            flights: vec![offer(240.5, "AZ", "201"), offer(89.99, "U2", "8401")],
            airlines: vec![("AZ".into(), "ITA Airways".into())],
            ..Default::default()
        };

        let out = search_flights(&api, &request(), &TravelSettings::default(), OutputMode::Json)
            .await
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let flights = parsed["flights"].as_array().unwrap();
        assert_eq!(flights.len(), 2);
        assert_eq!(flights[0]["flight_number"], "U2 8401");
        assert_eq!(flights[0]["airline"], "U2");
        assert_eq!(flights[1]["airline"], "ITA Airways");
        assert_eq!(flights[1]["duration"], "2h35m");
        assert_eq!(flights[0]["currency"], "USD");
    }

    #[tokio::test]
    async fn test_no_offers_message() {
        let api = FakeTravel::default();
        let out = search_flights(&api, &request(), &TravelSettings::default(), OutputMode::Text)
            .await
            .unwrap();
        assert_eq!(
            out,
            "No direct flights found between London, United Kingdom and Rome, Italy on 2025-03-05"
        );
    }

    #[tokio::test]
    async fn test_invalid_date_rejected_before_any_lookup() {
        let api = FakeTravel::default();
        let mut bad = request();
        bad.travel_date = "05/03/2025".into();

        let err = search_flights(&api, &bad, &TravelSettings::default(), OutputMode::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
        assert_eq!(api.token_requests(), 0);
    }

    #[tokio::test]
    async fn test_requested_currency_is_used() {
        let api = FakeTravel {
            flights: vec![offer(120.0, "AZ", "201")],
            ..Default::default()
        };
        let mut req = request();
        req.currency = Some("EUR".into());

        let out = search_flights(&api, &req, &TravelSettings::default(), OutputMode::Text)
            .await
            .unwrap();
        assert!(out.contains("EUR"));
        assert_eq!(api.last_flight_currency().as_deref(), Some("EUR"));
    }
}
