//! Amadeus self-service REST client.

use super::{
    FlightOffer, FlightOfferQuery, HotelOffer, HotelOfferQuery, LocationKind, TravelApi,
};
use crate::config::TravelSettings;
use crate::error::{ConciergeError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the Amadeus APIs plus the restcountries lookup.
pub struct AmadeusClient {
    http: reqwest::Client,
    base_url: Url,
    countries_url: Url,
    client_id: String,
    client_secret: String,
}

impl AmadeusClient {
    /// Create a client, reading credentials from the configured env vars.
    pub fn from_settings(settings: &TravelSettings) -> Result<Self> {
        let client_id = credential(&settings.api_key_env)?;
        let client_secret = credential(&settings.api_secret_env)?;

        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| ConciergeError::Config(format!("Invalid travel.base_url: {}", e)))?;
        let countries_url = Url::parse(&settings.countries_url)
            .map_err(|e| ConciergeError::Config(format!("Invalid travel.countries_url: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ConciergeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            countries_url,
            client_id,
            client_secret,
        })
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        token: &str,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = endpoint(&self.base_url, segments)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<DataEnvelope<T>>().await?.data)
    }
}

fn credential(env_var: &str) -> Result<String> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConciergeError::Config(format!(
            "Missing travel API credentials: {} is not set",
            env_var
        ))),
    }
}

/// Append path segments to a base URL, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ConciergeError::Config(format!("Base URL cannot have a path: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CountryEntry {
    cca2: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationEntry {
    iata_code: String,
    #[serde(default)]
    address: LocationAddress,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationAddress {
    #[serde(default)]
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelEntry {
    hotel_id: String,
}

#[derive(Debug, Deserialize)]
struct HotelOfferEntry {
    #[serde(default)]
    hotel: HotelInfo,
    #[serde(default)]
    offers: Vec<PricedOffer>,
}

#[derive(Debug, Default, Deserialize)]
struct HotelInfo {
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PricedOffer {
    price: Price,
}

#[derive(Debug, Deserialize)]
struct Price {
    total: String,
}

#[derive(Debug, Deserialize)]
struct FlightOfferEntry {
    price: Price,
    #[serde(default)]
    itineraries: Vec<Itinerary>,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segment {
    carrier_code: Option<String>,
    number: Option<String>,
    duration: Option<String>,
    departure: Option<Departure>,
}

#[derive(Debug, Deserialize)]
struct Departure {
    at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AirlineEntry {
    business_name: Option<String>,
    common_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    detail: Option<String>,
    title: Option<String>,
}

impl From<FlightOfferEntry> for FlightOffer {
    fn from(entry: FlightOfferEntry) -> Self {
        let segment = entry
            .itineraries
            .into_iter()
            .next()
            .and_then(|it| it.segments.into_iter().next());

        let (carrier_code, number, duration, departure_at) = match segment {
            Some(s) => (
                s.carrier_code.unwrap_or_else(|| "XX".into()),
                s.number.unwrap_or_else(|| "000".into()),
                s.duration.unwrap_or_else(|| "Unknown".into()),
                s.departure.and_then(|d| d.at).unwrap_or_else(|| "Unknown".into()),
            ),
            None => ("XX".into(), "000".into(), "Unknown".into(), "Unknown".into()),
        };

        FlightOffer {
            total_price: entry.price.total.parse().unwrap_or(0.0),
            duration,
            carrier_code,
            number,
            departure_at,
        }
    }
}

#[async_trait]
impl TravelApi for AmadeusClient {
    #[instrument(skip(self))]
    async fn access_token(&self) -> Result<String> {
        let url = endpoint(&self.base_url, &["v1", "security", "oauth2", "token"])?;
        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ConciergeError::Travel(format!(
                "Authentication failed ({}). Check the travel API credentials.",
                response.status()
            )));
        }

        Ok(response.json::<TokenResponse>().await?.access_token)
    }

    async fn country_code(&self, country_name: &str) -> Result<String> {
        let mut url = endpoint(&self.countries_url, &["name", country_name])?;
        url.query_pairs_mut().append_pair("fields", "cca2");

        let unknown = || {
            ConciergeError::Travel(format!(
                "Could not convert country name: {}. Check spelling.",
                country_name
            ))
        };

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(unknown());
        }

        let entries: Vec<CountryEntry> = response.json().await?;
        entries.into_iter().next().map(|c| c.cca2).ok_or_else(unknown)
    }

    #[instrument(skip(self, token))]
    async fn location_code(
        &self,
        token: &str,
        keyword: &str,
        kind: LocationKind,
        country_code: &str,
    ) -> Result<String> {
        let locations: Vec<LocationEntry> = self
            .get_data(
                token,
                &["v1", "reference-data", "locations"],
                &[
                    ("keyword", keyword.to_string()),
                    ("subType", kind.as_sub_type().to_string()),
                ],
            )
            .await?;

        debug!("{} candidate location(s)", locations.len());

        locations
            .into_iter()
            .find(|loc| {
                country_code.is_empty()
                    || loc.address.country_code.as_deref() == Some(country_code)
            })
            .map(|loc| loc.iata_code)
            .ok_or_else(|| match kind {
                LocationKind::Airport => ConciergeError::Travel(format!(
                    "Could not find an airport in {}, {}. Country codes could be wrong or country is not available.",
                    keyword, country_code
                )),
                LocationKind::City => ConciergeError::Travel(format!(
                    "Could not find city code for {}. Maybe it's not available.",
                    keyword
                )),
            })
    }

    async fn hotels_by_city(
        &self,
        token: &str,
        city_code: &str,
        radius_km: u32,
    ) -> Result<Vec<String>> {
        let hotels: Vec<HotelEntry> = self
            .get_data(
                token,
                &["v1", "reference-data", "locations", "hotels", "by-city"],
                &[
                    ("cityCode", city_code.to_string()),
                    ("radius", radius_km.to_string()),
                    ("radiusUnit", "KM".to_string()),
                    ("hotelSource", "ALL".to_string()),
                ],
            )
            .await?;

        Ok(hotels.into_iter().map(|h| h.hotel_id).collect())
    }

    async fn hotel_offers(&self, token: &str, query: &HotelOfferQuery) -> Result<Vec<HotelOffer>> {
        let url = endpoint(&self.base_url, &["v3", "shopping", "hotel-offers"])?;

        let mut params = vec![
            ("hotelIds", query.hotel_id.clone()),
            ("adults", query.adults.to_string()),
            ("checkInDate", query.check_in.clone()),
            ("checkOutDate", query.check_out.clone()),
            ("currency", query.currency.clone()),
            ("bestRateOnly", "true".to_string()),
        ];
        if let Some(range) = &query.price_range {
            params.push(("priceRange", range.clone()));
        }

        let response = self.http.get(url).bearer_auth(token).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|e| e.errors.into_iter().next())
                .and_then(|e| e.detail.or(e.title))
                .unwrap_or_else(|| status.to_string());
            return Err(ConciergeError::Travel(format!(
                "Failed to fetch hotel offers: {}",
                detail
            )));
        }

        let entries = response.json::<DataEnvelope<HotelOfferEntry>>().await?.data;

        Ok(entries
            .into_iter()
            .map(|entry| HotelOffer {
                hotel_name: entry.hotel.name.unwrap_or_else(|| "Unknown Hotel".into()),
                total_price: entry.offers.into_iter().next().map(|o| o.price.total),
                latitude: entry.hotel.latitude,
                longitude: entry.hotel.longitude,
            })
            .collect())
    }

    #[instrument(skip(self, token))]
    async fn flight_offers(
        &self,
        token: &str,
        query: &FlightOfferQuery,
    ) -> Result<Vec<FlightOffer>> {
        let url = endpoint(&self.base_url, &["v2", "shopping", "flight-offers"])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("originLocationCode", query.origin.clone()),
                ("destinationLocationCode", query.destination.clone()),
                ("departureDate", query.departure_date.clone()),
                ("adults", "1".to_string()),
                ("nonStop", "true".to_string()),
                ("currencyCode", query.currency.clone()),
                ("max", query.max_offers.to_string()),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(ConciergeError::Travel(
                "Error fetching flights: Bad request. Check your input parameters.".into(),
            ));
        }

        let entries = response
            .error_for_status()?
            .json::<DataEnvelope<FlightOfferEntry>>()
            .await?
            .data;

        Ok(entries.into_iter().map(FlightOffer::from).collect())
    }

    async fn airline_name(&self, token: &str, carrier_code: &str) -> Result<Option<String>> {
        let airlines: Vec<AirlineEntry> = self
            .get_data(
                token,
                &["v1", "reference-data", "airlines"],
                &[("airlineCodes", carrier_code.to_string())],
            )
            .await?;

        Ok(airlines
            .into_iter()
            .next()
            .and_then(|a| a.business_name.or(a.common_name)))
    }
}
