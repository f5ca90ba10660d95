//! Flight and hotel search over a travel data provider.
//!
//! [`TravelApi`] is the narrow provider interface; [`search_flights`] and
//! [`search_hotels`] hold the multi-step search logic and are provider
//! agnostic.

mod amadeus;
mod flights;
mod hotels;

pub use amadeus::AmadeusClient;
pub use flights::{search_flights, FlightRecord, FlightSearchRequest};
pub use hotels::{search_hotels, HotelRecord, HotelSearchRequest};

use crate::error::Result;
use async_trait::async_trait;

/// What kind of place a location lookup resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    City,
    Airport,
}

impl LocationKind {
    pub fn as_sub_type(&self) -> &'static str {
        match self {
            LocationKind::City => "CITY",
            LocationKind::Airport => "AIRPORT",
        }
    }
}

/// Query for non-stop flight offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightOfferQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub currency: String,
    pub max_offers: u32,
}

/// One flight offer, first segment only.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightOffer {
    pub total_price: f64,
    /// ISO 8601 duration, e.g. `PT2H10M`.
    pub duration: String,
    pub carrier_code: String,
    pub number: String,
    pub departure_at: String,
}

/// Query for the best offer of a single hotel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotelOfferQuery {
    pub hotel_id: String,
    pub adults: u32,
    pub check_in: String,
    pub check_out: String,
    pub price_range: Option<String>,
    pub currency: String,
}

/// One hotel offer.
#[derive(Debug, Clone, PartialEq)]
pub struct HotelOffer {
    pub hotel_name: String,
    pub total_price: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Travel data provider.
#[async_trait]
pub trait TravelApi: Send + Sync {
    /// Exchange the client credentials for a bearer token.
    async fn access_token(&self) -> Result<String>;

    /// Convert a country name to its ISO 3166-1 alpha-2 code.
    async fn country_code(&self, country_name: &str) -> Result<String>;

    /// Resolve the IATA code of a city or airport within a country.
    async fn location_code(
        &self,
        token: &str,
        keyword: &str,
        kind: LocationKind,
        country_code: &str,
    ) -> Result<String>;

    /// Hotel ids within `radius_km` of a city.
    async fn hotels_by_city(&self, token: &str, city_code: &str, radius_km: u32)
        -> Result<Vec<String>>;

    /// Offers for one hotel. An empty list means the hotel has no availability.
    async fn hotel_offers(&self, token: &str, query: &HotelOfferQuery) -> Result<Vec<HotelOffer>>;

    /// Non-stop flight offers for one adult.
    async fn flight_offers(&self, token: &str, query: &FlightOfferQuery)
        -> Result<Vec<FlightOffer>>;

    /// Business name of an airline, if the provider knows it.
    async fn airline_name(&self, token: &str, carrier_code: &str) -> Result<Option<String>>;
}

/// Parse a `YYYY-MM-DD` date.
pub(crate) fn parse_date(value: &str, field: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        crate::error::ConciergeError::Travel(format!(
            "Invalid date format. Please use YYYY-MM-DD format for the {}.",
            field
        ))
    })
}
