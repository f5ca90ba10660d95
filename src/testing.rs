//! In-memory fakes for the external collaborators.

use crate::audio::FetchedAudio;
use crate::catalog::ToolCatalog;
use crate::error::{ConciergeError, Result};
use crate::events::{AgentEvent, EventSink};
use crate::model::{ChatMessage, ModelBackend, ModelReply, RequestedCall};
use crate::tools::{AudioTranscriber, MediaFetcher};
use crate::travel::{
    FlightOffer, FlightOfferQuery, HotelOffer, HotelOfferQuery, LocationKind, TravelApi,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn call(id: &str, name: &str, arguments: &str) -> RequestedCall {
    RequestedCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// Model backend that plays back canned replies.
///
/// Runs out of script with an upstream error.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<ModelReply>>,
    verdicts: Mutex<VecDeque<String>>,
    generate_calls: Mutex<Vec<Vec<ChatMessage>>>,
    completion_prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Replies to `complete`, in order.
    pub fn with_verdicts(self, verdicts: Vec<&str>) -> Self {
        *self.verdicts.lock().unwrap() = verdicts.into_iter().map(String::from).collect();
        self
    }

    /// Messages passed to each `generate` call.
    pub fn generate_calls(&self) -> Vec<Vec<ChatMessage>> {
        self.generate_calls.lock().unwrap().clone()
    }

    pub fn completion_prompts(&self) -> Vec<String> {
        self.completion_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        _tools: &ToolCatalog,
        sink: &dyn EventSink,
    ) -> Result<ModelReply> {
        self.generate_calls.lock().unwrap().push(messages.to_vec());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ConciergeError::Upstream("script exhausted".into()))?;

        for block in &reply.blocks {
            sink.emit(AgentEvent::TextDelta { text: block.clone() });
        }
        Ok(reply)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.completion_prompts.lock().unwrap().push(prompt.to_string());
        self.verdicts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ConciergeError::Upstream("no verdict scripted".into()))
    }
}

pub struct FakeFetcher {
    title: String,
}

impl FakeFetcher {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch_audio(&self, _url: &str) -> Result<FetchedAudio> {
        Ok(FetchedAudio {
            path: PathBuf::from("/tmp/concierge/fake.mp3"),
            title: self.title.clone(),
        })
    }
}

pub struct FakeTranscriber {
    transcript: String,
    calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioTranscriber for FakeTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.transcript.clone())
    }
}

/// Travel provider backed by fixed data.
///
/// Every hotel not listed in `failing_hotels` has one offer named
/// `Hotel <id>`.
#[derive(Default)]
pub struct FakeTravel {
    pub flights: Vec<FlightOffer>,
    pub airlines: Vec<(String, String)>,
    pub hotel_ids: Vec<String>,
    pub failing_hotels: Vec<String>,
    pub(crate) token_requests: AtomicUsize,
    pub(crate) hotel_lookups: AtomicUsize,
    pub(crate) last_flight_currency: Mutex<Option<String>>,
}

impl FakeTravel {
    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn hotel_lookups(&self) -> usize {
        self.hotel_lookups.load(Ordering::SeqCst)
    }

    pub fn last_flight_currency(&self) -> Option<String> {
        self.last_flight_currency.lock().unwrap().clone()
    }
}

#[async_trait]
impl TravelApi for FakeTravel {
    async fn access_token(&self) -> Result<String> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        Ok("token".into())
    }

    async fn country_code(&self, country_name: &str) -> Result<String> {
        Ok(country_name.chars().take(2).collect::<String>().to_uppercase())
    }

    async fn location_code(
        &self,
        _token: &str,
        keyword: &str,
        _kind: LocationKind,
        _country_code: &str,
    ) -> Result<String> {
        Ok(keyword.chars().take(3).collect::<String>().to_uppercase())
    }

    async fn hotels_by_city(
        &self,
        _token: &str,
        _city_code: &str,
        _radius_km: u32,
    ) -> Result<Vec<String>> {
        Ok(self.hotel_ids.clone())
    }

    async fn hotel_offers(&self, _token: &str, query: &HotelOfferQuery) -> Result<Vec<HotelOffer>> {
        self.hotel_lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing_hotels.contains(&query.hotel_id) {
            return Err(ConciergeError::Travel("Failed to fetch hotel offers: 500".into()));
        }
        Ok(vec![HotelOffer {
            hotel_name: format!("Hotel {}", query.hotel_id),
            total_price: Some("180.00".into()),
            latitude: Some(41.9),
            longitude: Some(12.5),
        }])
    }

    async fn flight_offers(
        &self,
        _token: &str,
        query: &FlightOfferQuery,
    ) -> Result<Vec<FlightOffer>> {
        *self.last_flight_currency.lock().unwrap() = Some(query.currency.clone());
        Ok(self.flights.clone())
    }

    async fn airline_name(&self, _token: &str, carrier_code: &str) -> Result<Option<String>> {
        Ok(self
            .airlines
            .iter()
            .find(|(code, _)| code == carrier_code)
            .map(|(_, name)| name.clone()))
    }
}
