//! Session profile resolution: birth profile in, kundali out.
//!
//! The resolver validates the profile, geocodes the birth place, asks the
//! chart service for the computation and assembles a [`ChartSummary`]. It
//! keeps no state between calls, so the same birth details always resolve
//! to the same chart.

use std::sync::Arc;

use chrono::{Datelike, Timelike};
use nakshatra_core::chart::{
    BirthDetails, ChartCalculator, ChartRequest, ChartSettings, ChartSummary, Geocoder, LocationDetails,
};
use nakshatra_core::error::{Error, ValidationError};
use nakshatra_core::profile::UserProfile;
use nakshatra_core::session::{ConversationState, SessionStore};
use tracing::{debug, info};

pub struct ChartResolver {
    geocoder: Arc<dyn Geocoder>,
    calculator: Arc<dyn ChartCalculator>,
    settings: ChartSettings,
    utc_offset: Option<String>,
}

impl ChartResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, calculator: Arc<dyn ChartCalculator>) -> Self {
        Self {
            geocoder,
            calculator,
            settings: ChartSettings {
                ayanamsa: "Lahiri".into(),
                house_system: "Equal".into(),
            },
            utc_offset: None,
        }
    }

    pub fn with_settings(mut self, ayanamsa: impl Into<String>, house_system: impl Into<String>) -> Self {
        self.settings = ChartSettings {
            ayanamsa: ayanamsa.into(),
            house_system: house_system.into(),
        };
        self
    }

    /// Force a UTC offset instead of letting the service derive one.
    pub fn with_utc_offset(mut self, utc_offset: Option<String>) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    pub fn geocoder(&self) -> &Arc<dyn Geocoder> {
        &self.geocoder
    }

    pub fn calculator(&self) -> &Arc<dyn ChartCalculator> {
        &self.calculator
    }

    /// Compute the kundali for a birth profile.
    pub async fn resolve(&self, profile: &UserProfile) -> Result<ChartSummary, Error> {
        profile.validate()?;
        let date = profile.parsed_date()?;
        let time = profile.parsed_time()?;

        let place = profile.birth_place.trim();
        let location = self.geocoder.locate(place).await?;

        let request = ChartRequest {
            name: profile.name.trim().to_string(),
            year: date.year(),
            month: date.month(),
            day: date.day(),
            hour: time.hour(),
            minute: time.minute(),
            second: 0,
            latitude: location.latitude,
            longitude: location.longitude,
            utc_offset: self.utc_offset.clone(),
            ayanamsa: self.settings.ayanamsa.clone(),
            house_system: self.settings.house_system.clone(),
        };
        let computation = self.calculator.compute(&request).await?;

        debug!(
            name = %request.name,
            utc_offset = %computation.utc_offset,
            planets = computation.planets.len(),
            "Chart computed"
        );

        Ok(ChartSummary {
            user_name: request.name,
            birth_details: BirthDetails {
                birth_date: profile.birth_date.trim().to_string(),
                birth_time: profile.birth_time.trim().to_string(),
                birth_place: place.to_string(),
                year: request.year,
                month: request.month,
                day: request.day,
                hour: request.hour,
                minute: request.minute,
                second: request.second,
            },
            location: LocationDetails {
                latitude: location.latitude,
                longitude: location.longitude,
                utc_offset: computation.utc_offset,
            },
            chart_settings: self.settings.clone(),
            key_positions: computation.key_positions,
            planets: computation.planets,
            houses: computation.houses,
            aspects: computation.aspects,
            dasha: computation.dasha,
        })
    }

    /// Load a session, or start one by resolving the supplied profile.
    ///
    /// An existing session keeps its stored chart and the supplied profile
    /// is ignored. Nothing is saved here; the caller persists the state once
    /// the turn completes.
    pub async fn resolve_session(
        &self,
        sessions: &dyn SessionStore,
        session_id: &str,
        profile: Option<&UserProfile>,
    ) -> Result<ConversationState, Error> {
        if let Some(state) = sessions.load(session_id).await? {
            if profile.is_some() {
                debug!(session_id, "Session already has a chart, ignoring supplied profile");
            }
            return Ok(state);
        }

        let profile = profile.ok_or_else(|| ValidationError::ProfileRequired(session_id.to_string()))?;
        let chart = self.resolve(profile).await?;

        let mut state = ConversationState::new(session_id);
        state.attach_chart(profile.clone(), chart);
        info!(session_id, sun = ?state.chart.as_ref().and_then(|c| c.sun_sign()), "Started new session");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nakshatra_core::chart::{ChartComputation, GeoLocation};
    use nakshatra_core::error::{ChartError, SessionError};
    use nakshatra_core::profile::Language;
    use nakshatra_core::vocabulary::ZodiacSign;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const FIXTURE: &str = include_str!("../../../fixtures/chart_computation.json");

    struct FixedGeocoder {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn locate(&self, place: &str) -> Result<GeoLocation, ChartError> {
            *self.calls.lock().unwrap() += 1;
            if place == "Atlantis" {
                return Err(ChartError::PlaceNotFound(place.into()));
            }
            Ok(GeoLocation { latitude: 18.52, longitude: 73.86 })
        }
    }

    #[derive(Default)]
    struct RecordingCalculator {
        requests: Mutex<Vec<ChartRequest>>,
    }

    #[async_trait]
    impl ChartCalculator for RecordingCalculator {
        fn name(&self) -> &str {
            "recording"
        }

        async fn compute(&self, request: &ChartRequest) -> Result<ChartComputation, ChartError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(serde_json::from_str(FIXTURE).unwrap())
        }
    }

    #[derive(Default)]
    struct MapStore {
        sessions: Mutex<HashMap<String, ConversationState>>,
    }

    #[async_trait]
    impl SessionStore for MapStore {
        fn name(&self) -> &str {
            "map"
        }

        async fn load(&self, id: &str) -> Result<Option<ConversationState>, SessionError> {
            Ok(self.sessions.lock().unwrap().get(id).cloned())
        }

        async fn save(&self, state: &ConversationState) -> Result<(), SessionError> {
            self.sessions.lock().unwrap().insert(state.session_id.clone(), state.clone());
            Ok(())
        }

        async fn count(&self) -> Result<usize, SessionError> {
            Ok(self.sessions.lock().unwrap().len())
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            name: "Asha".into(),
            birth_date: "1992-08-17".into(),
            birth_time: "06:45".into(),
            birth_place: "Pune, India".into(),
            preferred_language: Language::Hindi,
        }
    }

    fn resolver() -> (ChartResolver, Arc<FixedGeocoder>, Arc<RecordingCalculator>) {
        let geocoder = Arc::new(FixedGeocoder { calls: Mutex::new(0) });
        let calculator = Arc::new(RecordingCalculator::default());
        (ChartResolver::new(geocoder.clone(), calculator.clone()), geocoder, calculator)
    }

    #[tokio::test]
    async fn resolve_assembles_summary() {
        let (resolver, _, calculator) = resolver();
        let chart = resolver.resolve(&profile()).await.unwrap();

        assert_eq!(chart.user_name, "Asha");
        assert_eq!(chart.birth_details.hour, 6);
        assert_eq!(chart.birth_details.minute, 45);
        assert_eq!(chart.location.utc_offset, "+05:30");
        assert_eq!(chart.chart_settings.ayanamsa, "Lahiri");
        assert_eq!(chart.sun_sign(), Some(ZodiacSign::Leo));
        assert_eq!(chart.moon_sign(), Some(ZodiacSign::Virgo));
        assert_eq!(chart.ascendant_sign(), Some(ZodiacSign::Aries));

        let request = calculator.requests.lock().unwrap()[0].clone();
        assert_eq!((request.year, request.month, request.day), (1992, 8, 17));
        assert!(request.utc_offset.is_none());
        assert_eq!(request.house_system, "Equal");
    }

    #[tokio::test]
    async fn resolve_is_deterministic() {
        let (resolver, _, _) = resolver();
        let first = resolver.resolve(&profile()).await.unwrap();
        let second = resolver.resolve(&profile()).await.unwrap();
        assert_eq!(first.native_signs(), second.native_signs());
        assert_eq!(first.dasha, second.dasha);
    }

    #[tokio::test]
    async fn configured_offset_and_settings_are_forwarded() {
        let (resolver, _, calculator) = resolver();
        let resolver = resolver
            .with_settings("Raman", "Placidus")
            .with_utc_offset(Some("+05:30".into()));
        let chart = resolver.resolve(&profile()).await.unwrap();

        let request = calculator.requests.lock().unwrap()[0].clone();
        assert_eq!(request.utc_offset.as_deref(), Some("+05:30"));
        assert_eq!(request.ayanamsa, "Raman");
        assert_eq!(chart.chart_settings.house_system, "Placidus");
    }

    #[tokio::test]
    async fn invalid_profile_never_reaches_geocoder() {
        let (resolver, geocoder, _) = resolver();
        let mut bad = profile();
        bad.birth_date = "17/08/1992".into();

        let err = resolver.resolve(&bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::BirthDate(_))));
        assert_eq!(*geocoder.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_place_is_reported() {
        let (resolver, _, calculator) = resolver();
        let mut lost = profile();
        lost.birth_place = "Atlantis".into();

        let err = resolver.resolve(&lost).await.unwrap_err();
        assert!(matches!(err, Error::Chart(ChartError::PlaceNotFound(_))));
        assert!(calculator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_session_requires_profile() {
        let (resolver, _, _) = resolver();
        let store = MapStore::default();
        let err = resolver.resolve_session(&store, "s-1", None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::ProfileRequired(_))));
    }

    #[tokio::test]
    async fn new_session_gets_chart_and_language_without_saving() {
        let (resolver, _, _) = resolver();
        let store = MapStore::default();
        let state = resolver.resolve_session(&store, "s-1", Some(&profile())).await.unwrap();

        assert!(state.chart.is_some());
        assert_eq!(state.language, Language::Hindi);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn existing_session_ignores_new_profile() {
        let (resolver, geocoder, _) = resolver();
        let store = MapStore::default();
        let state = resolver.resolve_session(&store, "s-1", Some(&profile())).await.unwrap();
        store.save(&state).await.unwrap();

        let mut other = profile();
        other.name = "Someone Else".into();
        let again = resolver.resolve_session(&store, "s-1", Some(&other)).await.unwrap();

        assert_eq!(again.chart.unwrap().user_name, "Asha");
        assert_eq!(*geocoder.calls.lock().unwrap(), 1);
    }
}
