use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::entities::Coordinates;
use crate::error::Error;
use crate::external::{nominatim, ors};
use crate::normalize::{normalize_cep, normalize_text};

const REQUEST_DELAY: Duration = Duration::from_millis(900);

#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, Error>;
}

pub struct OrsProvider;

#[async_trait]
impl GeocodeProvider for OrsProvider {
    fn name(&self) -> &'static str {
        "ors"
    }

    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, Error> {
        ors::geocode_search(query).await
    }
}

pub struct NominatimProvider;

#[async_trait]
impl GeocodeProvider for NominatimProvider {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, Error> {
        nominatim::geocode_search(query).await
    }
}

pub struct Geocoder {
    providers: Vec<Arc<dyn GeocodeProvider>>,
    memo: Mutex<HashMap<String, Option<Coordinates>>>,
    request_delay: Duration,
}

impl Geocoder {
    pub fn new() -> Self {
        Self::with_providers(
            vec![
                Arc::new(OrsProvider) as Arc<dyn GeocodeProvider>,
                Arc::new(NominatimProvider),
            ],
            REQUEST_DELAY,
        )
    }

    pub fn with_providers(
        providers: Vec<Arc<dyn GeocodeProvider>>,
        request_delay: Duration,
    ) -> Self {
        Self {
            providers,
            memo: Mutex::new(HashMap::new()),
            request_delay,
        }
    }

    // Every provider response, miss included, is memoized so a batch never
    // repeats an external call. Provider errors count as misses.
    #[tracing::instrument(skip(self))]
    pub async fn lookup(&self, query: &str) -> Option<Coordinates> {
        let normalized = normalize_text(query);
        if normalized.is_empty() {
            return None;
        }

        for provider in &self.providers {
            let memo_key = format!("{}:{}", provider.name(), normalized);

            if let Some(&memoized) = self.memo.lock().await.get(&memo_key) {
                if memoized.is_some() {
                    return memoized;
                }
                // known miss for this provider, move on
                continue;
            }

            tokio::time::sleep(self.request_delay).await;

            let result = match provider.geocode(query).await {
                Ok(coords) => Coordinates::sanitize(coords),
                Err(error) => {
                    tracing::warn!(provider = provider.name(), ?error, query, "geocode failed");
                    None
                }
            };

            self.memo.lock().await.insert(memo_key, result);

            if result.is_some() {
                return result;
            }
        }

        None
    }

    // Contextual query (digits, city, state, Brasil) first, bare CEP second.
    #[tracing::instrument(skip(self))]
    pub async fn lookup_cep(
        &self,
        cep: &str,
        city: Option<&str>,
        state: Option<&str>,
    ) -> Option<Coordinates> {
        let formatted = normalize_cep(cep);
        if formatted.is_empty() {
            return None;
        }

        let digits: String = formatted.chars().filter(|c| c.is_ascii_digit()).collect();

        let mut parts = vec![digits];
        if let Some(city) = city.map(normalize_text).filter(|c| !c.is_empty()) {
            parts.push(city);
        }
        if let Some(state) = state.map(normalize_text).filter(|s| !s.is_empty()) {
            parts.push(state);
        }
        parts.push("Brasil".into());

        let contextual = parts.join(", ");
        if let Some(coords) = self.lookup(&contextual).await {
            return Some(coords);
        }

        self.lookup(&formatted).await
    }
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct FakeProvider {
        name: &'static str,
        result: Option<Coordinates>,
        calls: StdMutex<Vec<String>>,
    }

    impl FakeProvider {
        fn new(name: &'static str, result: Option<Coordinates>) -> Arc<Self> {
            Arc::new(Self {
                name,
                result,
                calls: StdMutex::new(vec![]),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GeocodeProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, Error> {
            self.calls.lock().unwrap().push(query.to_string());
            Ok(self.result)
        }
    }

    fn campinas() -> Coordinates {
        Coordinates::new(-22.9, -47.06)
    }

    #[tokio::test]
    async fn primary_hit_skips_fallback() {
        let primary = FakeProvider::new("primary", Some(campinas()));
        let fallback = FakeProvider::new("fallback", Some(Coordinates::new(-23.0, -46.0)));

        let geocoder = Geocoder::with_providers(
            vec![
                primary.clone() as Arc<dyn GeocodeProvider>,
                fallback.clone(),
            ],
            Duration::ZERO,
        );

        let coords = geocoder.lookup("Rua A, Campinas, SP").await;
        assert_eq!(coords, Some(campinas()));
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn primary_miss_falls_back() {
        let primary = FakeProvider::new("primary", None);
        let fallback = FakeProvider::new("fallback", Some(campinas()));

        let geocoder = Geocoder::with_providers(
            vec![
                primary.clone() as Arc<dyn GeocodeProvider>,
                fallback.clone(),
            ],
            Duration::ZERO,
        );

        let coords = geocoder.lookup("Rua A, Campinas, SP").await;
        assert_eq!(coords, Some(campinas()));
        assert_eq!(fallback.call_count(), 1);
    }

    #[tokio::test]
    async fn out_of_bounds_result_counts_as_miss() {
        let primary = FakeProvider::new("primary", Some(Coordinates::new(38.72, -9.14)));
        let fallback = FakeProvider::new("fallback", Some(campinas()));

        let geocoder = Geocoder::with_providers(
            vec![
                primary.clone() as Arc<dyn GeocodeProvider>,
                fallback.clone(),
            ],
            Duration::ZERO,
        );

        let coords = geocoder.lookup("Rua A, Campinas, SP").await;
        assert_eq!(coords, Some(campinas()));
    }

    #[tokio::test]
    async fn repeated_lookups_are_memoized() {
        let primary = FakeProvider::new("primary", Some(campinas()));

        let geocoder = Geocoder::with_providers(vec![primary.clone() as Arc<dyn GeocodeProvider>], Duration::ZERO);

        assert!(geocoder.lookup("Rua A, Campinas").await.is_some());
        assert!(geocoder.lookup("  rua a,   campinas ").await.is_some());
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn misses_are_memoized_too() {
        let primary = FakeProvider::new("primary", None);

        let geocoder = Geocoder::with_providers(vec![primary.clone() as Arc<dyn GeocodeProvider>], Duration::ZERO);

        assert!(geocoder.lookup("Rua Inexistente").await.is_none());
        assert!(geocoder.lookup("Rua Inexistente").await.is_none());
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn cep_lookup_tries_contextual_query_first() {
        let primary = FakeProvider::new("primary", None);

        let geocoder = Geocoder::with_providers(vec![primary.clone() as Arc<dyn GeocodeProvider>], Duration::ZERO);

        let coords = geocoder
            .lookup_cep("13054-703", Some("Campinas"), Some("SP"))
            .await;
        assert!(coords.is_none());

        assert_eq!(
            primary.calls(),
            vec![
                "13054703, CAMPINAS, SP, Brasil".to_string(),
                "13054-703".to_string(),
            ]
        );
    }

    #[test]
    fn blank_inputs_short_circuit() {
        use tokio_test::block_on;

        let primary = FakeProvider::new("primary", Some(campinas()));

        let geocoder = Geocoder::with_providers(vec![primary.clone() as Arc<dyn GeocodeProvider>], Duration::ZERO);

        assert!(block_on(geocoder.lookup("   ")).is_none());
        assert!(block_on(geocoder.lookup_cep("sem cep", None, None)).is_none());
        assert_eq!(primary.call_count(), 0);
    }
}
