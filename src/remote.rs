//! Client for the companion microservice that serves pre-classified data.
//!
//! The service owns classification for this path; this client only fetches,
//! caches and hands the payload through. Calls are blocking and never
//! retried: a failure surfaces immediately as a labeled error for the host
//! to display. Every fetch is memoized for five minutes, keyed by its
//! parameters, through an explicit [`TtlCache`].

use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::cache::TtlCache;
use crate::{Error, Result};

/// How long a fetched response stays valid.
pub const REMOTE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
struct RegioesResponse {
    regioes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MunicipiosResponse {
    municipios: Vec<String>,
}

/// Blocking client with per-endpoint memoization.
pub struct RemoteClient {
    base_url: String,
    http: reqwest::blocking::Client,
    regioes: TtlCache<(), Vec<String>>,
    municipios: TtlCache<String, Vec<String>>,
    geojson: TtlCache<String, serde_json::Value>,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        RemoteClient {
            base_url,
            http: reqwest::blocking::Client::new(),
            regioes: TtlCache::new(REMOTE_TTL),
            municipios: TtlCache::new(REMOTE_TTL),
            geojson: TtlCache::new(REMOTE_TTL),
        }
    }

    /// `GET /regioes`.
    pub fn regioes(&mut self) -> Result<Vec<String>> {
        let url = format!("{}/regioes", self.base_url);
        let http = &self.http;
        self.regioes.get_or_try_insert((), || {
            let response: RegioesResponse = fetch_json(http, &url)?;
            Ok(response.regioes)
        })
    }

    /// `GET /municipios?regiao=`. A 404 means the region has no
    /// municipality list and comes back as empty, not as an error.
    pub fn municipios(&mut self, regiao: &str) -> Result<Vec<String>> {
        let url = format!("{}/municipios?regiao={}", self.base_url, encode(regiao));
        let http = &self.http;
        self.municipios.get_or_try_insert(regiao.to_string(), || {
            let response = http
                .get(&url)
                .send()
                .map_err(|source| Error::Remote { url: url.clone(), source })?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                debug!("no municipality list for '{regiao}' (404), treating as empty");
                return Ok(Vec::new());
            }
            let response = check_status(response, &url)?;
            let parsed: MunicipiosResponse = response
                .json()
                .map_err(|source| Error::Remote { url: url.clone(), source })?;
            Ok(parsed.municipios)
        })
    }

    /// `GET /geojson?regiao=`. `Ok(None)` is the no-data signal: the
    /// request succeeded but nothing matched.
    pub fn geojson_por_regiao(&mut self, regiao: &str) -> Result<Option<serde_json::Value>> {
        self.fetch_geojson("regiao", regiao)
    }

    /// `GET /geojson?municipio=`, same no-data convention.
    pub fn geojson_por_municipio(&mut self, municipio: &str) -> Result<Option<serde_json::Value>> {
        self.fetch_geojson("municipio", municipio)
    }

    fn fetch_geojson(&mut self, param: &str, value: &str) -> Result<Option<serde_json::Value>> {
        let url = format!("{}/geojson?{}={}", self.base_url, param, encode(value));
        let http = &self.http;
        let payload = self
            .geojson
            .get_or_try_insert(url.clone(), || fetch_json(http, &url))?;
        if has_features(&payload) {
            Ok(Some(payload))
        } else {
            Ok(None)
        }
    }
}

fn fetch_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::blocking::Client,
    url: &str,
) -> Result<T> {
    let response = http
        .get(url)
        .send()
        .map_err(|source| Error::Remote { url: url.to_string(), source })?;
    let response = check_status(response, url)?;
    response
        .json()
        .map_err(|source| Error::Remote { url: url.to_string(), source })
}

fn check_status(
    response: reqwest::blocking::Response,
    url: &str,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::RemoteStatus { url: url.to_string(), status });
    }
    Ok(response)
}

/// Whether a FeatureCollection payload actually carries features. An empty
/// or missing `features` array is "no results", never an error.
fn has_features(payload: &serde_json::Value) -> bool {
    payload
        .get("features")
        .and_then(|features| features.as_array())
        .is_some_and(|features| !features.is_empty())
}

/// Minimal query-string escaping for the two reserved characters that occur
/// in region and municipality names.
fn encode(value: &str) -> String {
    value.replace('%', "%25").replace('&', "%26").replace(' ', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_list_parses_from_the_documented_shape() {
        let payload = r#"{"regioes": ["Cariri", "Grande Fortaleza"]}"#;
        let parsed: RegioesResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.regioes, vec!["Cariri", "Grande Fortaleza"]);
    }

    #[test]
    fn empty_or_missing_features_is_no_data() {
        let empty: serde_json::Value =
            serde_json::from_str(r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(!has_features(&empty));

        let missing: serde_json::Value =
            serde_json::from_str(r#"{"type":"FeatureCollection"}"#).unwrap();
        assert!(!has_features(&missing));

        let full: serde_json::Value = serde_json::from_str(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature"}]}"#,
        )
        .unwrap();
        assert!(has_features(&full));
    }

    #[test]
    fn names_with_spaces_stay_in_one_query_value() {
        assert_eq!(encode("Grande Fortaleza"), "Grande%20Fortaleza");
        assert_eq!(encode("A&B"), "A%26B");
    }

    #[test]
    fn trailing_slash_is_trimmed_from_the_base_url() {
        let client = RemoteClient::new("http://localhost:8000/");
        assert_eq!(client.base_url, "http://localhost:8000");
    }
}
