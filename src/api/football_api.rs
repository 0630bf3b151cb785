use crate::config::ApiFootballConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, error, warn};

pub const API_FOOTBALL_BASE_URL: &str = "https://v3.football.api-sports.io";

/// Every API-Football response is wrapped in `{ response, errors }`
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    response: Option<T>,
    #[serde(default)]
    errors: Value, // `[]` when fine, an object of messages otherwise
}

fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

/// Treat an explicit `null` the same as a missing field
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Numbers arrive as `1.5`, `"1.5"`, or `{ "home": .., "away": .., "total": .. }`
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("total").and_then(number_from_value),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Fixture as returned by `fixtures` and `fixtures/headtohead`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFixture {
    #[serde(deserialize_with = "null_default")]
    pub fixture: RawFixtureInfo,
    #[serde(deserialize_with = "null_default")]
    pub league: RawLeague,
    #[serde(deserialize_with = "null_default")]
    pub teams: RawTeams,
    #[serde(deserialize_with = "null_default")]
    pub goals: RawGoals,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFixtureInfo {
    pub id: Option<u64>,
    pub date: Option<String>,
    pub timestamp: Option<i64>,
    #[serde(deserialize_with = "null_default")]
    pub status: RawStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStatus {
    pub long: Option<String>,
    pub short: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLeague {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub country: Option<String>,
    pub season: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTeams {
    #[serde(deserialize_with = "null_default")]
    pub home: RawTeam,
    #[serde(deserialize_with = "null_default")]
    pub away: RawTeam,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTeam {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGoals {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

impl RawFixture {
    /// API-Football marks cancelled matches with short status `CANC`
    pub fn is_cancelled(&self) -> bool {
        let status = &self.fixture.status;
        let short_cancelled = status.short.as_deref().is_some_and(|s| {
            s.eq_ignore_ascii_case("CANC") || s.eq_ignore_ascii_case("cancelled")
        });
        let long_cancelled = status
            .long
            .as_deref()
            .is_some_and(|s| s.to_ascii_lowercase().contains("cancelled"));
        short_cancelled || long_cancelled
    }
}

/// One entry of the `odds` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOddsResponse {
    pub bookmakers: Vec<RawBookmaker>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBookmaker {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub bets: Vec<RawBet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBet {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub values: Vec<RawOddValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOddValue {
    #[serde(deserialize_with = "lenient_string")]
    pub value: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub odd: Option<f64>,
}

/// The `teams/statistics` response (an object, not a list)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTeamStatistics {
    pub form: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub goals: RawStatGoals,
    #[serde(deserialize_with = "null_default")]
    pub corners: RawStatCorners,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStatGoals {
    #[serde(rename = "for", deserialize_with = "null_default")]
    pub scored: RawAverageBlock,
    #[serde(deserialize_with = "null_default")]
    pub against: RawAverageBlock,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStatCorners {
    #[serde(deserialize_with = "null_default")]
    pub total: RawAverageBlock,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAverageBlock {
    #[serde(deserialize_with = "lenient_f64")]
    pub average: Option<f64>,
}

/// One entry of the `standings` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStandingsResponse {
    #[serde(deserialize_with = "null_default")]
    pub league: RawStandingsLeague,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStandingsLeague {
    pub id: Option<u64>,
    pub season: Option<i32>,
    pub standings: Vec<Vec<RawStanding>>, // one table per group
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawStanding {
    pub rank: Option<u32>,
    #[serde(deserialize_with = "null_default")]
    pub team: RawTeam,
    pub points: Option<i32>,
    pub goals_diff: Option<i32>,
    pub group: Option<String>,
    pub form: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub all: RawRecord,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub played: Option<u32>,
    pub win: Option<u32>,
    pub draw: Option<u32>,
    pub lose: Option<u32>,
}

/// Thin wrapper over the API-Football v3 REST API.
///
/// Every call degrades to `None` on failure; callers substitute defaults.
pub struct ApiFootballClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl ApiFootballClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, API_FOOTBALL_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ApiFootballConfig) -> Self {
        Self::with_base_url(config.api_key.clone(), config.base_url.clone())
    }

    /// GET `{base_url}/{endpoint}` and return the raw JSON body, or `None` on any failure
    pub async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Option<Value> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);

        let response = match self
            .client
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .query(params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(endpoint, error = %e, "Request to API-Football failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(endpoint, %status, body = %body, "API-Football returned error");
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => {
                debug!(endpoint, ?params, "API-Football response received");
                Some(body)
            }
            Err(e) => {
                error!(endpoint, error = %e, "Failed to parse API-Football response");
                None
            }
        }
    }

    /// Fetch and decode the `response` member of the envelope
    pub async fn fetch_response<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Option<T> {
        let body = self.fetch(endpoint, params).await?;

        let envelope: ApiEnvelope<T> = match serde_json::from_value(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(endpoint, error = %e, "Unexpected API-Football response shape");
                return None;
            }
        };

        if has_errors(&envelope.errors) {
            warn!(endpoint, errors = %envelope.errors, "API-Football reported errors");
        }

        envelope.response
    }

    /// All fixtures scheduled on a calendar day (`YYYY-MM-DD`, UTC)
    pub async fn fetch_fixtures_on(&self, date: &str) -> Option<Vec<RawFixture>> {
        self.fetch_response(
            "fixtures",
            &[("date", date.to_string()), ("timezone", "UTC".to_string())],
        )
        .await
    }

    /// One bookmaker/bet-type market for a fixture
    pub async fn fetch_odds(
        &self,
        fixture_id: u64,
        bookmaker: u32,
        bet: u32,
    ) -> Option<Vec<RawOddsResponse>> {
        self.fetch_response(
            "odds",
            &[
                ("fixture", fixture_id.to_string()),
                ("bookmaker", bookmaker.to_string()),
                ("bet", bet.to_string()),
            ],
        )
        .await
    }

    /// Previous meetings between two teams, most recent first
    pub async fn fetch_head_to_head(
        &self,
        home_team: u64,
        away_team: u64,
        last: u32,
    ) -> Option<Vec<RawFixture>> {
        self.fetch_response(
            "fixtures/headtohead",
            &[
                ("h2h", format!("{}-{}", home_team, away_team)),
                ("last", last.to_string()),
            ],
        )
        .await
    }

    pub async fn fetch_team_statistics(
        &self,
        league: u64,
        season: i32,
        team: u64,
    ) -> Option<RawTeamStatistics> {
        self.fetch_response(
            "teams/statistics",
            &[
                ("league", league.to_string()),
                ("season", season.to_string()),
                ("team", team.to_string()),
            ],
        )
        .await
    }

    /// League table rows filtered to one team
    pub async fn fetch_standings(
        &self,
        league: u64,
        season: i32,
        team: u64,
    ) -> Option<Vec<RawStandingsResponse>> {
        self.fetch_response(
            "standings",
            &[
                ("league", league.to_string()),
                ("season", season.to_string()),
                ("team", team.to_string()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn test_fetch_sends_api_key_and_params() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .and(header("x-apisports-key", "secret"))
            .and(query_param("date", "2025-03-17"))
            .and(query_param("timezone", "UTC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [],
                "response": [{
                    "fixture": { "id": 1, "date": "2025-03-17T15:00:00+00:00",
                                 "status": { "long": "Not Started", "short": "NS" } },
                    "league": { "id": 39, "name": "Premier League", "country": "England", "season": 2024 },
                    "teams": { "home": { "id": 33, "name": "Manchester United" },
                               "away": { "id": 34, "name": "Newcastle" } },
                    "goals": { "home": null, "away": null }
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = ApiFootballClient::with_base_url("secret".to_string(), mock_server.uri());
        let fixtures = client.fetch_fixtures_on("2025-03-17").await.unwrap();

        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].fixture.id, Some(1));
        assert_eq!(fixtures[0].league.country.as_deref(), Some("England"));
        assert_eq!(fixtures[0].teams.away.name.as_deref(), Some("Newcastle"));
        assert_eq!(fixtures[0].goals.home, None);
    }

    #[tokio::test]
    async fn test_fetch_returns_none_on_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/odds"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let client = ApiFootballClient::with_base_url("key".to_string(), mock_server.uri());

        assert!(client.fetch("odds", &[]).await.is_none());
        assert!(client.fetch_odds(1, 8, 1).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_returns_none_when_unreachable() {
        let client = ApiFootballClient::with_base_url("key".to_string(), "http://127.0.0.1:1");
        assert!(client.fetch("fixtures", &[]).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_response_with_reported_errors_keeps_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": { "rateLimit": "Too many requests" },
                "response": []
            })))
            .mount(&mock_server)
            .await;

        let client = ApiFootballClient::with_base_url("key".to_string(), mock_server.uri());
        let fixtures = client.fetch_fixtures_on("2025-03-17").await.unwrap();
        assert!(fixtures.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_response_wrong_shape_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/teams/statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [],
                "response": []
            })))
            .mount(&mock_server)
            .await;

        let client = ApiFootballClient::with_base_url("key".to_string(), mock_server.uri());
        assert!(client.fetch_team_statistics(39, 2024, 33).await.is_none());
    }

    #[test]
    fn test_statistics_accept_string_and_nested_averages() {
        let stats: RawTeamStatistics = serde_json::from_value(json!({
            "form": "WWDLW",
            "goals": {
                "for": { "average": { "home": "2.0", "away": "1.0", "total": "1.5" } },
                "against": { "average": "0.9" }
            },
            "corners": null
        }))
        .unwrap();

        assert_eq!(stats.form.as_deref(), Some("WWDLW"));
        assert_eq!(stats.goals.scored.average, Some(1.5));
        assert_eq!(stats.goals.against.average, Some(0.9));
        assert_eq!(stats.corners.total.average, None);
    }

    #[test]
    fn test_odd_values_accept_strings_and_numbers() {
        let odds: RawOddsResponse = serde_json::from_value(json!({
            "bookmakers": [{
                "id": 8, "name": "Bet365",
                "bets": [{ "id": 1, "name": "Match Winner", "values": [
                    { "value": "Home", "odd": "1.85" },
                    { "value": 2, "odd": 3.4 },
                    { "value": "Away", "odd": "n/a" }
                ]}]
            }]
        }))
        .unwrap();

        let values = &odds.bookmakers[0].bets[0].values;
        assert_eq!(values[0].odd, Some(1.85));
        assert_eq!(values[1].value.as_deref(), Some("2"));
        assert_eq!(values[1].odd, Some(3.4));
        assert_eq!(values[2].odd, None);
    }

    #[test]
    fn test_is_cancelled() {
        let mut fixture = RawFixture::default();
        assert!(!fixture.is_cancelled());

        fixture.fixture.status.short = Some("CANC".to_string());
        assert!(fixture.is_cancelled());

        fixture.fixture.status.short = Some("NS".to_string());
        fixture.fixture.status.long = Some("Match Cancelled".to_string());
        assert!(fixture.is_cancelled());

        fixture.fixture.status.short = Some("cancelled".to_string());
        fixture.fixture.status.long = None;
        assert!(fixture.is_cancelled());
    }

    #[test]
    fn test_null_nested_objects_use_defaults() {
        let fixture: RawFixture = serde_json::from_value(json!({
            "fixture": { "id": 5, "status": null },
            "league": null,
            "teams": { "home": null, "away": { "id": 2 } }
        }))
        .unwrap();

        assert_eq!(fixture.fixture.id, Some(5));
        assert!(fixture.league.country.is_none());
        assert!(fixture.teams.home.id.is_none());
        assert_eq!(fixture.teams.away.id, Some(2));
    }
}
