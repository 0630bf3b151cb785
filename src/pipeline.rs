//! Fetch fixtures for a date window, enrich each one with odds, head-to-head
//! history, team statistics and standings, then group and persist them.

use crate::api::football_api::{ApiFootballClient, RawFixture};
use crate::config::PipelineConfig;
use crate::models::{EnrichedFixture, Standing, TeamSide, TeamStatistics, TeamsStats};
use crate::utils::cleaner::{
    clean_fixture, clean_head_to_head, clean_league, clean_odds, clean_team_statistics,
    clean_teams, find_standing,
};
use crate::utils::data::{save_grouped_fixtures, SavedFiles};
use crate::utils::dates::fetch_window;
use crate::utils::grouping::GroupedFixtures;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Fixtures are enriched by a single worker, one at a time, to stay within
/// upstream rate limits.
pub const MAX_FIXTURES_IN_FLIGHT: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The window had no playable fixtures; nothing was written
    NoFixtures,
    Completed {
        fixtures: usize,
        domestic: usize,
        international: usize,
        files: SavedFiles,
    },
}

/// Drop fixtures the upstream marks as cancelled
pub fn discard_cancelled(fixtures: Vec<RawFixture>) -> Vec<RawFixture> {
    fixtures.into_iter().filter(|f| !f.is_cancelled()).collect()
}

pub struct FixturePipeline {
    client: ApiFootballClient,
    config: PipelineConfig,
}

impl FixturePipeline {
    pub fn new(client: ApiFootballClient, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch every date in turn and keep the non-cancelled fixtures
    pub async fn collect_fixtures(&self, dates: &[String]) -> Vec<RawFixture> {
        let mut all_fixtures = Vec::new();

        for date in dates {
            match self.client.fetch_fixtures_on(date).await {
                Some(fixtures) if !fixtures.is_empty() => {
                    let fetched = fixtures.len();
                    let mut kept = discard_cancelled(fixtures);
                    debug!(date = %date, fetched, kept = kept.len(), "Fixtures fetched");
                    all_fixtures.append(&mut kept);
                }
                _ => warn!(date = %date, "No fixture data for date"),
            }
        }

        all_fixtures
    }

    async fn team_statistics(
        &self,
        league: Option<u64>,
        season: Option<i32>,
        team: Option<u64>,
    ) -> TeamStatistics {
        let (Some(league), Some(season), Some(team)) = (league, season, team) else {
            return TeamStatistics::default();
        };
        self.client
            .fetch_team_statistics(league, season, team)
            .await
            .map(|raw| clean_team_statistics(&raw))
            .unwrap_or_default()
    }

    async fn team_standing(
        &self,
        league: Option<u64>,
        season: Option<i32>,
        team: Option<u64>,
    ) -> Standing {
        let (Some(league), Some(season), Some(team)) = (league, season, team) else {
            return Standing::default();
        };
        self.client
            .fetch_standings(league, season, team)
            .await
            .map(|responses| find_standing(&responses, team))
            .unwrap_or_default()
    }

    /// Merge every sub-fetch into one record. A failed sub-fetch leaves its
    /// field at the default; the fixture itself is always returned.
    pub async fn enrich_fixture(&self, raw: &RawFixture) -> EnrichedFixture {
        let fixture_id = raw.fixture.id;
        let home_id = raw.teams.home.id;
        let away_id = raw.teams.away.id;
        let league_id = raw.league.id;
        let season = raw.league.season;

        let odds = match fixture_id {
            Some(id) => self
                .client
                .fetch_odds(id, self.config.odds_bookmaker, self.config.odds_bet)
                .await
                .map(|responses| clean_odds(&responses))
                .unwrap_or_default(),
            None => Vec::new(),
        };

        let head_to_head = match (home_id, away_id) {
            (Some(home), Some(away)) => self
                .client
                .fetch_head_to_head(home, away, self.config.h2h_last)
                .await
                .map(|meetings| meetings.iter().map(clean_head_to_head).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let home_stats = self.team_statistics(league_id, season, home_id).await;
        let away_stats = self.team_statistics(league_id, season, away_id).await;
        let home_standing = self.team_standing(league_id, season, home_id).await;
        let away_standing = self.team_standing(league_id, season, away_id).await;

        if odds.is_empty() {
            debug!(fixture = ?fixture_id, "No odds available");
        }

        EnrichedFixture {
            fixture: clean_fixture(raw),
            league: clean_league(&raw.league),
            teams: clean_teams(raw),
            odds,
            head_to_head,
            teams_stats: TeamsStats {
                home: TeamSide {
                    id: home_id,
                    stats: home_stats,
                    standings: home_standing,
                },
                away: TeamSide {
                    id: away_id,
                    stats: away_stats,
                    standings: away_standing,
                },
            },
        }
    }

    /// Feed fixtures through a bounded channel to a single enrichment worker
    /// and group the results as they come out.
    pub async fn enrich_all(&self, fixtures: Vec<RawFixture>) -> GroupedFixtures {
        let total = fixtures.len();
        let (tx, rx) = mpsc::channel::<RawFixture>(MAX_FIXTURES_IN_FLIGHT);

        let feed = async move {
            for fixture in fixtures {
                if tx.send(fixture).await.is_err() {
                    break;
                }
            }
        };

        let worker = async {
            let mut groups = GroupedFixtures::new();
            let mut queue = ReceiverStream::new(rx);
            let mut done = 0;

            while let Some(raw) = queue.next().await {
                let enriched = self.enrich_fixture(&raw).await;
                done += 1;
                info!(
                    fixture = ?enriched.fixture.id,
                    "Enriched fixture {}/{}",
                    done,
                    total
                );
                groups.push(enriched);
            }

            groups
        };

        let ((), groups) = tokio::join!(feed, worker);
        groups
    }

    /// One full run for the window starting at `today`
    pub async fn run(&self, today: NaiveDate) -> Result<RunOutcome> {
        let dates = fetch_window(today, self.config.window_days);
        info!(
            from = ?dates.first(),
            to = ?dates.last(),
            "Fetching fixtures for window"
        );

        let fixtures = self.collect_fixtures(&dates).await;
        if fixtures.is_empty() {
            warn!("No fixtures found in window, skipping enrichment");
            return Ok(RunOutcome::NoFixtures);
        }
        info!(count = fixtures.len(), "Enriching fixtures");

        let groups = self.enrich_all(fixtures).await;
        let (total, domestic, international) = (
            groups.len(),
            groups.domestic_count(),
            groups.international_count(),
        );

        let data_dir = self.config.data_dir.clone();
        let files =
            tokio::task::spawn_blocking(move || save_grouped_fixtures(&groups, &data_dir, today))
                .await
                .context("Fixture save task failed")??;

        let outcome = RunOutcome::Completed {
            fixtures: total,
            domestic,
            international,
            files,
        };
        info!(?outcome, "Successfully fetched and enriched fixtures");
        Ok(outcome)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("a data fetch is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Serializes runs: a trigger that arrives while a run holds the lock is
/// rejected instead of queued.
pub struct JobRunner {
    pipeline: FixturePipeline,
    running: Mutex<()>,
}

impl JobRunner {
    pub fn new(pipeline: FixturePipeline) -> Self {
        Self {
            pipeline,
            running: Mutex::new(()),
        }
    }

    pub fn pipeline(&self) -> &FixturePipeline {
        &self.pipeline
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    pub async fn try_run(&self, today: NaiveDate) -> Result<RunOutcome, RunError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| RunError::AlreadyRunning)?;

        self.pipeline.run(today).await.map_err(|e| {
            error!(error = %e, "Error in data fetch");
            RunError::Failed(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::dates::parse_date;
    use serde_json::{json, Value};
    use std::path::Path;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn raw(value: Value) -> RawFixture {
        serde_json::from_value(value).unwrap()
    }

    fn fixture_json(id: u64, short: &str, country: &str, league: &str) -> Value {
        json!({
            "fixture": { "id": id, "date": "2025-03-17T15:00:00+00:00",
                         "status": { "long": "Not Started", "short": short } },
            "league": { "id": 39, "name": league, "country": country, "season": 2024 },
            "teams": { "home": { "id": id * 10, "name": format!("Home {id}") },
                       "away": { "id": id * 10 + 1, "name": format!("Away {id}") } },
            "goals": { "home": null, "away": null }
        })
    }

    fn envelope(response: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "errors": [], "response": response }))
    }

    fn pipeline(server: &MockServer, data_dir: &Path) -> FixturePipeline {
        FixturePipeline::new(
            ApiFootballClient::with_base_url("key".to_string(), server.uri()),
            PipelineConfig {
                data_dir: data_dir.to_path_buf(),
                ..PipelineConfig::default()
            },
        )
    }

    #[test]
    fn test_discard_cancelled_removes_only_cancelled() {
        let fixtures = vec![
            raw(fixture_json(1, "CANC", "England", "Premier League")),
            raw(fixture_json(2, "NS", "England", "Premier League")),
        ];
        let kept = discard_cancelled(fixtures);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].fixture.id, Some(2));
    }

    #[tokio::test]
    async fn test_enrich_fixture_with_every_sub_fetch_failing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&server, dir.path());
        let enriched = pipeline
            .enrich_fixture(&raw(fixture_json(1, "NS", "England", "Premier League")))
            .await;

        assert_eq!(enriched.fixture.id, Some(1));
        assert_eq!(enriched.teams.home.name.as_deref(), Some("Home 1"));
        assert_eq!(enriched.league.country.as_deref(), Some("England"));
        assert!(enriched.odds.is_empty());
        assert!(enriched.head_to_head.is_empty());
        assert_eq!(enriched.teams_stats.home.id, Some(10));
        assert_eq!(enriched.teams_stats.home.stats, TeamStatistics::default());
        assert_eq!(enriched.teams_stats.away.standings, Standing::default());
    }

    #[tokio::test]
    async fn test_enrich_fixture_merges_sub_fetches() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/odds"))
            .and(query_param("fixture", "1"))
            .and(query_param("bookmaker", "8"))
            .and(query_param("bet", "1"))
            .respond_with(envelope(json!([{ "bookmakers": [{ "id": 8, "name": "Bet365",
                "bets": [{ "id": 1, "name": "Match Winner", "values": [
                    { "value": "Home", "odd": "1.70" },
                    { "value": "Draw", "odd": "3.80" },
                    { "value": "Away", "odd": "5.00" } ] }] }] }])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/fixtures/headtohead"))
            .and(query_param("h2h", "10-11"))
            .respond_with(envelope(json!([{
                "fixture": { "id": 500, "date": "2024-11-02T15:00:00+00:00" },
                "teams": { "home": { "id": 11, "name": "Away 1" }, "away": { "id": 10, "name": "Home 1" } },
                "goals": { "home": 0, "away": 2 }
            }])))
            .mount(&server)
            .await;

        // Home statistics without a goals block
        Mock::given(method("GET"))
            .and(path("/teams/statistics"))
            .and(query_param("team", "10"))
            .respond_with(envelope(json!({ "form": "WWDLW" })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/teams/statistics"))
            .and(query_param("team", "11"))
            .respond_with(envelope(json!({
                "form": "LLD",
                "goals": { "for": { "average": { "total": "0.9" } },
                           "against": { "average": { "total": "2.1" } } }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/standings"))
            .and(query_param("team", "10"))
            .respond_with(envelope(json!([{ "league": { "id": 39, "season": 2024,
                "standings": [[ { "rank": 2, "team": { "id": 10 }, "points": 50 } ]] } }])))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&server, dir.path());
        let enriched = pipeline
            .enrich_fixture(&raw(fixture_json(1, "NS", "England", "Premier League")))
            .await;

        assert_eq!(enriched.odds.len(), 1);
        assert_eq!(enriched.odds[0].values[0].odd, 1.7);
        assert_eq!(enriched.head_to_head.len(), 1);
        assert_eq!(enriched.head_to_head[0].goals.away, Some(2));

        let home = &enriched.teams_stats.home;
        assert_eq!(home.stats.form, "WWDLW");
        assert_eq!(home.stats.goals.scored.average, 0.0);
        assert_eq!(home.stats.goals.against.average, 0.0);
        assert_eq!(home.standings.rank, Some(2));

        let away = &enriched.teams_stats.away;
        assert_eq!(away.stats.goals.against.average, 2.1);
        assert_eq!(away.standings, Standing::default());
    }

    #[tokio::test]
    async fn test_enrich_fixture_without_ids_skips_sub_fetches() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&server, dir.path());

        let enriched = pipeline
            .enrich_fixture(&raw(json!({ "fixture": { "date": "2025-03-17" } })))
            .await;

        assert_eq!(enriched.fixture.id, None);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collect_fixtures_survives_failing_dates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .and(query_param("date", "2025-03-17"))
            .respond_with(envelope(json!([
                fixture_json(1, "NS", "England", "Premier League"),
                fixture_json(2, "CANC", "England", "Premier League")
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .and(query_param("date", "2025-03-18"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .and(query_param("date", "2025-03-19"))
            .respond_with(envelope(json!([fixture_json(3, "NS", "World", "Friendlies")])))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&server, dir.path());
        let dates = fetch_window(parse_date("2025-03-17").unwrap(), 3);
        let fixtures = pipeline.collect_fixtures(&dates).await;

        let ids: Vec<_> = fixtures.iter().map(|f| f.fixture.id).collect();
        assert_eq!(ids, vec![Some(1), Some(3)]);
    }

    #[tokio::test]
    async fn test_run_without_fixtures_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .respond_with(envelope(json!([])))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let pipeline = pipeline(&server, &data_dir);

        let outcome = pipeline.run(parse_date("2025-03-17").unwrap()).await.unwrap();
        assert_eq!(outcome, RunOutcome::NoFixtures);
        assert!(!data_dir.exists());
    }

    #[tokio::test]
    async fn test_enrich_all_processes_fixtures_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(envelope(json!([])))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&server, dir.path());
        let fixtures = vec![
            raw(fixture_json(1, "NS", "England", "Premier League")),
            raw(fixture_json(2, "NS", "England", "Premier League")),
            raw(fixture_json(3, "NS", "England", "Premier League")),
        ];
        let groups = pipeline.enrich_all(fixtures).await;

        let ids: Vec<_> = groups.domestic["England"].leagues["Premier League"]
            .fixtures
            .iter()
            .map(|f| f.fixture.id)
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);

        // All sub-fetches of one fixture happen before the next fixture starts
        let requests = server.received_requests().await.unwrap();
        let odds_order: Vec<String> = requests
            .iter()
            .filter(|r| r.url.path() == "/odds")
            .filter_map(|r| {
                r.url
                    .query_pairs()
                    .find(|(k, _)| k == "fixture")
                    .map(|(_, v)| v.into_owned())
            })
            .collect();
        assert_eq!(odds_order, vec!["1", "2", "3"]);

        let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
        assert_eq!(paths.len(), 18);
        assert_eq!(
            &paths[..6],
            &[
                "/odds",
                "/fixtures/headtohead",
                "/teams/statistics",
                "/teams/statistics",
                "/standings",
                "/standings"
            ]
        );
    }

    #[tokio::test]
    async fn test_job_runner_skips_when_busy() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let runner = JobRunner::new(pipeline(&server, dir.path()));

        let held = runner.running.lock().await;
        assert!(runner.is_running());
        let result = runner.try_run(parse_date("2025-03-17").unwrap()).await;
        assert!(matches!(result, Err(RunError::AlreadyRunning)));
        drop(held);

        assert!(!runner.is_running());
    }
}
