//! Turn enriched fixtures into an LLM prompt and parse the betslip it returns.

use crate::api::openai_api::OpenAiClient;
use crate::models::EnrichedFixture;
use crate::utils::data::load_latest_fixtures;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BetslipError {
    #[error("Fixture IDs are required as an array")]
    MissingFixtureIds,

    #[error("Some fixtures not found: {0:?}")]
    FixturesNotFound(Vec<u64>),

    #[error("No fixture data has been fetched yet")]
    NoFixtureData,

    #[error("Betslip generation is not configured")]
    NotConfigured,

    #[error("Invalid betslip returned by model: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One suggested selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetSelection {
    pub fixture_id: u64,
    pub market: String,
    pub selection: String,
    pub odd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Betslip {
    pub total_odds: f64,
    pub bets: Vec<BetSelection>,
}

/// Numbers fed to the model for a single fixture
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureFeatures {
    pub home_rank: Option<u32>,
    pub away_rank: Option<u32>,
    pub home_form_score: f64,
    pub away_form_score: f64,
    pub home_avg_goals_scored: f64,
    pub away_avg_goals_conceded: f64,
    pub home_avg_corners: f64,
    pub away_avg_corners: f64,
}

/// Points from a W/D/L form string (3 per win, 1 per draw) scaled by 15,
/// the maximum over a five-match form
pub fn form_score(form: &str) -> f64 {
    let points: u32 = form
        .chars()
        .map(|c| match c {
            'W' => 3,
            'D' => 1,
            _ => 0,
        })
        .sum();
    f64::from(points) / 15.0
}

impl FixtureFeatures {
    pub fn from_fixture(fixture: &EnrichedFixture) -> Self {
        let home = &fixture.teams_stats.home;
        let away = &fixture.teams_stats.away;

        Self {
            home_rank: home.standings.rank,
            away_rank: away.standings.rank,
            home_form_score: form_score(&home.stats.form),
            away_form_score: form_score(&away.stats.form),
            home_avg_goals_scored: home.stats.goals.scored.average,
            away_avg_goals_conceded: away.stats.goals.against.average,
            home_avg_corners: home.stats.corners.total.average,
            away_avg_corners: away.stats.corners.total.average,
        }
    }
}

fn rank_label(rank: Option<u32>) -> String {
    rank.map(|r| r.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn team_label(name: Option<&str>) -> &str {
    name.unwrap_or("Unknown")
}

/// Build the instruction prompt for a low-odds betslip over `fixtures`
pub fn build_prompt(fixtures: &[EnrichedFixture]) -> String {
    let mut prompt = String::from(
        "You are a football betting AI designed to generate a betslip with low combined odds for the user. \
Given the following fixture data, suggest a combination of bets across the markets \
(1X2, Over 1.5 Goals, Over 9.5 Corners) with the lowest possible odds, ensuring a balanced risk-reward ratio. \
Prioritize odds below 2.0 where possible and combine at least 2 bets per fixture. \
Return the total odds and individual bets.\n\nFixtures:\n",
    );

    for fixture in fixtures {
        let features = FixtureFeatures::from_fixture(fixture);
        let odds = serde_json::to_string(&fixture.odds).unwrap_or_else(|_| "[]".to_string());
        let id = fixture
            .fixture
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "N/A".to_string());

        prompt.push_str(&format!(
            "\n- Fixture ID: {}\n  - Teams: {} vs {}\n  - Features:\n    - Home Rank: {}\n    - Away Rank: {}\n    - Home Form Score: {:.2}\n    - Away Form Score: {:.2}\n    - Home Avg Goals Scored: {}\n    - Away Avg Goals Conceded: {}\n    - Home Avg Corners: {}\n    - Away Avg Corners: {}\n  - Odds: {}\n",
            id,
            team_label(fixture.teams.home.name.as_deref()),
            team_label(fixture.teams.away.name.as_deref()),
            rank_label(features.home_rank),
            rank_label(features.away_rank),
            features.home_form_score,
            features.away_form_score,
            features.home_avg_goals_scored,
            features.away_avg_goals_conceded,
            features.home_avg_corners,
            features.away_avg_corners,
            odds,
        ));
    }

    prompt.push_str(
        "\nRules:\n\
- Favor 1X2 bets (home win, draw, away win) with odds < 2.0.\n\
- Favor Over 1.5 Goals if (home goals scored + away goals conceded) / 2 > 1.5.\n\
- Favor Over 9.5 Corners if (home corners + away corners) > 9.5.\n\
- Combine at least 2 bets per fixture, multiplying odds for the total.\n\
- Ensure total odds are minimized while covering all selected fixtures.\n\
\nOutput format:\n\
{\n  \"totalOdds\": number,\n  \"bets\": [\n    { \"fixtureId\": number, \"market\": string, \"selection\": string, \"odd\": number },\n    ...\n  ]\n}\n",
    );

    prompt
}

/// Pick the requested fixtures, in request order. Every id must exist.
pub fn select_fixtures(
    fixtures: Vec<EnrichedFixture>,
    ids: &[u64],
) -> Result<Vec<EnrichedFixture>, BetslipError> {
    if ids.is_empty() {
        return Err(BetslipError::MissingFixtureIds);
    }

    let mut seen = HashSet::new();
    let wanted: Vec<u64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    let mut selected = Vec::with_capacity(wanted.len());
    let mut missing = Vec::new();
    for id in wanted {
        match fixtures.iter().find(|f| f.fixture.id == Some(id)) {
            Some(fixture) => selected.push(fixture.clone()),
            None => missing.push(id),
        }
    }

    if missing.is_empty() {
        Ok(selected)
    } else {
        Err(BetslipError::FixturesNotFound(missing))
    }
}

/// Decode the model's answer, tolerating a fenced code block around the JSON
pub fn parse_betslip(content: &str) -> Result<Betslip, BetslipError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    Ok(serde_json::from_str(body.trim())?)
}

/// All fixtures from the newest output files
pub fn load_betslip_fixtures(data_dir: &Path) -> Result<Vec<EnrichedFixture>, BetslipError> {
    match load_latest_fixtures(data_dir)? {
        Some((date, groups)) => {
            info!(%date, fixtures = groups.len(), "Loaded fixtures for betslip");
            Ok(groups.into_fixtures())
        }
        None => Err(BetslipError::NoFixtureData),
    }
}

/// Load, select, prompt and parse in one go
pub async fn generate_betslip(
    llm: &OpenAiClient,
    data_dir: &Path,
    fixture_ids: &[u64],
) -> Result<Betslip, BetslipError> {
    if fixture_ids.is_empty() {
        return Err(BetslipError::MissingFixtureIds);
    }
    let dir = data_dir.to_path_buf();
    let fixtures = tokio::task::spawn_blocking(move || load_betslip_fixtures(&dir))
        .await
        .map_err(anyhow::Error::from)??;
    let selected = select_fixtures(fixtures, fixture_ids)?;
    let prompt = build_prompt(&selected);
    let content = llm.complete(&prompt).await?;
    parse_betslip(&content)
}
