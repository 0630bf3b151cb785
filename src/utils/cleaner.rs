//! Reduce raw API-Football objects to the shapes kept in the output files.

use crate::api::football_api::{
    RawFixture, RawLeague, RawOddsResponse, RawStandingsResponse, RawTeam, RawTeamStatistics,
};
use crate::models::{
    Average, CornerAverages, FixtureSummary, GoalAverages, Goals, HeadToHeadRecord, League,
    OddValue, OddsEntry, Standing, Team, TeamPair, TeamStatistics,
};

pub fn clean_fixture(raw: &RawFixture) -> FixtureSummary {
    FixtureSummary {
        id: raw.fixture.id,
        date: raw.fixture.date.clone(),
    }
}

pub fn clean_team(raw: &RawTeam) -> Team {
    Team {
        id: raw.id,
        name: raw.name.clone(),
    }
}

pub fn clean_league(raw: &RawLeague) -> League {
    League {
        id: raw.id,
        name: raw.name.clone(),
        country: raw.country.clone(),
        season: raw.season,
    }
}

pub fn clean_teams(raw: &RawFixture) -> TeamPair {
    TeamPair {
        home: clean_team(&raw.teams.home),
        away: clean_team(&raw.teams.away),
    }
}

pub fn clean_head_to_head(raw: &RawFixture) -> HeadToHeadRecord {
    HeadToHeadRecord {
        fixture: clean_fixture(raw),
        teams: clean_teams(raw),
        goals: Goals {
            home: raw.goals.home,
            away: raw.goals.away,
        },
    }
}

/// Flatten every bookmaker's bets into market entries.
/// Selections without a usable odd are dropped.
pub fn clean_odds(responses: &[RawOddsResponse]) -> Vec<OddsEntry> {
    responses
        .iter()
        .flat_map(|response| response.bookmakers.iter())
        .flat_map(|bookmaker| bookmaker.bets.iter())
        .map(|bet| OddsEntry {
            market: bet.name.clone().unwrap_or_else(|| "Unknown Market".to_string()),
            values: bet
                .values
                .iter()
                .filter_map(|v| {
                    Some(OddValue {
                        value: v.value.clone()?,
                        odd: v.odd?,
                    })
                })
                .collect(),
        })
        .collect()
}

pub fn clean_team_statistics(raw: &RawTeamStatistics) -> TeamStatistics {
    let form = raw
        .form
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or("N/A");

    TeamStatistics {
        form: form.to_string(),
        goals: GoalAverages {
            scored: Average {
                average: raw.goals.scored.average.unwrap_or(0.0),
            },
            against: Average {
                average: raw.goals.against.average.unwrap_or(0.0),
            },
        },
        corners: CornerAverages {
            total: Average {
                average: raw.corners.total.average.unwrap_or(0.0),
            },
        },
    }
}

/// The table row for `team_id` across every standings group, or an empty standing
pub fn find_standing(responses: &[RawStandingsResponse], team_id: u64) -> Standing {
    responses
        .iter()
        .flat_map(|response| response.league.standings.iter())
        .flatten()
        .find(|row| row.team.id == Some(team_id))
        .map(|row| Standing {
            rank: row.rank,
            points: row.points,
            goals_diff: row.goals_diff,
            group: row.group.clone(),
            form: row.form.clone(),
            description: row.description.clone(),
            played: row.all.played,
            win: row.all.win,
            draw: row.all.draw,
            lose: row.all.lose,
        })
        .unwrap_or_default()
}
