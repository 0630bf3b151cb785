use serde::{Deserialize, Serialize};

/// Fixture identity as kept in the output files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>, // RFC 3339 kickoff, as sent upstream
}

/// A team reduced to id + name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamPair {
    #[serde(default)]
    pub home: Team,
    #[serde(default)]
    pub away: Team,
}

/// The league a fixture belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct League {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<i32>,
}

/// One selection inside a betting market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddValue {
    pub value: String, // e.g. "Home", "Draw", "Over 1.5"
    pub odd: f64,      // decimal odds
}

/// A betting market with its selections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsEntry {
    pub market: String,
    #[serde(default)]
    pub values: Vec<OddValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away: Option<u32>,
}

/// A previous meeting between the same two teams
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadToHeadRecord {
    #[serde(default)]
    pub fixture: FixtureSummary,
    #[serde(default)]
    pub teams: TeamPair,
    #[serde(default)]
    pub goals: Goals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Average {
    #[serde(default)]
    pub average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalAverages {
    #[serde(rename = "for", default)]
    pub scored: Average,
    #[serde(default)]
    pub against: Average,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerAverages {
    #[serde(default)]
    pub total: Average,
}

/// Season aggregates for one team. Absent numbers are 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatistics {
    #[serde(default = "default_form")]
    pub form: String, // W/D/L sequence, "N/A" when unknown
    #[serde(default)]
    pub goals: GoalAverages,
    #[serde(default)]
    pub corners: CornerAverages,
}

fn default_form() -> String {
    "N/A".to_string()
}

impl Default for TeamStatistics {
    fn default() -> Self {
        Self {
            form: default_form(),
            goals: GoalAverages::default(),
            corners: CornerAverages::default(),
        }
    }
}

/// League table row for one team. Serializes as `{}` when nothing is known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals_diff: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lose: Option<u32>,
}

/// Statistics and table position for one side of a fixture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSide {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub stats: TeamStatistics,
    #[serde(default)]
    pub standings: Standing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamsStats {
    #[serde(default)]
    pub home: TeamSide,
    #[serde(default)]
    pub away: TeamSide,
}

/// A fixture with odds, head-to-head history, and per-team context merged in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedFixture {
    #[serde(default)]
    pub fixture: FixtureSummary,
    #[serde(default)]
    pub league: League,
    #[serde(default)]
    pub teams: TeamPair,
    #[serde(default)]
    pub odds: Vec<OddsEntry>,
    #[serde(default)]
    pub head_to_head: Vec<HeadToHeadRecord>,
    #[serde(default)]
    pub teams_stats: TeamsStats,
}
