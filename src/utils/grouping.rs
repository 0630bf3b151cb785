use crate::models::EnrichedFixture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixtures whose league country is this value are international competitions
pub const INTERNATIONAL_COUNTRY: &str = "World";
pub const UNKNOWN_COUNTRY: &str = "Unknown";
pub const UNKNOWN_LEAGUE: &str = "Unknown League";
pub const UNKNOWN_COMPETITION: &str = "Unknown Competition";

/// A named list of fixtures (one league or one competition)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureGroup {
    pub name: String,
    pub fixtures: Vec<EnrichedFixture>,
}

/// Domestic leagues of one country
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryGroup {
    pub name: String,
    pub leagues: BTreeMap<String, FixtureGroup>,
}

pub type DomesticFixtures = BTreeMap<String, CountryGroup>;
pub type InternationalFixtures = BTreeMap<String, FixtureGroup>;

/// Enriched fixtures split into domestic (country -> league) and
/// international (competition) collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedFixtures {
    pub domestic: DomesticFixtures,
    pub international: InternationalFixtures,
}

fn label(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

pub fn is_international(fixture: &EnrichedFixture) -> bool {
    fixture.league.country.as_deref().map(str::trim) == Some(INTERNATIONAL_COUNTRY)
}

impl GroupedFixtures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixtures<I>(fixtures: I) -> Self
    where
        I: IntoIterator<Item = EnrichedFixture>,
    {
        fixtures.into_iter().fold(Self::new(), |mut groups, fixture| {
            groups.push(fixture);
            groups
        })
    }

    /// Route one fixture into exactly one of the two collections
    pub fn push(&mut self, fixture: EnrichedFixture) {
        if is_international(&fixture) {
            let competition = label(fixture.league.name.as_deref(), UNKNOWN_COMPETITION);
            self.international
                .entry(competition.clone())
                .or_insert_with(|| FixtureGroup {
                    name: competition,
                    fixtures: Vec::new(),
                })
                .fixtures
                .push(fixture);
        } else {
            let country = label(fixture.league.country.as_deref(), UNKNOWN_COUNTRY);
            let league = label(fixture.league.name.as_deref(), UNKNOWN_LEAGUE);
            self.domestic
                .entry(country.clone())
                .or_insert_with(|| CountryGroup {
                    name: country,
                    leagues: BTreeMap::new(),
                })
                .leagues
                .entry(league.clone())
                .or_insert_with(|| FixtureGroup {
                    name: league,
                    fixtures: Vec::new(),
                })
                .fixtures
                .push(fixture);
        }
    }

    pub fn domestic_count(&self) -> usize {
        self.domestic
            .values()
            .flat_map(|country| country.leagues.values())
            .map(|league| league.fixtures.len())
            .sum()
    }

    pub fn international_count(&self) -> usize {
        self.international.values().map(|g| g.fixtures.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.domestic_count() + self.international_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten both collections back into a single list
    pub fn into_fixtures(self) -> Vec<EnrichedFixture> {
        let domestic = self
            .domestic
            .into_values()
            .flat_map(|country| country.leagues.into_values())
            .flat_map(|league| league.fixtures);
        let international = self
            .international
            .into_values()
            .flat_map(|group| group.fixtures);
        domestic.chain(international).collect()
    }
}
