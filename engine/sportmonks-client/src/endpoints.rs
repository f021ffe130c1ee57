//! Endpoint methods for the Soccer API
//!
//! One method per endpoint. All of them return the unwrapped `data` payload
//! as JSON; the shapes belong to the API. Includes are passed as plain
//! strings, e.g. `&["localTeam", "visitorTeam", "odds"]`; see the
//! SportMonks documentation for what each endpoint supports.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::info;

use crate::client::{join_ids, SportMonks};
use crate::error::{Error, Result};

/// Filters shared by the fixture and livescore endpoints.
///
/// Empty lists mean "no filter": the API returns every league in the plan,
/// every market, every bookmaker.
#[derive(Debug, Clone, Default)]
pub struct FixtureFilters {
    /// Restrict to these league ids
    pub leagues: Vec<i64>,
    /// Restrict odds to these market ids
    pub markets: Vec<i64>,
    /// Restrict odds to these bookmaker ids
    pub bookmakers: Vec<i64>,
}

impl FixtureFilters {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.leagues.is_empty() {
            params.push(("leagues", join_ids(&self.leagues)));
        }
        if !self.markets.is_empty() {
            params.push(("markets", join_ids(&self.markets)));
        }
        if !self.bookmakers.is_empty() {
            params.push(("bookmakers", join_ids(&self.bookmakers)));
        }
        params
    }
}

impl SportMonks {
    /// All continents. Possible includes: countries.
    pub async fn continents(&self, includes: &[&str]) -> Result<Value> {
        info!(?includes, "get all continents");
        self.fetch(&["continents"], includes, &[]).await
    }

    /// A continent by id. Possible includes: countries.
    pub async fn continent(&self, continent_id: i64, includes: &[&str]) -> Result<Value> {
        info!(continent_id, ?includes, "get continent by id");
        self.fetch(&["continents", &continent_id.to_string()], includes, &[]).await
    }

    /// All countries. Possible includes: leagues, continent.
    pub async fn countries(&self, includes: &[&str]) -> Result<Value> {
        info!(?includes, "get all countries");
        self.fetch(&["countries"], includes, &[]).await
    }

    /// A country by id. Possible includes: leagues, continent.
    pub async fn country(&self, country_id: i64, includes: &[&str]) -> Result<Value> {
        info!(country_id, ?includes, "get country by id");
        self.fetch(&["countries", &country_id.to_string()], includes, &[]).await
    }

    /// All leagues available to the plan. Possible includes: country,
    /// season, seasons.
    pub async fn leagues(&self, includes: &[&str]) -> Result<Value> {
        info!(?includes, "get all leagues");
        self.fetch(&["leagues"], includes, &[]).await
    }

    /// A league by id. Possible includes: country, season, seasons.
    pub async fn league(&self, league_id: i64, includes: &[&str]) -> Result<Value> {
        info!(league_id, ?includes, "get league by id");
        self.fetch(&["leagues", &league_id.to_string()], includes, &[]).await
    }

    /// Search leagues by name.
    pub async fn search_leagues(&self, name: &str, includes: &[&str]) -> Result<Value> {
        info!(name, "search leagues");
        self.fetch(&["leagues", "search", name], includes, &[]).await
    }

    /// All seasons in the plan. Possible includes: league, stages, rounds,
    /// upcoming, results, groups, goalscorers, cardscorers, assistscorers,
    /// aggregated variants, fixtures.
    pub async fn seasons(&self, includes: &[&str]) -> Result<Value> {
        info!(?includes, "get all seasons");
        self.fetch(&["seasons"], includes, &[]).await
    }

    /// A season by id. Adds stage and round to the possible includes.
    pub async fn season(&self, season_id: i64, includes: &[&str]) -> Result<Value> {
        info!(season_id, ?includes, "get season by id");
        self.fetch(&["seasons", &season_id.to_string()], includes, &[]).await
    }

    /// All bookmakers. No includes available.
    pub async fn bookmakers(&self) -> Result<Value> {
        info!("get all bookmakers");
        self.fetch(&["bookmakers"], &[], &[]).await
    }

    /// A bookmaker by id. No includes available.
    pub async fn bookmaker(&self, bookmaker_id: i64) -> Result<Value> {
        info!(bookmaker_id, "get bookmaker by id");
        self.fetch(&["bookmakers", &bookmaker_id.to_string()], &[], &[]).await
    }

    /// All betting markets. No includes available.
    pub async fn markets(&self) -> Result<Value> {
        info!("get all markets");
        self.fetch(&["markets"], &[], &[]).await
    }

    /// A betting market by id. No includes available.
    pub async fn market(&self, market_id: i64) -> Result<Value> {
        info!(market_id, "get market by id");
        self.fetch(&["markets", &market_id.to_string()], &[], &[]).await
    }

    /// A team by id. Possible includes: country, squad, coach, transfers,
    /// sidelined, stats, venue, rankings, fixtures, scorers, league,
    /// activeSeasons, trophies.
    pub async fn team(&self, team_id: i64, includes: &[&str]) -> Result<Value> {
        info!(team_id, ?includes, "get team by id");
        self.fetch(&["teams", &team_id.to_string()], includes, &[]).await
    }

    /// All teams playing in a season.
    pub async fn teams_by_season(&self, season_id: i64, includes: &[&str]) -> Result<Value> {
        info!(season_id, ?includes, "get teams by season");
        self.fetch(&["teams", "season", &season_id.to_string()], includes, &[]).await
    }

    /// All leagues a team currently plays in. No includes available.
    pub async fn team_current_leagues(&self, team_id: i64) -> Result<Value> {
        info!(team_id, "get current leagues for team");
        self.fetch(&["teams", &team_id.to_string(), "current"], &[], &[]).await
    }

    /// All leagues a team has ever played in. No includes available.
    pub async fn team_historic_leagues(&self, team_id: i64) -> Result<Value> {
        info!(team_id, "get historic leagues for team");
        self.fetch(&["teams", &team_id.to_string(), "history"], &[], &[]).await
    }

    /// A team's squad for a season, including per-player performance.
    /// Possible includes: player.
    pub async fn squad(&self, season_id: i64, team_id: i64, includes: &[&str]) -> Result<Value> {
        info!(season_id, team_id, "get squad");
        self.fetch(
            &["squad", "season", &season_id.to_string(), "team", &team_id.to_string()],
            includes,
            &[],
        )
        .await
    }

    /// Textual commentary for a fixture. No includes available.
    pub async fn commentaries(&self, fixture_id: i64) -> Result<Value> {
        info!(fixture_id, "get commentaries for fixture");
        self.fetch(&["commentaries", "fixture", &fixture_id.to_string()], &[], &[]).await
    }

    /// A venue by id. No includes available.
    pub async fn venue(&self, venue_id: i64) -> Result<Value> {
        info!(venue_id, "get venue by id");
        self.fetch(&["venues", &venue_id.to_string()], &[], &[]).await
    }

    /// All venues used in a season. No includes available.
    pub async fn venues_by_season(&self, season_id: i64) -> Result<Value> {
        info!(season_id, "get venues by season");
        self.fetch(&["venues", "season", &season_id.to_string()], &[], &[]).await
    }

    /// A coach by id. No includes available.
    pub async fn coach(&self, coach_id: i64) -> Result<Value> {
        info!(coach_id, "get coach by id");
        self.fetch(&["coaches", &coach_id.to_string()], &[], &[]).await
    }

    /// A round by id. Possible includes: fixtures, results, season, league.
    pub async fn round(&self, round_id: i64, includes: &[&str]) -> Result<Value> {
        info!(round_id, ?includes, "get round by id");
        self.fetch(&["round", &round_id.to_string()], includes, &[]).await
    }

    /// All rounds of a season. Possible includes: fixtures, results,
    /// season, league.
    pub async fn rounds_by_season(&self, season_id: i64, includes: &[&str]) -> Result<Value> {
        info!(season_id, ?includes, "get rounds by season");
        self.fetch(&["rounds", "season", &season_id.to_string()], includes, &[]).await
    }

    /// A stage by id. Possible includes: fixtures, results, season, league.
    pub async fn stage(&self, stage_id: i64, includes: &[&str]) -> Result<Value> {
        info!(stage_id, ?includes, "get stage by id");
        self.fetch(&["stages", &stage_id.to_string()], includes, &[]).await
    }

    /// All stages of a season. Possible includes: fixtures, results,
    /// season, league.
    pub async fn stages_by_season(&self, season_id: i64, includes: &[&str]) -> Result<Value> {
        info!(season_id, ?includes, "get stages by season");
        self.fetch(&["stages", "season", &season_id.to_string()], includes, &[]).await
    }

    /// A player by id. Possible includes: position, team, stats, trophies,
    /// sidelined, transfers, lineups, country.
    pub async fn player(&self, player_id: i64, includes: &[&str]) -> Result<Value> {
        info!(player_id, ?includes, "get player by id");
        self.fetch(&["players", &player_id.to_string()], includes, &[]).await
    }

    /// Search players by name.
    pub async fn search_players(&self, name: &str, includes: &[&str]) -> Result<Value> {
        info!(name, "search players");
        self.fetch(&["players", "search", name], includes, &[]).await
    }

    /// A fixture by id. Market and bookmaker filters restrict the odds
    /// include. Possible includes: localTeam, visitorTeam, substitutions,
    /// goals, cards, events, corners, lineup, bench, sidelined, comments,
    /// tvstations, highlights, round, stage, referee, venue, odds,
    /// inplayOdds, flatOdds, coaches, group, trends, officials, stats,
    /// shootout, league, probability, valuebet.
    pub async fn fixture(
        &self,
        fixture_id: i64,
        filters: &FixtureFilters,
        includes: &[&str],
    ) -> Result<Value> {
        info!(fixture_id, ?includes, "get fixture by id");
        self.fetch(&["fixtures", &fixture_id.to_string()], includes, &filters.to_params()).await
    }

    /// Several fixtures by id. Same includes as [`SportMonks::fixture`].
    pub async fn fixtures(
        &self,
        fixture_ids: &[i64],
        filters: &FixtureFilters,
        includes: &[&str],
    ) -> Result<Value> {
        info!(?fixture_ids, ?includes, "get fixtures by ids");
        self.fetch(&["fixtures", "multi", &join_ids(fixture_ids)], includes, &filters.to_params())
            .await
    }

    /// All fixtures on a date. Same includes as [`SportMonks::fixture`].
    pub async fn fixtures_by_date(
        &self,
        date: NaiveDate,
        filters: &FixtureFilters,
        includes: &[&str],
    ) -> Result<Value> {
        info!(%date, ?includes, "get fixtures by date");
        self.fetch(&["fixtures", "date", &date.to_string()], includes, &filters.to_params()).await
    }

    /// All fixtures between two dates. Same includes as
    /// [`SportMonks::fixture`].
    pub async fn fixtures_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filters: &FixtureFilters,
        includes: &[&str],
    ) -> Result<Value> {
        info!(%start, %end, ?includes, "get fixtures between dates");
        self.fetch(
            &["fixtures", "between", &start.to_string(), &end.to_string()],
            includes,
            &filters.to_params(),
        )
        .await
    }

    /// One team's fixtures between two dates.
    pub async fn fixtures_between_for_team(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        team_id: i64,
        filters: &FixtureFilters,
        includes: &[&str],
    ) -> Result<Value> {
        info!(%start, %end, team_id, ?includes, "get fixtures between dates for team");
        self.fetch(
            &["fixtures", "between", &start.to_string(), &end.to_string(), &team_id.to_string()],
            includes,
            &filters.to_params(),
        )
        .await
    }

    /// Games currently being played.
    pub async fn livescores_now(
        &self,
        filters: &FixtureFilters,
        includes: &[&str],
    ) -> Result<Value> {
        info!(?includes, "get in-play fixtures");
        self.fetch(&["livescores", "now"], includes, &filters.to_params()).await
    }

    /// The full schedule for the current day.
    pub async fn livescores(&self, filters: &FixtureFilters, includes: &[&str]) -> Result<Value> {
        info!(?includes, "get today's schedule");
        self.fetch(&["livescores"], includes, &filters.to_params()).await
    }

    /// All previous games between two teams.
    pub async fn head2head(
        &self,
        team1_id: i64,
        team2_id: i64,
        includes: &[&str],
    ) -> Result<Value> {
        info!(team1_id, team2_id, "get head to head");
        self.fetch(
            &["head2head", &team1_id.to_string(), &team2_id.to_string()],
            includes,
            &[],
        )
        .await
    }

    /// League standings for a season, optionally restricted to groups or
    /// stages. Possible includes: standings.team, standings.league,
    /// standings.season, standings.round, standings.stages.
    pub async fn standings(
        &self,
        season_id: i64,
        group_ids: &[i64],
        stage_ids: &[i64],
        includes: &[&str],
    ) -> Result<Value> {
        info!(season_id, ?includes, "get standings for season");

        let mut params = Vec::new();
        if !group_ids.is_empty() {
            params.push(("group_ids", join_ids(group_ids)));
        }
        if !stage_ids.is_empty() {
            params.push(("stage_ids", join_ids(stage_ids)));
        }

        self.fetch(&["standings", "season", &season_id.to_string()], includes, &params).await
    }

    /// Standings as they stood at a given date, calculated from the games
    /// played up to it. No includes available.
    pub async fn standings_by_date(&self, season_id: i64, date: NaiveDate) -> Result<Value> {
        info!(season_id, %date, "get standings at date");
        self.fetch(
            &["standings", "season", &season_id.to_string(), "date", &date.to_string()],
            &[],
            &[],
        )
        .await
    }

    /// Top 25 scorers of a season by stage, in goals, cards and assists.
    /// Possible includes: goalscorers.player, goalscorers.team, and the
    /// cardscorers/assistscorers variants.
    pub async fn topscorers(
        &self,
        season_id: i64,
        stage_ids: &[i64],
        includes: &[&str],
    ) -> Result<Value> {
        info!(season_id, ?includes, "get topscorers for season");

        let mut params = Vec::new();
        if !stage_ids.is_empty() {
            params.push(("stage_ids", join_ids(stage_ids)));
        }

        self.fetch(&["topscorers", "season", &season_id.to_string()], includes, &params).await
    }

    /// Topscorers aggregated over all stages of a season, preliminary
    /// stages included.
    pub async fn aggregated_topscorers(
        &self,
        season_id: i64,
        includes: &[&str],
    ) -> Result<Value> {
        info!(season_id, ?includes, "get aggregated topscorers for season");
        self.fetch(
            &["topscorers", "season", &season_id.to_string(), "aggregated"],
            includes,
            &[],
        )
        .await
    }

    /// All pre-match odds for a fixture. No includes available.
    pub async fn odds(&self, fixture_id: i64) -> Result<Value> {
        info!(fixture_id, "get odds for fixture");
        self.fetch(&["odds", "fixture", &fixture_id.to_string()], &[], &[]).await
    }

    /// Pre-match odds for a fixture from one bookmaker.
    pub async fn odds_by_bookmaker(&self, fixture_id: i64, bookmaker_id: i64) -> Result<Value> {
        info!(fixture_id, bookmaker_id, "get odds for fixture by bookmaker");
        self.fetch(
            &["odds", "fixture", &fixture_id.to_string(), "bookmaker", &bookmaker_id.to_string()],
            &[],
            &[],
        )
        .await
    }

    /// Pre-match odds for a fixture in one market.
    pub async fn odds_by_market(&self, fixture_id: i64, market_id: i64) -> Result<Value> {
        info!(fixture_id, market_id, "get odds for fixture by market");
        self.fetch(
            &["odds", "fixture", &fixture_id.to_string(), "market", &market_id.to_string()],
            &[],
            &[],
        )
        .await
    }

    /// Pre-match odds for a fixture restricted to one market and one
    /// bookmaker. The odds endpoint cannot filter on both at once, so this
    /// goes through the fixtures endpoint with an odds include and pulls
    /// the odds back out.
    pub async fn odds_filtered(
        &self,
        fixture_id: i64,
        market_id: i64,
        bookmaker_id: i64,
    ) -> Result<Value> {
        info!(fixture_id, market_id, bookmaker_id, "get filtered odds for fixture");

        let filters = FixtureFilters {
            leagues: Vec::new(),
            markets: vec![market_id],
            bookmakers: vec![bookmaker_id],
        };

        let mut fixture = self.fixture(fixture_id, &filters, &["odds"]).await?;
        fixture
            .get_mut("odds")
            .map(Value::take)
            .ok_or_else(|| Error::UnexpectedResponse("fixture carried no odds include".into()))
    }

    /// In-play odds for a fixture. Requires an advanced plan. No includes
    /// available.
    pub async fn live_odds(&self, fixture_id: i64) -> Result<Value> {
        info!(fixture_id, "get in-play odds for fixture");
        self.fetch(&["odds", "inplay", "fixture", &fixture_id.to_string()], &[], &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filters_produce_no_params() {
        assert!(FixtureFilters::default().to_params().is_empty());
    }

    #[test]
    fn filters_join_their_id_lists() {
        let filters = FixtureFilters {
            leagues: vec![8, 9],
            markets: vec![1, 12, 976105],
            bookmakers: vec![2],
        };

        let params = filters.to_params();
        assert_eq!(
            params,
            vec![
                ("leagues", "8,9".to_string()),
                ("markets", "1,12,976105".to_string()),
                ("bookmakers", "2".to_string()),
            ]
        );
    }

    #[test]
    fn partial_filters_skip_empty_lists() {
        let filters = FixtureFilters { markets: vec![12], ..Default::default() };
        assert_eq!(filters.to_params(), vec![("markets", "12".to_string())]);
    }
}
