//! Odds reshaping for the per-market tables
//!
//! The odds include arrives as fixture → market → bookmaker → odds. Each
//! requested market becomes its own wide table: one row per fixture, one
//! column per `<bookmaker>_<label>` price. Bookmakers label the same
//! outcome differently ("Home", "1", "Arsenal | Yes"), so labels are
//! standardised to the 1/X/2 form before they become column names.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// Over/Under market: only Over and Under labels are valid
pub const OVER_UNDER_MARKET: i64 = 12;

/// Both-teams-to-score market: only Yes and No labels are valid
pub const BTTS_MARKET: i64 = 976105;

/// Combined result + both-teams-to-score market
pub const RESULT_BTTS_MARKET: i64 = 976316;

/// Wide odds rows for one market across a set of fixtures
#[derive(Debug, Clone)]
pub struct MarketRows {
    pub market_id: i64,
    pub market_name: String,
    pub rows: Vec<Value>,
}

/// Collect one wide row per fixture for every requested market.
///
/// Fixtures without an odds include are skipped; so is a fixture/market row
/// that ends up with no price columns after the label filters.
pub fn collect_market_rows(fixtures: &Value, markets: &[i64]) -> Vec<MarketRows> {
    let records: &[Value] = match fixtures {
        Value::Array(records) => records,
        Value::Object(_) => std::slice::from_ref(fixtures),
        _ => return Vec::new(),
    };

    let mut tables: Vec<MarketRows> = markets
        .iter()
        .map(|&market_id| MarketRows { market_id, market_name: String::new(), rows: Vec::new() })
        .collect();

    for fixture in records {
        let odds = match fixture.get("odds").and_then(Value::as_array) {
            Some(odds) if !odds.is_empty() => odds,
            _ => {
                info!("no odds included");
                continue;
            }
        };
        debug!(markets = odds.len(), "collecting odds");

        let home = fixture.pointer("/localTeam/name").and_then(Value::as_str).unwrap_or("");
        let away = fixture.pointer("/visitorTeam/name").and_then(Value::as_str).unwrap_or("");
        let home_short = fixture.pointer("/localTeam/short_code").and_then(Value::as_str);
        let away_short = fixture.pointer("/visitorTeam/short_code").and_then(Value::as_str);

        for market in odds {
            let Some(market_id) = market.get("id").and_then(Value::as_i64) else {
                continue;
            };
            let Some(entry) = tables.iter_mut().find(|t| t.market_id == market_id) else {
                continue;
            };
            let market_name =
                market.get("name").and_then(Value::as_str).unwrap_or("unknown").to_string();

            let mut row = Map::new();
            row.insert("id".to_string(), fixture.get("id").cloned().unwrap_or(Value::Null));
            row.insert("market_id".to_string(), json!(market_id));
            row.insert("market".to_string(), json!(market_name.clone()));

            let bookmakers = market.get("bookmaker").and_then(Value::as_array);
            for bookmaker in bookmakers.into_iter().flatten() {
                let Some(bookmaker_name) = bookmaker.get("name").and_then(Value::as_str) else {
                    continue;
                };
                let Some(prices) = bookmaker.get("odds").and_then(Value::as_array) else {
                    continue;
                };

                let prices =
                    standardise_labels(prices.clone(), home, away, home_short, away_short);

                if market_id == BTTS_MARKET {
                    let labels: Vec<&str> =
                        prices.iter().filter_map(|p| p.get("label")?.as_str()).collect();
                    if labels.iter().any(|l| *l != "Yes" && *l != "No") {
                        debug!(?labels, "unexpected labels for both-teams-to-score");
                        continue;
                    }
                }

                for price in &prices {
                    let Some(label) = price.get("label").and_then(Value::as_str) else {
                        continue;
                    };

                    if market_id == OVER_UNDER_MARKET && label != "Over" && label != "Under" {
                        info!(label, "unexpected over/under label");
                        continue;
                    }

                    if market_id == RESULT_BTTS_MARKET {
                        let has_outcome = ["1", "X", "2"].iter().any(|o| label.contains(o));
                        let has_btts = ["Yes", "No"].iter().any(|b| label.contains(b));
                        if !has_outcome || !has_btts {
                            debug!(label, "unexpected label for result + both-teams-to-score");
                            continue;
                        }
                    }

                    let value = price.get("value").cloned().unwrap_or(Value::Null);

                    match total_text(price.get("total")) {
                        Some(total) => {
                            // Quarter-goal lines cannot settle both ways;
                            // only half-goal totals are kept
                            if total.split_once('.').is_some_and(|(_, frac)| frac == "5") {
                                row.insert(format!("{bookmaker_name}_{label}{total}"), value);
                            }
                        }
                        None => {
                            row.insert(format!("{bookmaker_name}_{label}"), value);
                        }
                    }
                }
            }

            // id, market_id and market alone mean no prices survived
            if row.len() > 3 {
                entry.market_name = market_name;
                entry.rows.push(Value::Object(row));
            }
        }
    }

    tables.retain(|t| !t.rows.is_empty());
    tables
}

/// The total line as text, however the bookmaker encoded it
fn total_text(total: Option<&Value>) -> Option<String> {
    match total? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Which side of the fixture a label token refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Home,
    Away,
    Draw,
    Unknown,
}

/// Rewrite bookmaker labels into the standard 1/X/2 form.
///
/// Plain `Home`/`Draw`/`Away` labels are substituted directly. Combined
/// labels such as `Arsenal | Yes` carry a team name that has to be mapped
/// to a side first; see [`resolve_side`] for the tiers.
pub fn standardise_labels(
    mut prices: Vec<Value>,
    home: &str,
    away: &str,
    home_short: Option<&str>,
    away_short: Option<&str>,
) -> Vec<Value> {
    for price in &mut prices {
        let Some(label) = price.get("label").and_then(Value::as_str) else {
            continue;
        };
        let standardised = standardise_label(label, home, away, home_short, away_short);
        if standardised != label {
            debug!(from = label, to = %standardised, "standardised label");
            if let Some(obj) = price.as_object_mut() {
                obj.insert("label".to_string(), json!(standardised));
            }
        }
    }
    prices
}

fn standardise_label(
    label: &str,
    home: &str,
    away: &str,
    home_short: Option<&str>,
    away_short: Option<&str>,
) -> String {
    if let Some((team_part, _)) = label.split_once('|') {
        let team = team_part.trim();
        let replaced = match resolve_side(team, home, away, home_short, away_short) {
            Side::Home => label.replacen(team, "1", 1),
            Side::Away => label.replacen(team, "2", 1),
            Side::Draw => label.to_string(),
            Side::Unknown => {
                warn!(team, home, away, "could not resolve label to a side");
                label.to_string()
            }
        };
        return replaced.replace('|', "/").replace(' ', "");
    }

    if label.contains("Home") {
        return label.replace("Home", "1");
    }
    if label.contains("Draw") {
        return label.replace("Draw", "X");
    }
    if label.contains("Away") {
        return label.replace("Away", "2");
    }

    label.to_string()
}

/// Map a team token from a combined label onto the home or away side.
///
/// Tiers, in order: draw token, containment either way, short-code match
/// for acronyms (QPR, PSG), first-word-plus-initial match for multi-word
/// names ("Man United" → "Manchester United"), then fuzzy similarity
/// against both names. Ties go to the away side.
fn resolve_side(
    team: &str,
    home: &str,
    away: &str,
    home_short: Option<&str>,
    away_short: Option<&str>,
) -> Side {
    if team == "X" {
        return Side::Draw;
    }

    if home.contains(team) || team.contains(home) {
        return Side::Home;
    }
    if away.contains(team) || team.contains(away) {
        return Side::Away;
    }

    if team.len() > 1 && team == team.to_uppercase() {
        if home_short == Some(team) {
            return Side::Home;
        }
        if away_short == Some(team) {
            return Side::Away;
        }
        return Side::Unknown;
    }

    let team_words: Vec<&str> = team.split_whitespace().collect();
    if team_words.len() > 1 {
        if initials_match(&team_words, home) {
            return Side::Home;
        }
        if initials_match(&team_words, away) {
            return Side::Away;
        }
    }

    let matcher = SkimMatcherV2::default();
    let home_score = matcher.fuzzy_match(home, team).unwrap_or(0);
    let away_score = matcher.fuzzy_match(away, team).unwrap_or(0);
    if home_score > away_score {
        Side::Home
    } else {
        Side::Away
    }
}

/// "Man United" matches "Manchester United": first word is a prefix of the
/// first word, second words share an initial
fn initials_match(team_words: &[&str], full_name: &str) -> bool {
    let full_words: Vec<&str> = full_name.split_whitespace().collect();
    if full_words.len() < 2 {
        return false;
    }

    full_words[0].contains(team_words[0])
        && team_words[1].chars().next() == full_words[1].chars().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(label: &str, value: f64) -> Value {
        json!({ "label": label, "value": value, "total": null })
    }

    fn fixture_with_odds(odds: Value) -> Value {
        json!({
            "id": 11867285,
            "localTeam": { "name": "Arsenal", "short_code": "ARS" },
            "visitorTeam": { "name": "Manchester United", "short_code": "MUN" },
            "odds": odds
        })
    }

    #[test]
    fn plain_result_labels_standardise_to_1x2() {
        assert_eq!(standardise_label("Home", "A", "B", None, None), "1");
        assert_eq!(standardise_label("Draw", "A", "B", None, None), "X");
        assert_eq!(standardise_label("Away", "A", "B", None, None), "2");
        assert_eq!(standardise_label("Over", "A", "B", None, None), "Over");
    }

    #[test]
    fn combined_labels_resolve_by_containment() {
        let label = standardise_label("Arsenal | Yes", "Arsenal", "Chelsea", None, None);
        assert_eq!(label, "1/Yes");

        let label = standardise_label("Chelsea | No", "Arsenal", "Chelsea", None, None);
        assert_eq!(label, "2/No");

        let label = standardise_label("X | Yes", "Arsenal", "Chelsea", None, None);
        assert_eq!(label, "X/Yes");
    }

    #[test]
    fn combined_labels_resolve_acronyms_by_short_code() {
        let label =
            standardise_label("QPR | Yes", "Queens Park Rangers", "Fulham", Some("QPR"), None);
        assert_eq!(label, "1/Yes");

        let label =
            standardise_label("PSG | No", "Marseille", "Paris Saint Germain", None, Some("PSG"));
        assert_eq!(label, "2/No");
    }

    #[test]
    fn combined_labels_resolve_shortened_multiword_names() {
        let label =
            standardise_label("Man United | Yes", "Manchester United", "Burnley", None, None);
        assert_eq!(label, "1/Yes");
    }

    #[test]
    fn combined_labels_fall_back_to_fuzzy_matching() {
        // misspelled single-word token: no containment, no short code,
        // no multi-word tier, so similarity against the two names decides
        let label = standardise_label("Mancester | Yes", "Manchester United", "Everton", None, None);
        assert_eq!(label, "1/Yes");

        // nothing matches either name: ties go to the away side
        let label = standardise_label("Zzz | No", "Arsenal", "Burnley", None, None);
        assert_eq!(label, "2/No");
    }

    #[test]
    fn one_row_per_fixture_and_market() {
        let fixtures = fixture_with_odds(json!([{
            "id": 1,
            "name": "3Way Result",
            "bookmaker": [{
                "name": "bet365",
                "odds": [price("Home", 1.85), price("Draw", 3.6), price("Away", 4.2)]
            }]
        }]));

        let tables = collect_market_rows(&fixtures, &[1]);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].market_name, "3Way Result");
        assert_eq!(tables[0].rows.len(), 1);

        let row = tables[0].rows[0].as_object().unwrap();
        assert_eq!(row["id"], json!(11867285));
        assert_eq!(row["market"], json!("3Way Result"));
        assert_eq!(row["bet365_1"], json!(1.85));
        assert_eq!(row["bet365_X"], json!(3.6));
        assert_eq!(row["bet365_2"], json!(4.2));
    }

    #[test]
    fn half_goal_totals_join_the_column_name() {
        let fixtures = fixture_with_odds(json!([{
            "id": OVER_UNDER_MARKET,
            "name": "Over/Under",
            "bookmaker": [{
                "name": "bet365",
                "odds": [
                    { "label": "Over", "value": 1.9, "total": "2.5" },
                    { "label": "Under", "value": 1.9, "total": "2.5" },
                    { "label": "Over", "value": 2.4, "total": "2.25" }
                ]
            }]
        }]));

        let tables = collect_market_rows(&fixtures, &[OVER_UNDER_MARKET]);
        let row = tables[0].rows[0].as_object().unwrap();

        assert_eq!(row["bet365_Over2.5"], json!(1.9));
        assert_eq!(row["bet365_Under2.5"], json!(1.9));
        // the quarter-goal line is dropped
        assert!(!row.contains_key("bet365_Over2.25"));
    }

    #[test]
    fn over_under_rejects_foreign_labels() {
        let fixtures = fixture_with_odds(json!([{
            "id": OVER_UNDER_MARKET,
            "name": "Over/Under",
            "bookmaker": [{
                "name": "bet365",
                "odds": [price("Exactly", 7.0)]
            }]
        }]));

        // the only price was filtered out, so the whole row is dropped
        assert!(collect_market_rows(&fixtures, &[OVER_UNDER_MARKET]).is_empty());
    }

    #[test]
    fn btts_rejects_bookmakers_with_foreign_labels() {
        let fixtures = fixture_with_odds(json!([{
            "id": BTTS_MARKET,
            "name": "Both Teams To Score",
            "bookmaker": [
                { "name": "bad", "odds": [price("Yes", 1.6), price("Maybe", 2.1)] },
                { "name": "good", "odds": [price("Yes", 1.7), price("No", 2.0)] }
            ]
        }]));

        let tables = collect_market_rows(&fixtures, &[BTTS_MARKET]);
        let row = tables[0].rows[0].as_object().unwrap();

        assert!(!row.contains_key("bad_Yes"));
        assert_eq!(row["good_Yes"], json!(1.7));
        assert_eq!(row["good_No"], json!(2.0));
    }

    #[test]
    fn result_btts_needs_both_parts_in_the_label() {
        let fixtures = fixture_with_odds(json!([{
            "id": RESULT_BTTS_MARKET,
            "name": "Result / Both Teams To Score",
            "bookmaker": [{
                "name": "bet365",
                "odds": [
                    price("Arsenal | Yes", 3.1),
                    price("Yes", 1.9)
                ]
            }]
        }]));

        let tables = collect_market_rows(&fixtures, &[RESULT_BTTS_MARKET]);
        let row = tables[0].rows[0].as_object().unwrap();

        assert_eq!(row["bet365_1/Yes"], json!(3.1));
        // "Yes" alone has no 1/X/2 part
        assert!(!row.contains_key("bet365_Yes"));
    }

    #[test]
    fn unrequested_markets_are_ignored() {
        let fixtures = fixture_with_odds(json!([{
            "id": 999,
            "name": "Corners",
            "bookmaker": [{ "name": "bet365", "odds": [price("Over", 1.8)] }]
        }]));

        assert!(collect_market_rows(&fixtures, &[1]).is_empty());
    }

    #[test]
    fn fixtures_without_odds_are_skipped() {
        let fixtures = json!([{ "id": 1, "odds": [] }, { "id": 2 }]);
        assert!(collect_market_rows(&fixtures, &[1]).is_empty());
    }
}
