//! Response envelope handling
//!
//! The API wraps every payload in `{"data": ..., "meta": {...}}` and nests
//! every include under its own `{"data": ...}` envelope. The payload shapes
//! themselves belong to the API; only the envelope is typed here.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// Top-level metadata returned alongside `data`
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub pagination: Option<Pagination>,
    pub plan: Option<Plan>,
}

/// Pagination block under `meta`
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub total: Option<u64>,
    pub count: Option<u64>,
    pub per_page: Option<u64>,
    pub current_page: u64,
    pub total_pages: u64,
}

/// Subscription plan block under `meta`, as the API sends it
#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub name: String,
    pub price: String,
    pub request_limit: String,
}

/// Subscription plan details in a readable form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanInfo {
    pub name: String,
    pub price: String,
    pub request_limit: String,
}

impl From<Plan> for PlanInfo {
    fn from(plan: Plan) -> Self {
        // The API encodes the limit as "requests,minutes", e.g. "1500,60"
        let request_limit = match plan.request_limit.split_once(',') {
            Some((requests, minutes)) => {
                format!("{requests} requests per {minutes} minutes.")
            }
            None => plan.request_limit.clone(),
        };

        PlanInfo { name: plan.name, price: format!("\u{20ac}{}", plan.price), request_limit }
    }
}

/// Map an `"error"` body to the typed error for its status code
pub fn check_api_error(status: u16, body: &Value) -> Result<(), Error> {
    let Some(error) = body.get("error") else {
        return Ok(());
    };

    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    Err(match status {
        400 => Error::BadRequest(message),
        401 => Error::Unauthorized(message),
        403 => Error::Forbidden(message),
        404 => Error::NotFound(message),
        429 => Error::TooManyRequests(message),
        s @ (500 | 502 | 503 | 504) => Error::Server { status: s, message },
        s => Error::Api { status: s, message },
    })
}

/// Collapse the `{"x": {"data": V}}` envelopes the API wraps includes in.
///
/// ```text
/// {"season": {"data": {"id": 16216, "name": "2019/2020"}}}
/// ```
///
/// becomes
///
/// ```text
/// {"season": {"id": 16216, "name": "2019/2020"}}
/// ```
///
/// applied recursively through objects and arrays.
pub fn unnest_includes(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut unnested = serde_json::Map::with_capacity(map.len());
            for (key, entry) in map {
                let entry = match entry {
                    Value::Object(inner) if inner.len() == 1 && inner.contains_key("data") => {
                        let data = inner.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null);
                        unnest_includes(data)
                    }
                    other => unnest_includes(other),
                };
                unnested.insert(key, entry);
            }
            Value::Object(unnested)
        }
        Value::Array(entries) => {
            Value::Array(entries.into_iter().map(unnest_includes).collect())
        }
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unnest_collapses_data_envelopes() {
        let nested = json!({
            "id": 1,
            "season": {
                "data": {
                    "id": 16216,
                    "name": "2019/2020",
                    "league": { "data": { "id": 27 } }
                }
            }
        });

        let unnested = unnest_includes(nested);

        assert_eq!(
            unnested,
            json!({
                "id": 1,
                "season": {
                    "id": 16216,
                    "name": "2019/2020",
                    "league": { "id": 27 }
                }
            })
        );
    }

    #[test]
    fn unnest_handles_list_envelopes() {
        let nested = json!({ "hi": { "data": [1, 2] } });
        assert_eq!(unnest_includes(nested), json!({ "hi": [1, 2] }));
    }

    #[test]
    fn unnest_recurses_into_arrays_of_records() {
        let nested = json!([
            { "odds": { "data": [ { "bookmaker": { "data": [] } } ] } }
        ]);
        assert_eq!(unnest_includes(nested), json!([{ "odds": [{ "bookmaker": [] }] }]));
    }

    #[test]
    fn unnest_leaves_plain_objects_alone() {
        let plain = json!({ "data": 1, "name": "x" });
        // A two-key object is not an envelope even though it has a "data" key
        assert_eq!(unnest_includes(plain.clone()), plain);
    }

    #[test]
    fn error_bodies_map_by_status_code() {
        let body = json!({ "error": { "message": "nope" } });

        assert!(matches!(check_api_error(400, &body), Err(Error::BadRequest(_))));
        assert!(matches!(check_api_error(401, &body), Err(Error::Unauthorized(_))));
        assert!(matches!(check_api_error(403, &body), Err(Error::Forbidden(_))));
        assert!(matches!(check_api_error(404, &body), Err(Error::NotFound(_))));
        assert!(matches!(check_api_error(429, &body), Err(Error::TooManyRequests(_))));
        for status in [500, 502, 503, 504] {
            assert!(matches!(check_api_error(status, &body), Err(Error::Server { .. })));
        }
        assert!(matches!(check_api_error(418, &body), Err(Error::Api { status: 418, .. })));
    }

    #[test]
    fn bodies_without_error_pass_through() {
        let body = json!({ "data": [] });
        assert!(check_api_error(200, &body).is_ok());
    }

    #[test]
    fn plan_info_formats_the_request_limit() {
        let plan = Plan {
            name: "Free Plan".to_string(),
            price: "0.00".to_string(),
            request_limit: "180,60".to_string(),
        };

        let info = PlanInfo::from(plan);
        assert_eq!(info.name, "Free Plan");
        assert_eq!(info.price, "\u{20ac}0.00");
        assert_eq!(info.request_limit, "180 requests per 60 minutes.");
    }
}
