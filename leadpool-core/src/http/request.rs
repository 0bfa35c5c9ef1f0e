//! Pulling identity, time windows and JSON bodies out of requests

use crate::classification::{Role, Team};
use crate::model::{AgentIdentity, TimeWindow};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use hyper::HeaderMap;
use std::collections::HashMap;

pub const AGENT_ID: &str = "x-agent-id";
pub const AGENT_NAME: &str = "x-agent-name";
pub const AGENT_ROLE: &str = "x-agent-role";
pub const AGENT_TEAM: &str = "x-agent-team";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

/// Identity asserted by the upstream gateway
///
/// `x-agent-id` and `x-agent-role` are required; the name falls back to the
/// id and the team is optional.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<AgentIdentity> {
    let mut invalid = Vec::new();

    let id = header(headers, AGENT_ID);
    if id.is_none() {
        invalid.push(AGENT_ID);
    }
    let role = header(headers, AGENT_ROLE).and_then(|r| r.parse::<Role>().ok());
    if role.is_none() {
        invalid.push(AGENT_ROLE);
    }
    let team = match header(headers, AGENT_TEAM) {
        Some(raw) => match raw.parse::<Team>() {
            Ok(team) => Some(team),
            Err(_) => {
                invalid.push(AGENT_TEAM);
                None
            }
        },
        None => None,
    };

    match (id, role) {
        (Some(id), Some(role)) if invalid.is_empty() => {
            let name = header(headers, AGENT_NAME).unwrap_or(id);
            let identity = AgentIdentity::new(id, name, role);
            Ok(match team {
                Some(team) => identity.with_team(team),
                None => identity,
            })
        }
        _ => Err(Error::validation(invalid)),
    }
}

/// Decode `a=1&b=2` into a map; later keys win
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(&key.replace('+', " ")).map(|k| k.into_owned());
        let value = urlencoding::decode(&value.replace('+', " ")).map(|v| v.into_owned());
        if let (Ok(key), Ok(value)) = (key, value) {
            params.insert(key, value);
        }
    }
    params
}

/// Optional `start`/`end` window; both bounds or neither
pub fn window_from_query(query: Option<&str>) -> Result<Option<TimeWindow>> {
    let params = parse_query(query);
    let bound = |name: &'static str| -> std::result::Result<Option<DateTime<Utc>>, &'static str> {
        match params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|at| Some(at.with_timezone(&Utc)))
                .map_err(|_| name),
            None => Ok(None),
        }
    };

    match (bound("start"), bound("end")) {
        (Ok(Some(start)), Ok(Some(end))) => TimeWindow::new(start, end).map(Some),
        (Ok(None), Ok(None)) => Ok(None),
        (Ok(Some(_)), Ok(None)) => Err(Error::validation(["end"])),
        (Ok(None), Ok(Some(_))) => Err(Error::validation(["start"])),
        (start, end) => Err(Error::validation(start.err().into_iter().chain(end.err()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_identity_defaults_name_to_id() {
        let identity =
            identity_from_headers(&headers(&[(AGENT_ID, "tm-7"), (AGENT_ROLE, "telemarketer")]))
                .unwrap();
        assert_eq!(identity.name, "tm-7");
        assert_eq!(identity.role, Role::Telemarketer);
        assert_eq!(identity.team, None);
    }

    #[test]
    fn test_identity_reports_missing_headers() {
        match identity_from_headers(&headers(&[(AGENT_TEAM, "Delta")])) {
            Err(Error::Validation { fields }) => {
                assert_eq!(fields, vec![AGENT_ID, AGENT_ROLE, AGENT_TEAM]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_query_decoding() {
        let params = parse_query(Some("start=2024-06-01T00%3A00%3A00Z&note=a+b&flag"));
        assert_eq!(params["start"], "2024-06-01T00:00:00Z");
        assert_eq!(params["note"], "a b");
        assert_eq!(params["flag"], "");
    }

    #[test]
    fn test_window_requires_both_bounds() {
        assert_eq!(window_from_query(None).unwrap(), None);
        let window =
            window_from_query(Some("start=2024-06-01T00:00:00Z&end=2024-06-02T00:00:00%2B02:00"))
                .unwrap()
                .unwrap();
        assert_eq!(window.end.to_rfc3339(), "2024-06-01T22:00:00+00:00");

        assert!(window_from_query(Some("start=2024-06-01T00:00:00Z")).is_err());
        match window_from_query(Some("start=yesterday&end=today")) {
            Err(Error::Validation { fields }) => assert_eq!(fields, vec!["start", "end"]),
            other => panic!("unexpected {:?}", other),
        }
    }
}
