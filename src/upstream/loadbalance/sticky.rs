use crate::upstream::loadbalance::round_robin::RoundRobin;
use crate::upstream::Target;
use dashmap::DashMap;
use http::HeaderMap;

/// Sticky sessions: pin a session identifier to whichever target first
/// served it, falling back to round-robin on first sight or when the
/// pinned target has gone unhealthy (§4.4).
///
/// The session map has no TTL (§9 design note) — entries live for the
/// process lifetime and are only removed on stale-target eviction.
#[derive(Debug, Default)]
pub struct Sticky {
    sessions: DashMap<String, Target>,
    fallback: RoundRobin,
}

impl Sticky {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            fallback: RoundRobin::new(),
        }
    }

    pub fn select(&self, healthy: &[Target], headers: &HeaderMap) -> Option<Target> {
        if healthy.is_empty() {
            return None;
        }
        let session_id = extract_session_id(headers);

        let Some(session_id) = session_id else {
            return self.fallback.select(healthy);
        };

        if let Some(entry) = self.sessions.get(&session_id) {
            let pinned = entry.value().clone();
            if healthy.iter().any(|t| t.endpoint() == pinned.endpoint()) {
                return Some(pinned);
            }
            drop(entry);
            self.sessions.remove(&session_id);
        }

        let picked = self.fallback.select(healthy)?;
        self.sessions.insert(session_id, picked.clone());
        Some(picked)
    }
}

/// Session id precedence: `JSESSIONID` cookie, then `LB_SESSION` cookie,
/// then `X-Forwarded-For`, then `X-Real-IP` (§4.4).
fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    if let Some(cookies) = headers.get(http::header::COOKIE).and_then(|v| v.to_str().ok()) {
        if let Some(v) = cookie_value(cookies, "JSESSIONID") {
            return Some(v);
        }
        if let Some(v) = cookie_value(cookies, "LB_SESSION") {
            return Some(v);
        }
    }
    if let Some(v) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if !v.trim().is_empty() {
            return Some(v.trim().to_string());
        }
    }
    if let Some(v) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !v.trim().is_empty() {
            return Some(v.trim().to_string());
        }
    }
    None
}

fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let pair = pair.trim();
        let (k, v) = pair.split_once('=')?;
        if k.trim() == name {
            Some(v.trim().to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(endpoint: &str) -> Target {
        Target::new(format!("http://{endpoint}"), String::new(), endpoint.to_string(), 1)
    }

    fn headers_with_cookie(name: &str, value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            http::header::COOKIE,
            format!("{name}={value}").parse().unwrap(),
        );
        h
    }

    #[test]
    fn no_session_id_falls_back_to_round_robin() {
        let sticky = Sticky::new();
        let t = vec![target("a:1"), target("b:1")];
        let empty = HeaderMap::new();
        let first = sticky.select(&t, &empty).unwrap();
        let second = sticky.select(&t, &empty).unwrap();
        assert_ne!(first.endpoint(), second.endpoint());
    }

    #[test]
    fn same_session_id_pins_to_same_target() {
        let sticky = Sticky::new();
        let t = vec![target("a:1"), target("b:1"), target("c:1")];
        let headers = headers_with_cookie("JSESSIONID", "sess-123");
        let first = sticky.select(&t, &headers).unwrap();
        for _ in 0..5 {
            let again = sticky.select(&t, &headers).unwrap();
            assert_eq!(again.endpoint(), first.endpoint());
        }
    }

    #[test]
    fn falls_over_to_new_target_when_pinned_becomes_unhealthy() {
        let sticky = Sticky::new();
        let a = target("a:1");
        let b = target("b:1");
        let headers = headers_with_cookie("LB_SESSION", "sess-abc");
        let first = sticky.select(&[a.clone(), b.clone()], &headers).unwrap();
        assert_eq!(first.endpoint(), "a:1");
        // a goes unhealthy; caller would have already excluded it from the
        // healthy slice passed in.
        let second = sticky.select(&[b.clone()], &headers).unwrap();
        assert_eq!(second.endpoint(), "b:1");
    }

    #[test]
    fn jsessionid_takes_precedence_over_xff() {
        let mut headers = headers_with_cookie("JSESSIONID", "sess-1");
        headers.insert("x-forwarded-for", "10.0.0.5".parse().unwrap());
        assert_eq!(extract_session_id(&headers), Some("sess-1".to_string()));
    }
}
