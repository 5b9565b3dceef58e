// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava rate-limit tracking from response headers.
//!
//! Every API response carries `X-RateLimit-Limit` and `X-RateLimit-Usage`,
//! each a `short,long` pair (15-minute and daily windows).

use reqwest::header::HeaderMap;
use std::sync::Mutex;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const USAGE_HEADER: &str = "x-ratelimit-usage";

#[derive(Debug, Clone, Copy, PartialEq)]
struct Window {
    short: u32,
    long: u32,
}

impl Window {
    fn parse(value: &str) -> Option<Self> {
        let (short, long) = value.split_once(',')?;
        Some(Self {
            short: short.trim().parse().ok()?,
            long: long.trim().parse().ok()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Snapshot {
    limit: Window,
    usage: Window,
}

/// Last rate-limit state reported by Strava.
#[derive(Debug, Default)]
pub struct RateLimiting {
    last: Mutex<Option<Snapshot>>,
}

impl RateLimiting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the limits reported by a response. Responses without both
    /// headers leave the previous state untouched.
    pub fn update_from_headers(&self, headers: &HeaderMap) {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(Window::parse)
        };
        if let (Some(limit), Some(usage)) = (read(LIMIT_HEADER), read(USAGE_HEADER)) {
            tracing::debug!(
                short_usage = usage.short,
                short_limit = limit.short,
                long_usage = usage.long,
                long_limit = limit.long,
                "Strava rate limit status"
            );
            *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some(Snapshot { limit, usage });
        }
    }

    /// Fraction of the most constrained window already used, in `[0, 1]`.
    ///
    /// NaN until a response with rate-limit headers has been seen.
    pub fn fraction_reached(&self) -> f64 {
        let last = *self.last.lock().unwrap_or_else(|e| e.into_inner());
        match last {
            Some(Snapshot { limit, usage }) => {
                let short = f64::from(usage.short) / f64::from(limit.short);
                let long = f64::from(usage.long) / f64::from(limit.long);
                short.max(long)
            }
            None => f64::NAN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(limit: &'static str, usage: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LIMIT_HEADER, HeaderValue::from_static(limit));
        headers.insert(USAGE_HEADER, HeaderValue::from_static(usage));
        headers
    }

    #[test]
    fn test_no_data_is_nan() {
        assert!(RateLimiting::new().fraction_reached().is_nan());
    }

    #[test]
    fn test_most_constrained_window_wins() {
        let rl = RateLimiting::new();
        rl.update_from_headers(&headers("100,1000", "20,900"));
        assert!((rl.fraction_reached() - 0.9).abs() < 1e-9);

        rl.update_from_headers(&headers("100,1000", "85,100"));
        assert!((rl.fraction_reached() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_headers_ignored() {
        let rl = RateLimiting::new();
        rl.update_from_headers(&headers("100,1000", "10,100"));
        rl.update_from_headers(&headers("lots", "some"));
        assert!((rl.fraction_reached() - 0.1).abs() < 1e-9);
    }
}
