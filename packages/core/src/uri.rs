//! URI construction for PI Web API data requests.
//!
//! [`query_uri`] maps one [`Query`] to the path and query string of the
//! stream endpoint that serves it. The WebID is appended separately by
//! [`resource_url`] once the target path has been resolved.
//!
//! | Mode | Path | Extra parameters |
//! |------|------|------------------|
//! | expression | `/calculation/intervals` | `sampleInterval`, `expression` |
//! | expression + summary | `/calculation/summary` | `sampleType`+`sampleInterval` if interpolated, `expression` |
//! | summary | `/streamsets/summary` | `intervals`, `summaryType`*, `summaryBasis`, `summaryDuration` |
//! | interpolated | `/streamsets/interpolated` | `interval` |
//! | recorded | `/streamsets/recorded` | `maxCount` |
//! | plot (default) | `/streamsets/plot` | `intervals` |
//!
//! Every row carries the `startTime`/`endTime` pair first.

use crate::query::{PiQuery, Query};

/// Build the request path and query string for `query`.
pub fn query_uri(query: &Query) -> String {
    let pi = &query.pi;
    let time_range = query.time_range.uri_component();
    let mut uri = String::new();

    if pi.is_expression() {
        uri.push_str("/calculation");
        if pi.is_summary() {
            uri.push_str("/summary");
            uri.push_str(&time_range);
            if pi.is_interpolated() {
                uri.push_str(&format!(
                    "&sampleType=Interval&sampleInterval={}ms",
                    query.interval_time_ms()
                ));
            }
        } else {
            uri.push_str("/intervals");
            uri.push_str(&time_range);
            uri.push_str(&format!("&sampleInterval={}ms", query.interval_time_ms()));
        }
        uri.push_str("&expression=");
        uri.push_str(&urlencoding::encode(&pi.expression));
        return uri;
    }

    uri.push_str("/streamsets");
    if pi.is_summary() {
        uri.push_str("/summary");
        uri.push_str(&time_range);
        uri.push_str(&format!("&intervals={}", query.point_count()));
        uri.push_str(&summary_component(pi));
    } else if pi.is_interpolated() {
        uri.push_str("/interpolated");
        uri.push_str(&time_range);
        uri.push_str(&format!("&interval={}", query.interval_time_ms()));
    } else if pi.is_recorded_values() {
        uri.push_str("/recorded");
        uri.push_str(&time_range);
        uri.push_str(&format!("&maxCount={}", query.point_count()));
    } else {
        uri.push_str("/plot");
        uri.push_str(&time_range);
        uri.push_str(&format!("&intervals={}", query.point_count()));
    }
    uri
}

/// `summaryType`/`summaryBasis`/`summaryDuration` parameters.
///
/// Empty for expressions: calculation summaries only get the time range and
/// sampling parameters.
pub fn summary_component(pi: &PiQuery) -> String {
    if pi.is_expression() {
        return String::new();
    }
    let mut uri = String::new();
    for t in &pi.summary.types {
        uri.push_str("&summaryType=");
        uri.push_str(&t.value.value);
    }
    uri.push_str("&summaryBasis=");
    uri.push_str(&pi.summary.basis);
    uri.push_str("&summaryDuration=");
    uri.push_str(pi.summary_duration());
    uri
}

/// Fully qualified sub-request URL: `<base_url><query_uri>&webid=<web_id>`.
pub fn resource_url(base_url: &str, query: &Query, web_id: &str) -> String {
    format!(
        "{}{}&webid={}",
        base_url.trim_end_matches('/'),
        query_uri(query),
        web_id
    )
}
