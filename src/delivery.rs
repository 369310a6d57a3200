//! Destination-side abstraction for report delivery.
//!
//! A destination is either a plain channel or a forum, resolved once per job
//! into a [`DeliveryTarget`] so execution never branches on channel kind
//! again. Publishing goes through the [`ReportPublisher`] trait; message
//! previews come from a [`PreviewSource`]. Both are implemented by the
//! Discord client and by in-memory stubs in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::report::{ReportEmbed, format_interval};

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryTarget {
    Channel { channel_id: i64 },
    Forum { channel_id: i64, thread_title: String },
}

/// One bounded-size package of formatted report content.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryUnit {
    Text(String),
    Embeds(Vec<ReportEmbed>),
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("channel {0} not found")]
    ChannelNotFound(i64),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),
}

#[async_trait]
pub trait ReportPublisher: Send + Sync {
    /// Sends the header followed by each unit to the target. For a forum
    /// target this creates a thread first and posts everything into it.
    async fn publish(
        &self,
        target: &DeliveryTarget,
        header: &str,
        units: &[DeliveryUnit],
    ) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait PreviewSource: Send + Sync {
    /// Content preview for the message behind a permalink, truncated to
    /// `max_len` characters. `None` when the message cannot be fetched.
    async fn message_preview(&self, url: &str, max_len: usize) -> Option<String>;
}

static DATE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{date(?::([^{}]+))?\}").unwrap());

fn format_date(now: DateTime<Utc>, format: &str) -> String {
    use std::fmt::Write;
    // chrono only surfaces a bad format string when formatting is driven,
    // so probe it through write! and fall back on error.
    let mut out = String::new();
    match write!(out, "{}", now.format(format)) {
        Ok(()) => out,
        Err(_) => now.format(DEFAULT_DATE_FORMAT).to_string(),
    }
}

/// Substitutes `{date[:format]}`, `{count}` and `{interval}` in a forum
/// thread title template. A malformed date format falls back to the default
/// rather than failing the job.
pub fn render_thread_title(
    template: &str,
    now: DateTime<Utc>,
    count: i32,
    interval_hours: f64,
) -> String {
    let with_date = DATE_PLACEHOLDER.replace_all(template, |caps: &regex::Captures<'_>| {
        let format = caps.get(1).map(|m| m.as_str()).unwrap_or(DEFAULT_DATE_FORMAT);
        format_date(now, format)
    });
    with_date
        .replace("{count}", &count.to_string())
        .replace("{interval}", &format!("{}h", format_interval(interval_hours)))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn substitutes_all_placeholders() {
        let title = render_thread_title("Top {count} for {interval} on {date}", now(), 5, 4.0);
        assert_eq!(title, "Top 5 for 4h on 2026-03-14");
    }

    #[test]
    fn date_honors_custom_format() {
        let title = render_thread_title("{date:%d.%m.%Y %H:%M}", now(), 5, 4.0);
        assert_eq!(title, "14.03.2026 09:30");
    }

    #[test]
    fn malformed_date_format_falls_back() {
        let title = render_thread_title("{date:%Q}", now(), 5, 4.0);
        assert_eq!(title, "2026-03-14");
    }

    #[test]
    fn fractional_interval_keeps_one_decimal() {
        let title = render_thread_title("last {interval}", now(), 5, 0.5);
        assert_eq!(title, "last 0.5h");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        assert_eq!(render_thread_title("Daily digest", now(), 5, 4.0), "Daily digest");
    }
}
