//! Rendering and pagination of ranked top-message reports.
//!
//! Delivery destinations impose two ceilings: at most 10 rich embeds per
//! message and at most 2000 characters of plain text. Three policies cover
//! the delivery shapes: grouped embeds, a single adaptive text block that
//! shrinks previews until the block fits, and a multi-part text stream with
//! "Part i/N" headers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::db::TopMessage;

pub const MAX_MESSAGE_LENGTH: usize = 2000;
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;
pub const MAX_PREVIEW_LENGTH: usize = 100;
pub const MIN_PREVIEW_LENGTH: usize = 15;
pub const PREVIEW_DECREMENT: usize = 20;
pub const PREVIEW_UNAVAILABLE: &str = "(Message content unavailable)";

const TOO_MANY_RESULTS: &str = "\n**Too many results for one message!**";
const EMBED_COLOR: u32 = 0x5865F2;

/// Interval hours with at most one decimal: `4` not `4.0`, `4.5` as-is.
pub fn format_interval(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}", hours as i64)
    } else {
        format!("{hours:.1}")
    }
}

/// Header line for a scheduled sweep report.
pub fn sweep_header(
    count: i32,
    interval_hours: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    format!(
        "Top {count} messages for the last {}h (from {} to {} UTC)",
        format_interval(interval_hours),
        start.format("%b %d %H:%M"),
        end.format("%b %d %H:%M"),
    )
}

fn truncate_preview(preview: &str, max_len: usize) -> String {
    if preview.chars().count() > max_len {
        let mut out: String = preview.chars().take(max_len).collect();
        out.push_str("...");
        out
    } else {
        preview.to_string()
    }
}

fn reaction_line(message: &TopMessage) -> String {
    message
        .reactions
        .iter()
        .map(|r| match r.custom_emoji_id {
            Some(id) => format!("<:{}:{}> {}", r.emoji, id, r.count),
            None => format!("{} {}", r.emoji, r.count),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_item(
    rank: usize,
    message: &TopMessage,
    previews: &HashMap<String, String>,
    preview_len: usize,
) -> String {
    let preview = previews
        .get(&message.url)
        .map(String::as_str)
        .unwrap_or(PREVIEW_UNAVAILABLE);
    format!(
        "#{rank}. {}\n<@{}>: `{}`\n{}\n\n",
        message.url,
        message.author_id,
        truncate_preview(preview, preview_len),
        reaction_line(message),
    )
}

fn try_render(
    messages: &[TopMessage],
    previews: &HashMap<String, String>,
    preview_len: usize,
    last_attempt: bool,
) -> Option<String> {
    let reserved = TOO_MANY_RESULTS.chars().count();
    let mut out = String::new();
    let mut out_len = 0;
    let mut rank = 1;

    for message in messages {
        let item = render_item(rank, message, previews, preview_len);
        let item_len = item.chars().count();
        if out_len + item_len < MAX_MESSAGE_LENGTH - reserved {
            out.push_str(&item);
            out_len += item_len;
            rank += 1;
        } else if last_attempt {
            // Room for the notice was reserved above, so this cannot
            // overflow the ceiling.
            out.push_str(TOO_MANY_RESULTS);
            return Some(out);
        } else {
            return None;
        }
    }
    Some(out)
}

/// Single text block. Previews shrink from 100 characters in steps of 20
/// until everything fits; at the 15-character floor remaining items are
/// dropped behind a fixed notice instead.
pub fn adaptive_text(messages: &[TopMessage], previews: &HashMap<String, String>) -> String {
    let mut preview_len = MAX_PREVIEW_LENGTH;
    while preview_len >= MIN_PREVIEW_LENGTH {
        if let Some(text) = try_render(messages, previews, preview_len, false) {
            return text;
        }
        preview_len -= PREVIEW_DECREMENT;
    }
    try_render(messages, previews, MIN_PREVIEW_LENGTH, true).unwrap_or_default()
}

/// Sequentially numbered text blocks, each under the size ceiling. The part
/// totals are unknown until all items are placed, so headers carry a `/?)`
/// placeholder that is rewritten at the end.
pub fn multipart_text(
    messages: &[TopMessage],
    previews: &HashMap<String, String>,
    header: &str,
) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut part_number = 1;
    let mut current = format!("{header} (Part 1/?)\n");

    for (i, message) in messages.iter().enumerate() {
        let item = render_item(i + 1, message, previews, MAX_PREVIEW_LENGTH);
        if current.chars().count() + item.chars().count() < MAX_MESSAGE_LENGTH {
            current.push_str(&item);
        } else {
            parts.push(current);
            part_number += 1;
            current = format!("{header} (Part {part_number}/?)\n");
            current.push_str(&item);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }

    let total = parts.len();
    parts
        .into_iter()
        .map(|p| p.replace("/?)", &format!("/{total})")))
        .collect()
}

/// A rich-formatted report item in the destination's embed shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEmbed {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    color: u32,
}

impl ReportEmbed {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: description.into(),
            url: None,
            color: EMBED_COLOR,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn build_embed(rank: usize, message: &TopMessage, previews: &HashMap<String, String>) -> ReportEmbed {
    let preview = previews
        .get(&message.url)
        .map(String::as_str)
        .unwrap_or(PREVIEW_UNAVAILABLE);
    let description = format!(
        "<@{}>: `{}`\n{}",
        message.author_id,
        truncate_preview(preview, MAX_PREVIEW_LENGTH),
        reaction_line(message),
    );
    ReportEmbed::new(description)
        .title(format!("#{rank} with {} reactions", message.total_reactions))
        .url(message.url.clone())
}

/// One embed per message, grouped into batches of at most 10. An item is
/// never split across groups.
pub fn grouped_embeds(
    messages: &[TopMessage],
    previews: &HashMap<String, String>,
) -> Vec<Vec<ReportEmbed>> {
    let embeds: Vec<ReportEmbed> = messages
        .iter()
        .enumerate()
        .map(|(i, m)| build_embed(i + 1, m, previews))
        .collect();
    embeds
        .chunks(MAX_EMBEDS_PER_MESSAGE)
        .map(|c| c.to_vec())
        .collect()
}
