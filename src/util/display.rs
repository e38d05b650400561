//! Display utilities for terminal output

use chrono::{FixedOffset, Offset, Utc};
use colored::Colorize;

use crate::core::types::Token;

const SEPARATOR_WIDTH: usize = 80;

/// Console offset from whole hours, UTC when out of range
pub fn display_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

pub fn timestamp_prefix(offset: FixedOffset) -> String {
    format!("[{}]", Utc::now().with_timezone(&offset).format("%H:%M:%S"))
}

/// Creation time in the console offset, or the raw feed string when unparsable
pub fn format_created(token: &Token, offset: FixedOffset) -> String {
    match token.created_at {
        Some(created) => created
            .with_timezone(&offset)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string(),
        None => token.token_created_at.clone(),
    }
}

pub fn render_token(token: &Token, offset: FixedOffset) -> String {
    let mut lines = vec![
        format!("Name:     {}", token.name),
        format!("Ticker:   {}", token.ticker),
        format!("Address:  {}", token.token_address),
        format!("Created:  {}", format_created(token, offset)),
    ];
    if let Some(description) = &token.description {
        lines.push(format!("About:    {}", description));
    }
    lines.join("\n")
}

/// Newest first by creation instant, unknown instants last
pub fn latest_tokens(tokens: &[Token], count: usize) -> Vec<Token> {
    let mut sorted = tokens.to_vec();
    sorted.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.token_created_at.cmp(&a.token_created_at))
    });
    sorted.truncate(count);
    sorted
}

/// At most `limit` token blocks, then a count of the remainder
pub fn render_token_list(tokens: &[Token], limit: usize, offset: FixedOffset) -> String {
    let separator = "-".repeat(SEPARATOR_WIDTH);
    let mut out = separator.clone();
    for token in tokens.iter().take(limit) {
        out.push('\n');
        out.push_str(&render_token(token, offset));
        out.push('\n');
        out.push_str(&separator);
    }
    if tokens.len() > limit {
        out.push_str(&format!("\n... and {} more tokens not shown", tokens.len() - limit));
    }
    out
}

pub fn print_token_list(heading: &str, tokens: &[Token], limit: usize, offset: FixedOffset) {
    println!("\n{}", heading.bold());
    println!("{}", render_token_list(tokens, limit, offset));
}

pub fn print_new_tokens(tokens: &[Token], limit: usize, offset: FixedOffset) {
    println!(
        "{} {}",
        timestamp_prefix(offset).dimmed(),
        format!("🎉 Found {} new tokens", tokens.len()).bright_green().bold()
    );
    print_token_list("New tokens:", tokens, limit, offset);
}

pub fn print_no_new_tokens(offset: FixedOffset) {
    println!("{} {}", timestamp_prefix(offset).dimmed(), "📡 No new tokens".dimmed());
}

pub fn print_banner(api_url: &str, interval_minutes: u64) {
    println!("{}", "🚀 Spark token monitor".bright_magenta().bold());
    println!("📡 Feed: {}", api_url.cyan());
    println!("⏱️  Polling every {} minutes", interval_minutes);
    println!("{}", "=".repeat(SEPARATOR_WIDTH).dimmed());
}
