use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use crucible_cli_api::models::{ReviewFilter, Reviews};

use super::utils::CrucibleContext;

pub const CREATE_REVIEW_LABEL: &str = "Create new review ...";

#[derive(Args, Debug, Clone)]
pub struct PickArgs {
    /// Select this entry (1-based) instead of prompting
    #[arg(long)]
    pub choice: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickEntry {
    pub label: String,
    pub description: Option<String>,
}

/// Static entries first, then the reviews in server order.
pub fn build_entries(reviews: &Reviews) -> Vec<PickEntry> {
    let mut entries = vec![PickEntry {
        label: CREATE_REVIEW_LABEL.to_string(),
        description: None,
    }];
    entries.extend(reviews.review_data.iter().map(|review| PickEntry {
        label: review.id().to_string(),
        description: Some(review.name.clone()).filter(|name| !name.is_empty()),
    }));
    entries
}

/// Parses a 1-based selection into an index.
pub fn parse_choice(input: &str, entries: usize) -> Result<usize> {
    let choice: usize = input
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a number", input.trim()))?;
    if choice == 0 || choice > entries {
        return Err(anyhow!("Choose a number between 1 and {entries}"));
    }
    Ok(choice - 1)
}

fn prompt_choice(entries: &[PickEntry]) -> Result<usize> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    for (i, entry) in entries.iter().enumerate() {
        match &entry.description {
            Some(description) => writeln!(out, "{:>3}) {}  {}", i + 1, entry.label, description)?,
            None => writeln!(out, "{:>3}) {}", i + 1, entry.label)?,
        }
    }
    write!(out, "Select: ")?;
    out.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read selection")?;
    parse_choice(&line, entries.len())
}

pub async fn execute(args: PickArgs, ctx: &CrucibleContext<'_>) -> Result<()> {
    let reviews = ctx
        .client
        .filter_reviews(ReviewFilter::ToReview)
        .await
        .context("Failed to load reviews awaiting you")?;
    let entries = build_entries(&reviews);

    let index = match args.choice {
        Some(choice) => parse_choice(&choice.to_string(), entries.len())?,
        None => prompt_choice(&entries)?,
    };

    println!("{}", entries[index].label);
    Ok(())
}
