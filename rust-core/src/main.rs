//! CLI: stdin JSON -> stdout JSON.
//!
//! Usage:
//!   echo '{"records":[...]}' | triage urgency [config.toml]
//!   echo '{"posts":[...]}'   | triage alerts  [config.toml]
//!   echo '{"posts":[...]}'   | triage summary [config.toml]
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{env, io};
use triage_core::{
    daily_trend, init_tracing, rank, summarize_by_segment, top_n, top_sentiments, AlertEngine,
    AlertReport, ClassifiedRecord, Direction, EngineConfig, Record, ScoredPost,
    SentimentClassifier, TierCounts, UrgencyEngine,
};

// --- Urgency structs ---

#[derive(Debug, Deserialize)]
struct UrgencyInput {
    records: Vec<Record>,
}

#[derive(Debug, Serialize)]
struct UrgencyOutput {
    summary: TierCounts,
    results: Vec<ClassifiedRecord>,
}

// --- Alert structs ---

#[derive(Debug, Deserialize)]
struct AlertInput {
    posts: Vec<ScoredPost>,
}

fn build_alert_report(
    config: &EngineConfig,
    posts: &[ScoredPost],
) -> Result<AlertReport, Box<dyn std::error::Error>> {
    let engine = AlertEngine::new(
        config.alerts.clone(),
        SentimentClassifier::new(config.sentiment),
    )?;
    Ok(engine.build_report(posts)?)
}

fn print_summary(config: &EngineConfig, posts: &[ScoredPost], report: &AlertReport) {
    let classifier = SentimentClassifier::new(config.sentiment);
    println!("{report}");

    let (_, status) = report.quick_check();
    println!("Status: {status}");

    let segments = summarize_by_segment(posts, &classifier);
    if !segments.is_empty() {
        println!();
        println!("BY SEGMENT:");
        for (segment, s) in &segments {
            println!(
                "  {segment}: {} posts, {:.1}% positive, {:.1}% negative, avg {:.3}",
                s.total, s.positive_percentage, s.negative_percentage, s.avg_compound_score
            );
        }
    }

    let trend = daily_trend(posts);
    if !trend.is_empty() {
        println!();
        println!("DAILY TREND:");
        for day in &trend {
            println!("  {}: {:+.3} ({} posts)", day.date, day.mean_compound, day.count);
        }
    }

    let worst = top_sentiments(posts, 5, Direction::Negative);
    if !worst.is_empty() {
        println!();
        println!("MOST NEGATIVE:");
        for (i, post) in worst.iter().enumerate() {
            let preview: String = post.text.chars().take(80).collect();
            println!("  {}. {:+.3} {preview}", i + 1, post.compound_score);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("urgency");
    let config = EngineConfig::load(args.get(2).map(Path::new))?;

    match cmd {
        "alerts" => {
            let input: AlertInput = serde_json::from_reader(io::stdin())?;
            let report = build_alert_report(&config, &input.posts)?;
            serde_json::to_writer(io::stdout(), &report)?;
        }
        "summary" => {
            let input: AlertInput = serde_json::from_reader(io::stdin())?;
            let report = build_alert_report(&config, &input.posts)?;
            print_summary(&config, &input.posts, &report);
        }
        _ => {
            let input: UrgencyInput = serde_json::from_reader(io::stdin())?;
            let engine = UrgencyEngine::new(&config.scoring)?;
            let classified = engine.classify_batch(&input.records);
            let summary = TierCounts::from_records(&classified);
            let results = rank(classified)?;
            tracing::info!(
                total = summary.total,
                high_priority = summary.high_priority(),
                "urgency analysis complete"
            );
            for record in top_n(&results, 5) {
                tracing::info!(
                    rank = record.priority_rank,
                    id = %record.id,
                    score = record.urgency_score,
                    tier = %record.tier,
                    "top priority"
                );
            }
            serde_json::to_writer(io::stdout(), &UrgencyOutput { summary, results })?;
        }
    }
    Ok(())
}
