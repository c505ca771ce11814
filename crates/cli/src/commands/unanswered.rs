//! `studybot unanswered`: questions logged for corpus gap analysis.

use std::path::Path;
use studybot_knowledge::UnansweredLog;

pub async fn run(
    config_path: Option<&Path>,
    course: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let log = UnansweredLog::new(config.agent.unanswered_log.clone());

    let entries = match course {
        Some(code) => log.entries_for(code)?,
        None => log.entries()?,
    };

    if entries.is_empty() {
        println!("No unanswered questions logged.");
        return Ok(());
    }

    println!("❓ {} unanswered question(s)", entries.len());
    println!();
    for entry in &entries {
        println!(
            "  {} [{}] ({}) {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.course,
            entry.reason,
            entry.question
        );
        if let Some(note) = &entry.note {
            println!("      note: {note}");
        }
    }
    Ok(())
}
