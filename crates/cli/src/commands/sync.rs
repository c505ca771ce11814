//! `studybot sync`: bootstrap, prune, and reconcile course indexes.

use std::path::Path;
use studybot_knowledge::{IndexSynchronizer, SyncReport, SyncSettings};

pub async fn run(
    config_path: Option<&Path>,
    course: Option<&str>,
    rebuild: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let provider = studybot_providers::build_from_config(&config.provider)?;
    let sync = IndexSynchronizer::new(
        provider,
        SyncSettings::from_config(&config.provider, &config.knowledge),
    )
    .with_event_bus(super::events::logged_bus());

    let layouts = match course {
        Some(code) => vec![config.course_layout(code)?],
        None => config.course_layouts(),
    };

    println!("📚 Synchronizing {} course(s)", layouts.len());
    println!();

    let mut failures = 0usize;
    for (course, result) in sync.sync_all(&layouts, rebuild).await {
        match result {
            Ok(report) => print_report(&report),
            Err(e) => {
                failures += 1;
                println!("   ❌ {course}: {e}");
            }
        }
    }

    println!();
    if failures > 0 {
        return Err(format!("{failures} course(s) failed to synchronize").into());
    }
    println!("   ✅ Done");
    Ok(())
}

fn print_report(report: &SyncReport) {
    let mode = if report.bootstrapped { "built" } else { "synced" };
    println!(
        "   {} {mode}: {} documents, {} nodes",
        report.course, report.document_count, report.node_count
    );
    if report.changed() {
        println!(
            "      +{} added, ~{} replaced, -{} pruned, -{} evicted, {} unchanged",
            report.added.len(),
            report.replaced.len(),
            report.pruned.len(),
            report.evicted.len(),
            report.unchanged
        );
    }
    for orphan in &report.orphans {
        println!("      ⚠️  no manifest entry for {}", orphan.file_name);
    }
}
