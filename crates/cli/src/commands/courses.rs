//! `studybot courses`: configured courses, their index state, and whether
//! the model endpoint answers.

use std::path::Path;
use studybot_core::provider::Provider;
use studybot_knowledge::PersistedIndex;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let provider = studybot_providers::build_from_config(&config.provider)?;

    println!("🎓 Courses");
    println!("==========");
    println!(
        "  Provider: {} at {} {}",
        provider.name(),
        config.provider.api_url,
        provider_status(provider.as_ref()).await
    );
    for layout in config.course_layouts() {
        println!("  {} ({})", layout.id, layout.name);
        println!("    Documents: {}", layout.documents_dir.display());
        match PersistedIndex::load(&layout.index_dir) {
            Ok(Some(index)) => println!(
                "    Index:     {} documents, {} nodes ({})",
                index.document_count(),
                index.node_count(),
                index.embedding_model
            ),
            Ok(None) => println!("    Index:     (not built yet, run `studybot sync`)"),
            Err(e) => println!("    Index:     ❌ {e}"),
        }
    }
    Ok(())
}

/// Short reachability summary for the configured provider.
async fn provider_status(provider: &dyn Provider) -> String {
    match provider.health_check().await {
        Ok(true) => "✅ reachable".into(),
        Ok(false) => "⚠️  responded with an error".into(),
        Err(e) => {
            tracing::debug!(error = %e, "Provider health check failed");
            format!("❌ unreachable ({e})")
        }
    }
}
