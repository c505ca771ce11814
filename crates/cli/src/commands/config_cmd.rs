//! `studybot config`: configuration management commands.

use std::path::{Path, PathBuf};
use studybot_config::AppConfig;

fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

pub async fn validate(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match super::load_config(path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            for layout in config.course_layouts() {
                if !layout.documents_dir.is_dir() {
                    warnings.push(format!(
                        "Documents directory for '{}' does not exist: {}",
                        layout.id,
                        layout.documents_dir.display()
                    ));
                } else if !layout.documents_dir.join(&config.knowledge.manifest_file).is_file() {
                    warnings.push(format!(
                        "Course '{}' has no {}",
                        layout.id, config.knowledge.manifest_file
                    ));
                }
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:   {} ({})", config.provider.name, config.provider.api_url);
            println!("   Model:      {}", config.provider.model);
            println!("   Embeddings: {}", config.provider.embedding_model);
            println!("   Courses:    {}", config.courses.len());
        }
        Err(e) => {
            println!("   ❌ {e}");
            return Err(e);
        }
    }

    Ok(())
}

pub async fn show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(path)?;
    if config.provider.api_key.is_some() {
        config.provider.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_file(path).display());
    Ok(())
}

pub async fn init(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let file = config_file(path);
    if file.exists() {
        println!("Config already exists at {}", file.display());
        return Ok(());
    }
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file, AppConfig::default_toml())?;
    println!("✅ Wrote default config to {}", file.display());
    Ok(())
}
