//! Subcommand handlers.

use anyhow::Context;
use bytesize::ByteSize;
use chrono::Local;
use savepoint_snapshot::{hash_file, SaveCoordinator, SnapshotConfig};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Save new content to `document`, read from `from` or stdin.
pub async fn save(
    coordinator: &SaveCoordinator,
    document: &Path,
    from: Option<&Path>,
) -> anyhow::Result<()> {
    let content = match from {
        Some(source) => tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read {}", source.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };

    coordinator
        .save(document, &content)
        .await
        .with_context(|| format!("Failed to save {}", document.display()))?;

    println!("Saved {} ({})", document.display(), ByteSize::b(content.len() as u64));
    Ok(())
}

/// Revert `document`, or only print the content it would revert to when
/// `print` is set.
pub async fn undo(coordinator: &SaveCoordinator, document: &Path, print: bool) -> anyhow::Result<()> {
    if print {
        match coordinator.preview(document).await? {
            Some(content) => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&content).await?;
                stdout.flush().await?;
            }
            None => eprintln!("Nothing to undo for {}", document.display()),
        }
        return Ok(());
    }

    if coordinator.revert(document).await? {
        let remaining = coordinator.history(document).await.len();
        println!(
            "Reverted {} ({} earlier version{} left)",
            document.display(),
            remaining,
            if remaining == 1 { "" } else { "s" }
        );
    } else {
        println!("Nothing to undo for {}", document.display());
    }
    Ok(())
}

/// List the snapshots of `document`, newest first.
pub async fn history(
    coordinator: &SaveCoordinator,
    document: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let records = coordinator.history(document).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No snapshots for {}", document.display());
        return Ok(());
    }

    let current = hash_file(document).await.ok();
    println!("Snapshots for {} (newest first):", document.display());
    for (i, record) in records.iter().rev().enumerate() {
        let size = tokio::fs::metadata(&record.backup_path)
            .await
            .map(|m| ByteSize::b(m.len()).to_string())
            .unwrap_or_else(|_| "missing".to_string());
        let marker = match (current, record.content_hash) {
            (Some(a), Some(b)) if a == b => "  (same as current)",
            _ => "",
        };
        println!(
            "  {:>2}. {}  {:>10}{}",
            i + 1,
            record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S%.3f"),
            size,
            marker
        );
    }
    Ok(())
}

/// Print the effective configuration.
pub fn config(config: &SnapshotConfig, sources: &[PathBuf]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);

    match config.resolved_backup_dir() {
        Ok(dir) => println!("\nBackup directory: {}", dir.display()),
        Err(e) => println!("\nBackup directory: unavailable ({e})"),
    }

    if sources.is_empty() {
        println!("Config sources: defaults");
    } else {
        println!("Config sources:");
        for source in sources {
            println!("  {}", source.display());
        }
    }
    Ok(())
}
