//! Image management operations surrounding the build pipeline.
//!
//! Everything here talks to the container engine CLI and only touches images
//! carrying the stack version label; the build pipeline never depends on it.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use serde::Deserialize;
use tokio::process::Command;

use crate::constants::LABEL_VERSION;
use crate::plan::compile_patterns;

/// One row of `docker images` JSON output.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Repository")]
    pub repository: String,
    #[serde(rename = "Tag")]
    pub tag: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
}

impl ImageRow {
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }

    pub fn untagged(&self) -> bool {
        self.repository == "<none>" || self.tag == "<none>"
    }

    /// Creation time; the listing appends a redundant zone name the parser
    /// has no use for.
    fn created(&self) -> Option<DateTime<FixedOffset>> {
        let fields: Vec<&str> = self.created_at.split_whitespace().collect();
        if fields.len() < 3 {
            return None;
        }
        DateTime::parse_from_str(&fields[..3].join(" "), "%Y-%m-%d %H:%M:%S %z").ok()
    }
}

/// List the images carrying the version label, filtered by wildcard patterns
/// against their `repository:tag` reference.
pub async fn managed_images(patterns: &[String], untagged: bool) -> Result<Vec<ImageRow>> {
    let patterns = compile_patterns(patterns)?;
    let output = Command::new("docker")
        .args([
            "images",
            "--filter",
            &format!("label={LABEL_VERSION}"),
            "--format",
            "{{json .}}",
        ])
        .output()
        .await
        .context("cannot run docker images")?;
    if !output.status.success() {
        bail!(
            "docker images failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let mut rows = Vec::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if line.trim().is_empty() {
            continue;
        }
        let row: ImageRow = serde_json::from_str(line)
            .with_context(|| format!("unexpected docker images output: {line}"))?;
        let matched = patterns.iter().any(|pattern| pattern.matches(&row.reference()));
        if (row.untagged() && untagged) || patterns.is_empty() || matched {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Render the rows as a table, oldest image first.
fn print_images(rows: &[ImageRow]) {
    let now = Utc::now();
    let mut table: Vec<(&ImageRow, Option<TimeDelta>)> = rows
        .iter()
        .map(|row| {
            let age = row
                .created()
                .map(|created| now.signed_duration_since(created.with_timezone(&Utc)));
            (row, age)
        })
        .collect();
    table.sort_by_key(|entry| {
        std::cmp::Reverse(entry.1.map(|age| age.num_seconds()).unwrap_or(i64::MAX))
    });

    println!("IMAGE ID       CREATED        TAG");
    for (row, age) in table {
        let created = age.map(format_age).unwrap_or_default();
        let tag = if row.untagged() {
            "<none>".to_string()
        } else {
            row.reference()
        };
        println!("{:<14} {:<14} {}", row.id, created, tag);
    }
}

/// Humanize an elapsed duration the way engine listings do.
fn format_age(elapsed: TimeDelta) -> String {
    const PERIODS: [(&str, i64); 6] = [
        ("year", 60 * 60 * 24 * 365),
        ("month", 60 * 60 * 24 * 30),
        ("day", 60 * 60 * 24),
        ("hour", 60 * 60),
        ("minute", 60),
        ("second", 1),
    ];
    let seconds = elapsed.num_seconds();
    for (name, period) in PERIODS {
        if seconds > period {
            let value = seconds / period;
            let plural = if value > 1 { "s" } else { "" };
            return format!("{value} {name}{plural} ago");
        }
    }
    String::new()
}

/// Interactive yes/no gate, skipped with `--yes`.
fn confirm(yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    print!("Are you sure (yes/no): ");
    io::stdout().flush()?;
    loop {
        let mut answer = String::new();
        if io::stdin().read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        match answer.trim() {
            "yes" => return Ok(true),
            "no" => return Ok(false),
            _ => {
                print!("Please type yes/no: ");
                io::stdout().flush()?;
            }
        }
    }
}

pub async fn list(patterns: &[String], untagged: bool) -> Result<()> {
    let rows = managed_images(patterns, untagged).await?;
    print_images(&rows);
    Ok(())
}

/// Remove matched images, newest first. A failed removal is reported and the
/// sweep continues.
pub async fn remove(patterns: &[String], untagged: bool, force: bool, yes: bool) -> Result<()> {
    let rows = managed_images(patterns, untagged).await?;
    println!("Following images will be deleted:");
    print_images(&rows);
    if !confirm(yes)? {
        return Ok(());
    }

    let mut targets: Vec<(i64, String)> = rows
        .iter()
        .map(|row| {
            let created = row.created().map(|c| c.timestamp()).unwrap_or(i64::MIN);
            let target = if row.untagged() {
                row.id.clone()
            } else {
                row.reference()
            };
            (created, target)
        })
        .collect();
    targets.sort_by_key(|(created, _)| std::cmp::Reverse(*created));

    for (_, target) in targets {
        let mut command = Command::new("docker");
        command.args(["rmi", &target]);
        if force {
            command.arg("--force");
        }
        let output = command.output().await.context("cannot run docker rmi")?;
        if !output.status.success() {
            println!(
                "{target} can't be removed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
    }
    Ok(())
}

/// Push every matched tagged image; the first failure stops the sweep.
pub async fn push(patterns: &[String], yes: bool) -> Result<()> {
    let rows = managed_images(patterns, false).await?;
    println!("Following images will be pushed:");
    print_images(&rows);
    if !confirm(yes)? {
        return Ok(());
    }

    for row in &rows {
        if row.untagged() {
            continue;
        }
        let reference = row.reference();
        print!("{reference}...");
        io::stdout().flush()?;
        let output = Command::new("docker")
            .args(["push", &reference])
            .output()
            .await
            .context("cannot run docker push")?;
        if !output.status.success() {
            println!("ERROR");
            bail!(
                "push of {reference} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        println!("PUSHED");
    }
    Ok(())
}

/// Pull one image, or check it exists locally with `--local`.
pub async fn pull(image: &str, local: bool, arch: Option<&str>) -> Result<()> {
    if local {
        let output = Command::new("docker")
            .args(["image", "inspect", image])
            .output()
            .await
            .context("cannot run docker image inspect")?;
        if !output.status.success() {
            bail!("{image} not found in the local repository");
        }
        return Ok(());
    }

    println!("pulling image");
    let mut command = Command::new("docker");
    command.args(["pull", image]);
    if let Some(arch) = arch {
        command.args(["--platform", arch]);
    }
    let output = command.output().await.context("cannot run docker pull")?;
    if !output.status.success() {
        bail!(
            "pull of {image} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    println!("pull complete");
    Ok(())
}
