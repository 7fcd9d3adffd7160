use anyhow::{Context, Result};
use challenge_store::domain::{Challenge, ChallengeType, DifficultyLevel, FocusArea, FormatType};
use challenge_store::observability::init_tracing;
use challenge_store::repository::{Entity, SeedReport};
use challenge_store::state::Repositories;
use clap::ValueEnum;
use colored::Colorize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// Entity types that can be seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogueKind {
    FocusAreas,
    FormatTypes,
    DifficultyLevels,
    ChallengeTypes,
    Challenges,
}

impl fmt::Display for CatalogueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FocusAreas => "focus areas",
            Self::FormatTypes => "format types",
            Self::DifficultyLevels => "difficulty levels",
            Self::ChallengeTypes => "challenge types",
            Self::Challenges => "challenges",
        };
        f.write_str(name)
    }
}

/// Outcome of checking one record without saving it
#[derive(Debug)]
struct RecordCheck {
    index: usize,
    outcome: std::result::Result<String, String>,
}

pub async fn execute(
    config_path: Option<&Path>,
    kind: CatalogueKind,
    file: &Path,
    dry_run: bool,
) -> Result<()> {
    let records = read_records(file)?;

    if dry_run {
        return report_checks(kind, &check(kind, &records));
    }

    let config = super::load_config(config_path)?;
    init_tracing(&config)?;
    if config.database.is_none() {
        println!(
            "{} no database configured, records are seeded into in-memory storage",
            "warning:".yellow().bold()
        );
    }

    let repos = Repositories::builder().config(config).build().await?;
    let records = Value::Array(records);
    let report = match kind {
        CatalogueKind::FocusAreas => repos.focus_areas.seed(records).await?,
        CatalogueKind::FormatTypes => repos.format_types.seed(records).await?,
        CatalogueKind::DifficultyLevels => repos.difficulty_levels.seed(records).await?,
        CatalogueKind::ChallengeTypes => repos.challenge_types.seed(records).await?,
        CatalogueKind::Challenges => repos.challenges.seed(records).await?,
    };

    print_report(kind, &report);
    if !report.is_complete() {
        anyhow::bail!("{} of {} records failed", report.failed(), report.attempted);
    }
    Ok(())
}

fn read_records(file: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read seed file: {}", file.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Seed file is not valid JSON: {}", file.display()))?;

    match value {
        Value::Array(records) if !records.is_empty() => Ok(records),
        Value::Array(_) => anyhow::bail!("Seed file contains no records: {}", file.display()),
        _ => anyhow::bail!("Seed file must hold a JSON array: {}", file.display()),
    }
}

fn check(kind: CatalogueKind, records: &[Value]) -> Vec<RecordCheck> {
    match kind {
        CatalogueKind::FocusAreas => check_as::<FocusArea>(records),
        CatalogueKind::FormatTypes => check_as::<FormatType>(records),
        CatalogueKind::DifficultyLevels => check_as::<DifficultyLevel>(records),
        CatalogueKind::ChallengeTypes => check_as::<ChallengeType>(records),
        CatalogueKind::Challenges => check_as::<Challenge>(records),
    }
}

/// Build and validate each record the way seeding would, without storage
fn check_as<E: Entity>(records: &[Value]) -> Vec<RecordCheck> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let outcome = E::from_seed(record.clone()).and_then(|entity| {
                entity.validate()?;
                Ok(entity.business_key().to_string())
            });
            RecordCheck { index, outcome }
        })
        .collect()
}

fn report_checks(kind: CatalogueKind, checks: &[RecordCheck]) -> Result<()> {
    println!("{} {} (dry run)", "Checking".bold(), kind);
    for check in checks {
        match &check.outcome {
            Ok(key) => println!("  {} #{} {}", "✓".green(), check.index, key),
            Err(msg) => println!("  {} #{} {}", "✗".red(), check.index, msg),
        }
    }

    let failed = checks.iter().filter(|c| c.outcome.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} records are invalid", failed, checks.len());
    }
    println!("\n{} all {} records are valid", "✓".green().bold(), checks.len());
    Ok(())
}

fn print_report(kind: CatalogueKind, report: &SeedReport) {
    println!(
        "{} {}: {} attempted, {} saved, {} failed",
        "Seeded".green().bold(),
        kind,
        report.attempted,
        report.saved,
        report.failed()
    );
    for failure in &report.failures {
        println!(
            "  {} #{} {} {}",
            "✗".red(),
            failure.index,
            failure.code.as_deref().unwrap_or("-"),
            failure.error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_dry_run_checks_each_record() {
        let records = vec![
            json!({"code": "easy", "name": "Easy", "level": 1}),
            json!({"code": "zero", "name": "Zero", "level": 0}),
            json!({"code": "broken"}),
        ];
        let checks = check(CatalogueKind::DifficultyLevels, &records);
        assert_eq!(checks[0].outcome.as_deref(), Ok("easy"));
        assert!(checks[1].outcome.is_err());
        assert!(checks[2].outcome.is_err());
        assert!(report_checks(CatalogueKind::DifficultyLevels, &checks).is_err());
    }

    #[test]
    fn test_read_records_requires_non_empty_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"code": "fa1"}}"#).unwrap();
        assert!(read_records(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        assert!(read_records(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"code": "fa1", "name": "Fundamentals"}}]"#).unwrap();
        assert_eq!(read_records(file.path()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_seed_into_memory() {
        let mut records = tempfile::NamedTempFile::new().unwrap();
        write!(
            records,
            r#"[{{"code": "fa1", "name": "Fundamentals"}}, {{"code": "fa2", "name": "Testing"}}]"#
        )
        .unwrap();
        let mut config = tempfile::NamedTempFile::new().unwrap();
        writeln!(config, "[service]\nname = \"challenge-admin\"").unwrap();

        execute(
            Some(config.path()),
            CatalogueKind::FocusAreas,
            records.path(),
            false,
        )
        .await
        .unwrap();
    }
}
