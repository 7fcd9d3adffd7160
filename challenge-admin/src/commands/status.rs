use anyhow::Result;
use challenge_store::domain::ChallengeStatus;
use challenge_store::repository::{is_valid_transition, Lifecycle};
use colored::Colorize;

pub fn execute(from: &str, to: &str) -> Result<()> {
    let from: ChallengeStatus = from.parse()?;
    let to: ChallengeStatus = to.parse()?;

    if is_valid_transition(from, to) {
        println!("{} {} -> {} is allowed", "✓".green().bold(), from, to);
        return Ok(());
    }

    println!("{} {} -> {} is not allowed", "✗".red().bold(), from, to);
    println!("\n{}", describe(from));
    anyhow::bail!("Invalid status transition {} -> {}", from, to)
}

/// One line listing where `status` may go next
fn describe(status: ChallengeStatus) -> String {
    if status.is_terminal() {
        return format!("{} is terminal", status);
    }
    let next: Vec<&str> = status
        .allowed_transitions()
        .iter()
        .map(|s| s.as_str())
        .collect();
    format!("From {}: {}", status, next.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_and_rejected() {
        assert!(execute("draft", "active").is_ok());
        assert!(execute("Completed", "archived").is_ok());
        assert!(execute("completed", "active").is_err());
        assert!(execute("done", "active").is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(ChallengeStatus::Deleted), "deleted is terminal");
        assert_eq!(
            describe(ChallengeStatus::Draft),
            "From draft: active, deleted"
        );
    }
}
