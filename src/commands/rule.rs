//! `rule` command handler — explains a score rule by id.

use crate::score::RuleSet;

/// Prints the explanation for a rule id as JSON.
///
/// # Errors
///
/// Returns an error if the id is not a registered rule.
pub fn run(id: u32) -> Result<(), String> {
    let rules = RuleSet::builtin()?;
    let explanation = rules
        .explain(id)
        .ok_or_else(|| format!("No rule registered with id {id} (0..{})", rules.len()))?;
    let rendered = serde_json::to_string_pretty(&explanation)
        .map_err(|e| format!("Failed to render rule explanation: {e}"))?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn known_rule_prints() {
        assert!(run(0).is_ok());
    }

    #[test]
    fn unknown_rule_errors_with_range() {
        let result = run(999);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("999"));
    }
}
