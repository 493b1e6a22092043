/// Compute effective limit with precedence: global flag -> configured default.
#[must_use]
pub fn effective_limit(global: Option<u32>, fallback: u32) -> u32 {
    global.unwrap_or(fallback)
}

/// Truncate `rows` to `limit` entries.
pub fn apply_limit<T>(rows: &mut Vec<T>, limit: u32) -> anyhow::Result<()> {
    rows.truncate(usize::try_from(limit)?);
    Ok(())
}
