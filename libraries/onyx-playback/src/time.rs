//! Position display helpers

/// Format milliseconds as `m:ss`
///
/// Minutes are not wrapped into hours, so an hour-long track shows `62:03`.
pub fn format_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
