use super::open_store;
use crate::config::Config;
use crate::constants::limits::DEFAULT_HISTORY_LIMIT;

pub async fn cmd_history(config: &Config, search_id: i32, limit: Option<u64>) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let Some(search) = store.get_saved_search(search_id).await? else {
        println!("Saved search {search_id} not found.");
        return Ok(());
    };

    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).max(1);
    let entries = store.recent_deliveries(search_id, limit).await?;
    let total = store.delivery_count(search_id).await?;

    if entries.is_empty() {
        println!("Nothing delivered yet for '{}'.", search.keyword);
        return Ok(());
    }

    println!(
        "Delivered for '{}' in {} (showing {} of {}):",
        search.keyword,
        search.country,
        entries.len(),
        total
    );
    println!("{:-<70}", "");

    for entry in entries {
        println!("• {}", entry.job_url);
        println!("  Sent: {}", entry.sent_at);
    }

    Ok(())
}
