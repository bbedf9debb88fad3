use super::open_store;
use crate::config::Config;

pub async fn cmd_unsubscribe(
    config: &Config,
    email: &str,
    search_id: Option<i32>,
    all: bool,
) -> anyhow::Result<()> {
    if search_id.is_none() && !all {
        println!("Specify --search <id> or --all.");
        return Ok(());
    }

    let store = open_store(config).await?;

    let Some(user) = store.get_user_by_email(email).await? else {
        println!("User not found: {email}");
        return Ok(());
    };

    if let Some(id) = search_id {
        if store.remove_saved_search(id, user.id).await? {
            println!("✓ Unsubscribed {email} from search {id}");
        } else {
            println!("Saved search {id} not found for {email}");
        }
        return Ok(());
    }

    let removed = store.remove_all_searches_for_user(user.id).await?;
    println!("✓ Unsubscribed {email} from {removed} saved searches");
    Ok(())
}
