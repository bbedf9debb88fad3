use super::open_store;
use crate::config::Config;

pub async fn cmd_user_add(config: &Config, email: &str, name: &str, plan: &str) -> anyhow::Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        println!("Invalid email address: {email}");
        return Ok(());
    }

    let store = open_store(config).await?;

    if let Some(existing) = store.get_user_by_email(email).await? {
        println!("User already exists: {} (ID: {})", existing.email, existing.id);
        return Ok(());
    }

    let id = store.add_user(email, name.trim(), plan.trim()).await?;
    println!("✓ Added user {email} (ID: {id})");
    Ok(())
}

pub async fn cmd_user_list(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users registered.");
        println!();
        println!("Add one with: jobseek user add <email> <name>");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let searches = store.list_searches_for_user(user.id).await?.len();
        let marker = if user.is_pro() { "★" } else { "•" };
        println!("{} {} <{}>", marker, user.name, user.email);
        println!(
            "  ID: {} | Plan: {} | Searches: {}",
            user.id, user.subscription_plan, searches
        );
    }

    Ok(())
}

pub async fn cmd_user_remove(config: &Config, email: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    if store.remove_user(email).await? {
        println!("✓ Removed user {email} and their saved searches");
    } else {
        println!("User not found: {email}");
    }

    Ok(())
}
