use super::open_store;
use crate::cli::SearchAddArgs;
use crate::config::Config;
use crate::db::AddSearchResult;
use crate::models::search::{Frequency, NewSavedSearch, SavedSearch};

pub async fn cmd_search_add(config: &Config, args: SearchAddArgs) -> anyhow::Result<()> {
    let keyword = args.keyword.trim();
    if keyword.is_empty() {
        println!("Keyword cannot be empty.");
        return Ok(());
    }

    let store = open_store(config).await?;

    let Some(user) = store.get_user_by_email(&args.email).await? else {
        println!("User not found: {}", args.email);
        println!("Add them first with: jobseek user add <email> <name>");
        return Ok(());
    };

    let search = NewSavedSearch {
        keyword: keyword.to_string(),
        country: args
            .country
            .unwrap_or_else(|| config.search.default_country.clone()),
        location: args.location,
        language: args.language,
        frequency: args.frequency,
        hours_old: args.hours_old,
        exclude: args.exclude,
        results_wanted: args.results_wanted,
    };

    match store.add_saved_search(user.id, &search).await? {
        AddSearchResult::Created(id) => {
            println!("✓ Saved search '{keyword}' for {} (ID: {id})", user.email);
        }
        AddSearchResult::Existing(id) => {
            println!("This alert already exists for {} (ID: {id})", user.email);
        }
    }

    Ok(())
}

pub async fn cmd_search_list(config: &Config, email: Option<&str>) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let searches = match email {
        Some(email) => {
            let Some(user) = store.get_user_by_email(email).await? else {
                println!("User not found: {email}");
                return Ok(());
            };
            store.list_searches_for_user(user.id).await?
        }
        None => store.list_all_searches().await?,
    };

    if searches.is_empty() {
        println!("No saved searches.");
        return Ok(());
    }

    println!("Saved Searches ({} total)", searches.len());
    println!("{:-<70}", "");

    for search in &searches {
        print_search(search);
    }

    Ok(())
}

fn print_search(search: &SavedSearch) {
    let mut filters = Vec::new();
    if let Some(location) = &search.location {
        filters.push(format!("location={location}"));
    }
    if let Some(language) = &search.language {
        filters.push(format!("language={language}"));
    }
    if let Some(exclude) = &search.exclude {
        filters.push(format!("exclude={exclude}"));
    }

    let frequency = Frequency::parse_lossy(&search.frequency);
    let last_run = search
        .last_run
        .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());

    println!("• [{}] {} in {}", search.id, search.keyword, search.country);
    println!(
        "  User: {} | Frequency: {} | Last run: {}",
        search.user_id, frequency, last_run
    );
    if !filters.is_empty() {
        println!("  Filters: {}", filters.join(", "));
    }
}

pub async fn cmd_search_remove(config: &Config, id: i32, email: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let Some(user) = store.get_user_by_email(email).await? else {
        println!("User not found: {email}");
        return Ok(());
    };

    if store.remove_saved_search(id, user.id).await? {
        println!("✓ Removed saved search {id}");
    } else {
        println!("Saved search {id} not found for {email}");
    }

    Ok(())
}
