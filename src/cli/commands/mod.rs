mod history;
mod search;
mod unsubscribe;
mod user;

pub use history::cmd_history;
pub use search::{cmd_search_add, cmd_search_list, cmd_search_remove};
pub use unsubscribe::cmd_unsubscribe;
pub use user::{cmd_user_add, cmd_user_list, cmd_user_remove};

use crate::config::Config;
use crate::db::Store;

pub(crate) async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
}
