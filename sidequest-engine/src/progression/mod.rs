pub mod completion;
pub mod subscription;

use sidequest_core::{ProgressionError, UserId};
use sidequest_database::Database;
use sidequest_database::impls::user_stats::load_user_stats;
use sidequest_utils::UserStats;

/// One-shot canonical stats read for profile display.
pub async fn fetch_user_stats(
    db: &Database,
    user_id: &UserId,
) -> Result<UserStats, ProgressionError> {
    load_user_stats(db, user_id.as_str())
        .await
        .map_err(ProgressionError::StoreUnavailable)
}
