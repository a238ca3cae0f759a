use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sidequest_core::{ProgressionError, UserId};
use sidequest_database::Database;
use sidequest_database::impls::user_stats::{read_user_stats_record, watch_user_stats};
use sidequest_database::model::user_stats::canonical_stats;
use sidequest_utils::UserStats;

/// Handle for a live stats subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct StatsSubscription {
    task: Option<JoinHandle<()>>,
}

impl StatsSubscription {
    fn inert() -> Self {
        Self { task: None }
    }

    /// Stop delivering updates. No callback runs after the task is cancelled.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for StatsSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Push canonical stats for `user_id` to `on_stats`: once immediately, then
/// after every change to the stored record.
///
/// Without a user id the default stats are pushed once and the returned
/// handle is inert. Failing to arm the watch or to read the initial state is
/// a [`ProgressionError::StoreUnavailable`]; failures after that end the
/// subscription and are logged.
pub async fn subscribe_to_user_stats<F>(
    db: &Database,
    user_id: Option<&UserId>,
    mut on_stats: F,
) -> Result<StatsSubscription, ProgressionError>
where
    F: FnMut(UserStats) + Send + 'static,
{
    let Some(user_id) = user_id else {
        on_stats(UserStats::default());
        return Ok(StatsSubscription::inert());
    };

    let mut watch = watch_user_stats(db, user_id.as_str())
        .await
        .map_err(ProgressionError::StoreUnavailable)?;
    let initial = read_user_stats_record(db, user_id.as_str())
        .await
        .map_err(ProgressionError::StoreUnavailable)?;
    on_stats(canonical_stats(initial.as_ref()));

    let db = db.clone();
    let user_id = user_id.clone();
    let task = tokio::spawn(async move {
        loop {
            if let Err(err) = watch.changed().await {
                warn!(?err, user_id = %user_id, "stats watch failed; ending subscription");
                break;
            }

            match read_user_stats_record(&db, user_id.as_str()).await {
                Ok(record) => on_stats(canonical_stats(record.as_ref())),
                Err(err) => {
                    warn!(?err, user_id = %user_id, "stats read failed; ending subscription");
                    break;
                }
            }
        }
        debug!(user_id = %user_id, "stats subscription finished");
    });

    Ok(StatsSubscription { task: Some(task) })
}
