use tracing::info;

use sidequest_core::{AuthSession, Data};
use sidequest_engine::{
    QuestCompletion, apply_quest_completion, fetch_user_stats, subscribe_to_user_stats,
    title_for_stats, xp_for_completion,
};
use sidequest_utils::formatting::format_stats_summary;
use sidequest_utils::progression::{MAX_DIFFICULTY, MIN_DIFFICULTY};

pub async fn complete(
    data: &Data,
    session: &AuthSession,
    category: &str,
    difficulty: Option<f64>,
) -> anyhow::Result<()> {
    let reward =
        apply_quest_completion(&data.db, session, QuestCompletion::new(category, difficulty))
            .await?;

    println!("+{} XP ({})", reward.xp_gained, reward.category);
    if reward.created {
        println!("Welcome aboard! Your stats record has been created.");
    }

    Ok(())
}

pub async fn stats(data: &Data, session: &AuthSession) -> anyhow::Result<()> {
    let user_id = session.require_user()?;
    let stats = fetch_user_stats(&data.db, user_id).await?;
    println!("{}", format_stats_summary(&stats));
    Ok(())
}

pub async fn title(data: &Data, session: &AuthSession) -> anyhow::Result<()> {
    let user_id = session.require_user()?;
    let stats = fetch_user_stats(&data.db, user_id).await?;
    println!("{}", title_for_stats(&stats));
    Ok(())
}

pub async fn watch(data: &Data, session: &AuthSession) -> anyhow::Result<()> {
    let user_id = session.require_user()?;
    let subscription = subscribe_to_user_stats(&data.db, Some(user_id), |stats| {
        println!("{}\n", format_stats_summary(&stats));
    })
    .await?;

    info!(user_id = %user_id, "Watching stats; press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;
    subscription.unsubscribe();

    Ok(())
}

pub fn rewards() {
    for difficulty in MIN_DIFFICULTY..=MAX_DIFFICULTY {
        println!(
            "difficulty {difficulty}: {} XP",
            xp_for_completion(f64::from(difficulty))
        );
    }
}
