//! Read-only aggregates over the lab progress and CTF solve ledgers.
//!
//! Everything is computed from the ledger rows on each call; there is no
//! stored points counter to drift out of sync.

use super::rank::rank_of;
use super::{CoreError, ScoringConfig, require_user};
use crate::clock::Clock;
use crate::model::account::User;
use crate::model::ctf::{CtfChallenge, CtfSolve};
use crate::model::lab::{LabProgress, ProgressStatus};
use crate::model::stats::{
    ActivityKind, CategoryBreakdown, CtfStats, DifficultyBreakdown, LabDifficultyProgress,
    LeaderboardEntry, PlatformOverview, RecentActivity, SubscriptionCount, UserProgressReport,
    UserStats, WeeklyActivity,
};
use crate::store::Store;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const MAX_WEEKS: u32 = 52;

struct Totals {
    completed_labs: i64,
    lab_points: i64,
    ctf_points: i64,
    solved_count: i64,
}

impl Totals {
    fn of(progress: &[LabProgress], solves: &[CtfSolve], points: &HashMap<i64, i64>) -> Self {
        let completed: Vec<&LabProgress> = progress.iter().filter(|p| p.is_completed()).collect();
        Totals {
            completed_labs: completed.len() as i64,
            lab_points: completed.iter().map(|p| i64::from(p.score)).sum(),
            ctf_points: solves
                .iter()
                .map(|s| points.get(&s.challenge_id).copied().unwrap_or(0))
                .sum(),
            solved_count: solves.len() as i64,
        }
    }

    fn total(&self) -> i64 {
        self.lab_points + self.ctf_points
    }
}

fn challenge_points(challenges: &[CtfChallenge]) -> HashMap<i64, i64> {
    challenges
        .iter()
        .map(|c| (c.id, i64::from(c.points)))
        .collect()
}

pub fn user_stats(store: &mut dyn Store, user_id: i64) -> Result<UserStats, CoreError> {
    require_user(store, user_id)?;
    let progress = store.list_progress(Some(user_id))?;
    let solves = store.list_solves(Some(user_id))?;
    let points = challenge_points(&store.list_challenges()?);

    let totals = Totals::of(&progress, &solves, &points);
    Ok(UserStats {
        completed_labs: totals.completed_labs,
        lab_points: totals.lab_points,
        ctf_points: totals.ctf_points,
        total_points: totals.total(),
        rank: rank_of(totals.total()),
    })
}

/// Users ordered by total points, then CTF solves, then registration order.
pub fn leaderboard(store: &mut dyn Store, limit: usize) -> Result<Vec<LeaderboardEntry>, CoreError> {
    let users = store.list_users()?;
    let progress = store.list_progress(None)?;
    let solves = store.list_solves(None)?;
    let points = challenge_points(&store.list_challenges()?);

    let mut progress_by_user: HashMap<i64, Vec<LabProgress>> = HashMap::new();
    for row in progress {
        progress_by_user.entry(row.user_id).or_default().push(row);
    }
    let mut solves_by_user: HashMap<i64, Vec<CtfSolve>> = HashMap::new();
    for solve in solves {
        solves_by_user.entry(solve.user_id).or_default().push(solve);
    }

    let mut scored: Vec<(User, Totals)> = users
        .into_iter()
        .map(|user| {
            let totals = Totals::of(
                progress_by_user.get(&user.id).map(Vec::as_slice).unwrap_or(&[]),
                solves_by_user.get(&user.id).map(Vec::as_slice).unwrap_or(&[]),
                &points,
            );
            (user, totals)
        })
        .collect();

    // stable: equal keys keep registration order from list_users
    scored.sort_by(|(_, a), (_, b)| {
        b.total()
            .cmp(&a.total())
            .then(b.solved_count.cmp(&a.solved_count))
    });

    Ok(scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, (user, totals))| LeaderboardEntry {
            position: index + 1,
            user_id: user.id,
            username: user.username,
            group: user.group,
            avatar_url: user.avatar_url,
            total_points: totals.total(),
            solved_count: totals.solved_count,
            rank_title: rank_of(totals.total()),
        })
        .collect())
}

pub fn category_breakdown(
    store: &mut dyn Store,
    user_id: i64,
) -> Result<Vec<CategoryBreakdown>, CoreError> {
    require_user(store, user_id)?;
    let solved = solved_ids(store, user_id)?;

    let mut rows: BTreeMap<String, CategoryBreakdown> = BTreeMap::new();
    for challenge in store.list_challenges()? {
        let row = rows
            .entry(challenge.category.clone())
            .or_insert_with(|| CategoryBreakdown {
                category: challenge.category.clone(),
                solved: 0,
                total: 0,
                total_points_available: 0,
                points_earned: 0,
            });
        row.total += 1;
        row.total_points_available += i64::from(challenge.points);
        if solved.contains(&challenge.id) {
            row.solved += 1;
            row.points_earned += i64::from(challenge.points);
        }
    }
    Ok(rows.into_values().collect())
}

pub fn difficulty_breakdown(
    store: &mut dyn Store,
    user_id: i64,
) -> Result<Vec<DifficultyBreakdown>, CoreError> {
    require_user(store, user_id)?;
    let solved = solved_ids(store, user_id)?;

    let mut rows = BTreeMap::new();
    for challenge in store.list_challenges()? {
        let row = rows
            .entry(challenge.difficulty)
            .or_insert_with(|| DifficultyBreakdown {
                difficulty: challenge.difficulty,
                solved: 0,
                total: 0,
                points: 0,
                points_earned: 0,
            });
        row.total += 1;
        row.points += i64::from(challenge.points);
        if solved.contains(&challenge.id) {
            row.solved += 1;
            row.points_earned += i64::from(challenge.points);
        }
    }
    Ok(rows.into_values().collect())
}

pub fn ctf_stats(store: &mut dyn Store, user_id: i64) -> Result<CtfStats, CoreError> {
    let by_category = category_breakdown(store, user_id)?;
    let by_difficulty = difficulty_breakdown(store, user_id)?;
    Ok(CtfStats {
        solved_count: by_category.iter().map(|c| c.solved).sum(),
        total_points: by_category.iter().map(|c| c.points_earned).sum(),
        categories_count: by_category.iter().filter(|c| c.solved > 0).count() as i64,
        by_category,
        by_difficulty,
    })
}

fn solved_ids(store: &mut dyn Store, user_id: i64) -> Result<HashSet<i64>, CoreError> {
    Ok(store
        .list_solves(Some(user_id))?
        .into_iter()
        .map(|s| s.challenge_id)
        .collect())
}

/// Splits the trailing `weeks * 7` days into 7-day windows `(start, end]`,
/// oldest first, the last one ending at the clock's current time.
pub fn weekly_activity(
    store: &mut dyn Store,
    clock: &dyn Clock,
    user_id: i64,
    weeks: u32,
) -> Result<Vec<WeeklyActivity>, CoreError> {
    if weeks == 0 || weeks > MAX_WEEKS {
        return Err(CoreError::ValidationFailed(format!(
            "weeks must be between 1 and {}, got {}.",
            MAX_WEEKS, weeks
        )));
    }
    require_user(store, user_id)?;
    let progress = store.list_progress(Some(user_id))?;
    let solves = store.list_solves(Some(user_id))?;
    let points = challenge_points(&store.list_challenges()?);
    let now = clock.now();

    let windows = (0..weeks)
        .rev()
        .map(|weeks_back| {
            let week_end = now - Duration::weeks(i64::from(weeks_back));
            let week_start = week_end - Duration::weeks(1);
            let within = |t: DateTime<Utc>| t > week_start && t <= week_end;

            let completed: Vec<&LabProgress> = progress
                .iter()
                .filter(|p| p.is_completed() && p.completed_at.is_some_and(within))
                .collect();
            let solved: Vec<&CtfSolve> = solves.iter().filter(|s| within(s.solved_at)).collect();

            let lab_points: i64 = completed.iter().map(|p| i64::from(p.score)).sum();
            let ctf_points: i64 = solved
                .iter()
                .map(|s| points.get(&s.challenge_id).copied().unwrap_or(0))
                .sum();

            WeeklyActivity {
                week_start,
                week_end,
                labs_completed: completed.len() as i64,
                ctf_solved: solved.len() as i64,
                points_earned: lab_points + ctf_points,
            }
        })
        .collect();
    Ok(windows)
}

pub fn platform_overview(
    store: &mut dyn Store,
    clock: &dyn Clock,
    active_window_days: i64,
) -> Result<PlatformOverview, CoreError> {
    let now = clock.now();
    let active_since = now - Duration::days(active_window_days);

    let users = store.list_users()?;
    let progress = store.list_progress(None)?;
    let labs = store.list_labs()?;
    let challenges = store.list_challenges()?;
    let solves = store.list_solves(None)?;

    let active_users: HashSet<i64> = progress
        .iter()
        .filter(|p| p.started_at > active_since)
        .map(|p| p.user_id)
        .collect();

    let mut subscriptions = BTreeMap::new();
    for user in &users {
        *subscriptions.entry(user.subscription).or_insert(0i64) += 1;
    }

    Ok(PlatformOverview {
        total_users: users.len() as i64,
        active_users_last_7_days: active_users.len() as i64,
        total_active_labs: labs.iter().filter(|l| l.active).count() as i64,
        total_labs_completed: progress.iter().filter(|p| p.is_completed()).count() as i64,
        total_challenges: challenges.len() as i64,
        total_solves: solves.len() as i64,
        subscription_distribution: subscriptions
            .into_iter()
            .map(|(subscription, count)| SubscriptionCount {
                subscription,
                count,
            })
            .collect(),
        generated_at: now,
    })
}

/// Per-difficulty progress over the active labs.
pub fn lab_difficulty_progress(
    store: &mut dyn Store,
    user_id: i64,
) -> Result<Vec<LabDifficultyProgress>, CoreError> {
    require_user(store, user_id)?;
    let progress = store.list_progress(Some(user_id))?;

    let mut rows = BTreeMap::new();
    let mut scores: BTreeMap<_, Vec<i32>> = BTreeMap::new();
    for lab in store.list_labs()?.into_iter().filter(|l| l.active) {
        let row = rows
            .entry(lab.difficulty)
            .or_insert_with(|| LabDifficultyProgress {
                difficulty: lab.difficulty,
                labs: 0,
                started: 0,
                completed: 0,
                avg_score: 0.0,
            });
        row.labs += 1;
        if let Some(p) = progress.iter().find(|p| p.lab_id == lab.id) {
            row.started += 1;
            if p.is_completed() {
                row.completed += 1;
            }
            scores.entry(lab.difficulty).or_default().push(p.score);
        }
    }

    for (difficulty, row) in rows.iter_mut() {
        if let Some(values) = scores.get(difficulty) {
            let sum: i64 = values.iter().map(|&s| i64::from(s)).sum();
            row.avg_score = sum as f64 / values.len() as f64;
        }
    }
    Ok(rows.into_values().collect())
}

/// Latest lab and CTF events for a user, newest first.
pub fn recent_activity(
    store: &mut dyn Store,
    user_id: i64,
    limit: usize,
) -> Result<Vec<RecentActivity>, CoreError> {
    require_user(store, user_id)?;
    let labs: HashMap<i64, String> = store
        .list_labs()?
        .into_iter()
        .map(|l| (l.id, l.title))
        .collect();
    let challenges: HashMap<i64, CtfChallenge> = store
        .list_challenges()?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let mut events: Vec<RecentActivity> = store
        .list_progress(Some(user_id))?
        .into_iter()
        .map(|p| RecentActivity {
            kind: ActivityKind::Lab,
            title: labs.get(&p.lab_id).cloned().unwrap_or_default(),
            status: p.status,
            timestamp: p.completed_at.unwrap_or(p.started_at),
            score: i64::from(p.score),
        })
        .collect();
    events.extend(store.list_solves(Some(user_id))?.into_iter().map(|s| {
        let challenge = challenges.get(&s.challenge_id);
        RecentActivity {
            kind: ActivityKind::Ctf,
            title: challenge.map(|c| c.title.clone()).unwrap_or_default(),
            status: ProgressStatus::Completed,
            timestamp: s.solved_at,
            score: challenge.map(|c| i64::from(c.points)).unwrap_or(0),
        }
    }));

    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events.truncate(limit);
    Ok(events)
}

pub fn user_progress_report(
    store: &mut dyn Store,
    clock: &dyn Clock,
    user_id: i64,
    config: &ScoringConfig,
) -> Result<UserProgressReport, CoreError> {
    Ok(UserProgressReport {
        lab_progress: lab_difficulty_progress(store, user_id)?,
        recent_activity: recent_activity(store, user_id, config.recent_activity_limit)?,
        weekly_progress: weekly_activity(store, clock, user_id, config.weekly_default_weeks)?,
        calculated_at: clock.now(),
    })
}
