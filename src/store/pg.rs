//! `Store` over a diesel `PgConnection`.
//!
//! Text columns are parsed into their enums when a row is read; a value that
//! does not parse surfaces as `StoreError::CorruptRow`.

use super::{Store, StoreError, StoreResult};
use crate::model::account::{Feedback, NewUser, User, UserChanges};
use crate::model::ctf::{CtfChallenge, CtfSolve, NewCtfChallenge, NewCtfSolve};
use crate::model::lab::{Lab, LabProgress, NewLab, NewLabProgress};
use crate::schema::{
    ctf_challenges::dsl as ch_dsl, ctf_solves::dsl as solves_dsl, feedback::dsl as fb_dsl,
    lab_progress::dsl as lp_dsl, labs::dsl as labs_dsl, users::dsl as users_dsl,
};
use crate::schema::{ctf_challenges, ctf_solves, feedback, lab_progress, labs, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

// rows

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    credential_hash: Option<String>,
    user_group: String,
    subscription: String,
    role: String,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            credential_hash: row.credential_hash,
            group: row.user_group,
            subscription: row.subscription.parse()?,
            role: row.role.parse()?,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
        })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
struct NewUserRow<'a> {
    username: &'a str,
    email: &'a str,
    credential_hash: Option<&'a str>,
    user_group: &'a str,
    subscription: &'a str,
    role: &'a str,
    avatar_url: Option<&'a str>,
    created_at: DateTime<Utc>,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = users)]
struct UserChangeset<'a> {
    username: Option<&'a str>,
    email: Option<&'a str>,
    user_group: Option<&'a str>,
    subscription: Option<&'static str>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = labs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct LabRow {
    id: i64,
    title: String,
    description: String,
    difficulty: String,
    category: String,
    points: i32,
    time_estimate_minutes: i32,
    flag_hash: String,
    active: bool,
}

impl TryFrom<LabRow> for Lab {
    type Error = StoreError;

    fn try_from(row: LabRow) -> Result<Self, Self::Error> {
        Ok(Lab {
            id: row.id,
            title: row.title,
            description: row.description,
            difficulty: row.difficulty.parse()?,
            category: row.category,
            points: row.points,
            time_estimate_minutes: row.time_estimate_minutes,
            flag_hash: row.flag_hash,
            active: row.active,
        })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = labs)]
struct NewLabRow<'a> {
    title: &'a str,
    description: &'a str,
    difficulty: &'static str,
    category: &'a str,
    points: i32,
    time_estimate_minutes: i32,
    flag_hash: &'a str,
    active: bool,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = lab_progress)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ProgressRow {
    id: i64,
    user_id: i64,
    lab_id: i64,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    attempts: i32,
    score: i32,
}

impl TryFrom<ProgressRow> for LabProgress {
    type Error = StoreError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        Ok(LabProgress {
            id: row.id,
            user_id: row.user_id,
            lab_id: row.lab_id,
            status: row.status.parse()?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            attempts: row.attempts,
            score: row.score,
        })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = lab_progress)]
struct NewProgressRow {
    user_id: i64,
    lab_id: i64,
    status: &'static str,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    attempts: i32,
    score: i32,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = ctf_challenges)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ChallengeRow {
    id: i64,
    title: String,
    description: String,
    category: String,
    difficulty: String,
    points: i32,
    flag_hash: String,
}

impl TryFrom<ChallengeRow> for CtfChallenge {
    type Error = StoreError;

    fn try_from(row: ChallengeRow) -> Result<Self, Self::Error> {
        Ok(CtfChallenge {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            difficulty: row.difficulty.parse()?,
            points: row.points,
            flag_hash: row.flag_hash,
        })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = ctf_challenges)]
struct NewChallengeRow<'a> {
    title: &'a str,
    description: &'a str,
    category: &'a str,
    difficulty: &'static str,
    points: i32,
    flag_hash: &'a str,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = ctf_solves)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct SolveRow {
    id: i64,
    user_id: i64,
    challenge_id: i64,
    solved_at: DateTime<Utc>,
    submitted_flag: String,
}

impl From<SolveRow> for CtfSolve {
    fn from(row: SolveRow) -> Self {
        CtfSolve {
            id: row.id,
            user_id: row.user_id,
            challenge_id: row.challenge_id,
            solved_at: row.solved_at,
            submitted_flag: row.submitted_flag,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = ctf_solves)]
struct NewSolveRow<'a> {
    user_id: i64,
    challenge_id: i64,
    solved_at: DateTime<Utc>,
    submitted_flag: &'a str,
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = feedback)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct FeedbackRow {
    id: Uuid,
    user_id: i64,
    kind: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl Store for PgConnection {
    fn table_counts(&mut self) -> StoreResult<Vec<(&'static str, i64)>> {
        Ok(vec![
            ("users", users_dsl::users.count().get_result::<i64>(self)?),
            ("labs", labs_dsl::labs.count().get_result::<i64>(self)?),
            ("lab_progress", lp_dsl::lab_progress.count().get_result::<i64>(self)?),
            ("ctf_challenges", ch_dsl::ctf_challenges.count().get_result::<i64>(self)?),
            ("ctf_solves", solves_dsl::ctf_solves.count().get_result::<i64>(self)?),
        ])
    }

    fn find_user(&mut self, user_id: i64) -> StoreResult<Option<User>> {
        users_dsl::users
            .find(user_id)
            .select(UserRow::as_select())
            .first::<UserRow>(self)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn lock_user(&mut self, user_id: i64) -> StoreResult<Option<User>> {
        users_dsl::users
            .find(user_id)
            .select(UserRow::as_select())
            .for_update()
            .first::<UserRow>(self)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        users_dsl::users
            .filter(users_dsl::username.eq(username))
            .select(UserRow::as_select())
            .first::<UserRow>(self)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        users_dsl::users
            .filter(users_dsl::email.eq(email))
            .select(UserRow::as_select())
            .first::<UserRow>(self)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let row = NewUserRow {
            username: &user.username,
            email: &user.email,
            credential_hash: user.credential_hash.as_deref(),
            user_group: &user.group,
            subscription: user.subscription.as_str(),
            role: user.role.as_str(),
            avatar_url: user.avatar_url.as_deref(),
            created_at: user.created_at,
        };
        diesel::insert_into(users_dsl::users)
            .values(&row)
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(self)?
            .try_into()
    }

    fn update_user(&mut self, user_id: i64, changes: &UserChanges) -> StoreResult<User> {
        if changes.is_empty() {
            return self
                .find_user(user_id)?
                .ok_or(StoreError::Database(diesel::result::Error::NotFound));
        }
        let changeset = UserChangeset {
            username: changes.username.as_deref(),
            email: changes.email.as_deref(),
            user_group: changes.group.as_deref(),
            subscription: changes.subscription.map(|s| s.as_str()),
        };
        diesel::update(users_dsl::users.find(user_id))
            .set(&changeset)
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(self)?
            .try_into()
    }

    fn list_users(&mut self) -> StoreResult<Vec<User>> {
        let rows = users_dsl::users
            .order((users_dsl::created_at.asc(), users_dsl::id.asc()))
            .select(UserRow::as_select())
            .load::<UserRow>(self)?;
        convert_all(rows)
    }

    fn insert_lab(&mut self, lab: &NewLab) -> StoreResult<Lab> {
        let row = NewLabRow {
            title: &lab.title,
            description: &lab.description,
            difficulty: lab.difficulty.as_str(),
            category: &lab.category,
            points: lab.points,
            time_estimate_minutes: lab.time_estimate_minutes,
            flag_hash: &lab.flag_hash,
            active: lab.active,
        };
        diesel::insert_into(labs_dsl::labs)
            .values(&row)
            .returning(LabRow::as_returning())
            .get_result::<LabRow>(self)?
            .try_into()
    }

    fn find_lab(&mut self, lab_id: i64) -> StoreResult<Option<Lab>> {
        labs_dsl::labs
            .find(lab_id)
            .select(LabRow::as_select())
            .first::<LabRow>(self)
            .optional()?
            .map(Lab::try_from)
            .transpose()
    }

    fn list_labs(&mut self) -> StoreResult<Vec<Lab>> {
        let rows = labs_dsl::labs
            .order(labs_dsl::id.asc())
            .select(LabRow::as_select())
            .load::<LabRow>(self)?;
        convert_all(rows)
    }

    fn find_progress(&mut self, user_id: i64, lab_id: i64) -> StoreResult<Option<LabProgress>> {
        lp_dsl::lab_progress
            .filter(lp_dsl::user_id.eq(user_id))
            .filter(lp_dsl::lab_id.eq(lab_id))
            .select(ProgressRow::as_select())
            .first::<ProgressRow>(self)
            .optional()?
            .map(LabProgress::try_from)
            .transpose()
    }

    fn insert_progress(&mut self, row: &NewLabProgress) -> StoreResult<LabProgress> {
        let new_row = NewProgressRow {
            user_id: row.user_id,
            lab_id: row.lab_id,
            status: row.status.as_str(),
            started_at: row.started_at,
            completed_at: row.completed_at,
            attempts: row.attempts,
            score: row.score,
        };
        diesel::insert_into(lp_dsl::lab_progress)
            .values(&new_row)
            .returning(ProgressRow::as_returning())
            .get_result::<ProgressRow>(self)?
            .try_into()
    }

    fn update_progress(&mut self, row: &LabProgress) -> StoreResult<LabProgress> {
        diesel::update(lp_dsl::lab_progress.find(row.id))
            .set((
                lp_dsl::status.eq(row.status.as_str()),
                lp_dsl::completed_at.eq(row.completed_at),
                lp_dsl::attempts.eq(row.attempts),
                lp_dsl::score.eq(row.score),
            ))
            .returning(ProgressRow::as_returning())
            .get_result::<ProgressRow>(self)?
            .try_into()
    }

    fn list_progress(&mut self, user_id: Option<i64>) -> StoreResult<Vec<LabProgress>> {
        let mut query = lp_dsl::lab_progress
            .order(lp_dsl::id.asc())
            .select(ProgressRow::as_select())
            .into_boxed();
        if let Some(user_id) = user_id {
            query = query.filter(lp_dsl::user_id.eq(user_id));
        }
        convert_all(query.load::<ProgressRow>(self)?)
    }

    fn insert_challenge(&mut self, challenge: &NewCtfChallenge) -> StoreResult<CtfChallenge> {
        let row = NewChallengeRow {
            title: &challenge.title,
            description: &challenge.description,
            category: &challenge.category,
            difficulty: challenge.difficulty.as_str(),
            points: challenge.points,
            flag_hash: &challenge.flag_hash,
        };
        diesel::insert_into(ch_dsl::ctf_challenges)
            .values(&row)
            .returning(ChallengeRow::as_returning())
            .get_result::<ChallengeRow>(self)?
            .try_into()
    }

    fn find_challenge(&mut self, challenge_id: i64) -> StoreResult<Option<CtfChallenge>> {
        ch_dsl::ctf_challenges
            .find(challenge_id)
            .select(ChallengeRow::as_select())
            .first::<ChallengeRow>(self)
            .optional()?
            .map(CtfChallenge::try_from)
            .transpose()
    }

    fn list_challenges(&mut self) -> StoreResult<Vec<CtfChallenge>> {
        let rows = ch_dsl::ctf_challenges
            .order(ch_dsl::id.asc())
            .select(ChallengeRow::as_select())
            .load::<ChallengeRow>(self)?;
        convert_all(rows)
    }

    fn find_solve(&mut self, user_id: i64, challenge_id: i64) -> StoreResult<Option<CtfSolve>> {
        let row = solves_dsl::ctf_solves
            .filter(solves_dsl::user_id.eq(user_id))
            .filter(solves_dsl::challenge_id.eq(challenge_id))
            .select(SolveRow::as_select())
            .first::<SolveRow>(self)
            .optional()?;
        Ok(row.map(CtfSolve::from))
    }

    fn insert_solve(&mut self, solve: &NewCtfSolve) -> StoreResult<CtfSolve> {
        let row = NewSolveRow {
            user_id: solve.user_id,
            challenge_id: solve.challenge_id,
            solved_at: solve.solved_at,
            submitted_flag: &solve.submitted_flag,
        };
        let inserted = diesel::insert_into(solves_dsl::ctf_solves)
            .values(&row)
            .returning(SolveRow::as_returning())
            .get_result::<SolveRow>(self)?;
        Ok(CtfSolve::from(inserted))
    }

    fn count_solves(&mut self, challenge_id: i64) -> StoreResult<i64> {
        Ok(solves_dsl::ctf_solves
            .filter(solves_dsl::challenge_id.eq(challenge_id))
            .count()
            .get_result(self)?)
    }

    fn list_solves(&mut self, user_id: Option<i64>) -> StoreResult<Vec<CtfSolve>> {
        let mut query = solves_dsl::ctf_solves
            .order(solves_dsl::id.asc())
            .select(SolveRow::as_select())
            .into_boxed();
        if let Some(user_id) = user_id {
            query = query.filter(solves_dsl::user_id.eq(user_id));
        }
        Ok(query.load::<SolveRow>(self)?.into_iter().map(CtfSolve::from).collect())
    }

    fn insert_feedback(&mut self, entry: &Feedback) -> StoreResult<Feedback> {
        let row = FeedbackRow {
            id: entry.id,
            user_id: entry.user_id,
            kind: entry.kind.clone(),
            message: entry.message.clone(),
            status: entry.status.clone(),
            created_at: entry.created_at,
        };
        let stored = diesel::insert_into(fb_dsl::feedback)
            .values(&row)
            .returning(FeedbackRow::as_returning())
            .get_result::<FeedbackRow>(self)?;
        Ok(Feedback {
            id: stored.id,
            user_id: stored.user_id,
            kind: stored.kind,
            message: stored.message,
            status: stored.status,
            created_at: stored.created_at,
        })
    }
}
