use crate::clock::ManualClock;
use crate::model::account::{NewUser, User};
use crate::model::ctf::{ChallengeDifficulty, CtfChallenge, NewCtfChallenge};
use crate::model::lab::{Lab, LabDifficulty, NewLab};
use crate::scoring::flag::hash_flag;
use crate::store::Store;
use crate::store::memory::MemoryTables;
use chrono::{DateTime, TimeZone, Utc};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

pub fn clock() -> ManualClock {
    ManualClock::new(epoch())
}

pub fn tables() -> MemoryTables {
    MemoryTables::default()
}

pub fn student(store: &mut dyn Store, username: &str) -> User {
    let new_user = NewUser::student(
        username,
        &format!("{}@cybersib.test", username),
        "IB-23",
        None,
        epoch(),
    )
    .unwrap();
    store.insert_user(&new_user).unwrap()
}

pub fn lab(store: &mut dyn Store, points: i32, flag: &str, active: bool) -> Lab {
    lab_in(store, LabDifficulty::Beginner, "linux", points, flag, active)
}

pub fn lab_in(
    store: &mut dyn Store,
    difficulty: LabDifficulty,
    category: &str,
    points: i32,
    flag: &str,
    active: bool,
) -> Lab {
    store
        .insert_lab(&NewLab {
            title: format!("{} lab worth {}", category, points),
            description: "test lab".to_string(),
            difficulty,
            category: category.to_string(),
            points,
            time_estimate_minutes: 30,
            flag_hash: hash_flag(flag),
            active,
        })
        .unwrap()
}

pub fn challenge(
    store: &mut dyn Store,
    category: &str,
    difficulty: ChallengeDifficulty,
    points: i32,
    flag: &str,
) -> CtfChallenge {
    store
        .insert_challenge(&NewCtfChallenge {
            title: format!("{} challenge worth {}", category, points),
            description: "test challenge".to_string(),
            category: category.to_string(),
            difficulty,
            points,
            flag_hash: hash_flag(flag),
        })
        .unwrap()
}
