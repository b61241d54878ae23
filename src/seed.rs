//! Demo catalogue and accounts for a fresh installation.

use crate::clock::Clock;
use crate::model::account::{NewUser, Role, Subscription};
use crate::model::ctf::{ChallengeDifficulty, NewCtfChallenge};
use crate::model::lab::{LabDifficulty, NewLab};
use crate::scoring::flag::hash_flag;
use crate::scoring::{CoreError, ledger, progress};
use crate::store::Store;
use tracing::info;

struct DemoLab {
    title: &'static str,
    description: &'static str,
    difficulty: LabDifficulty,
    category: &'static str,
    points: i32,
    minutes: i32,
    flag: &'static str,
    active: bool,
}

struct DemoChallenge {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    points: i32,
    difficulty: ChallengeDifficulty,
    flag: &'static str,
}

const LABS: &[DemoLab] = &[
    DemoLab {
        title: "Linux Basics",
        description: "Core Linux commands and working with the file system",
        difficulty: LabDifficulty::Beginner,
        category: "linux",
        points: 10,
        minutes: 60,
        flag: "CSIB{7a57a5a743894a0e}",
        active: true,
    },
    DemoLab {
        title: "Network Reconnaissance with Nmap",
        description: "Network scanning tools in practice",
        difficulty: LabDifficulty::Beginner,
        category: "networking",
        points: 15,
        minutes: 90,
        flag: "CSIB{4a2d2a947444a0e4}",
        active: true,
    },
    DemoLab {
        title: "SQL Injection",
        description: "Finding and exploiting SQL injections",
        difficulty: LabDifficulty::Intermediate,
        category: "web",
        points: 25,
        minutes: 120,
        flag: "CSIB{8c6976e5b5410415}",
        active: true,
    },
    DemoLab {
        title: "XSS Attacks",
        description: "How cross-site scripting works",
        difficulty: LabDifficulty::Intermediate,
        category: "web",
        points: 30,
        minutes: 150,
        flag: "CSIB{3d56a7d7e0b5c8e5}",
        active: true,
    },
    DemoLab {
        title: "Buffer Overflow",
        description: "Exploiting a stack buffer overflow",
        difficulty: LabDifficulty::Advanced,
        category: "pwn",
        points: 50,
        minutes: 180,
        flag: "CSIB{9b3b9b3b9b3b9b3b}",
        active: false,
    },
    DemoLab {
        title: "Forensics: Memory Analysis",
        description: "Investigating a memory dump",
        difficulty: LabDifficulty::Advanced,
        category: "forensics",
        points: 45,
        minutes: 150,
        flag: "CSIB{5a5a5a5a5a5a5a5a}",
        active: false,
    },
    DemoLab {
        title: "CTF: RSA Encryption",
        description: "Breaking weak RSA",
        difficulty: LabDifficulty::Ctf,
        category: "crypto",
        points: 75,
        minutes: 0,
        flag: "CSIB{6b6b6b6b6b6b6b6b}",
        active: true,
    },
    DemoLab {
        title: "CTF: Reverse Engineering",
        description: "Analysing and cracking a binary",
        difficulty: LabDifficulty::Ctf,
        category: "reverse",
        points: 100,
        minutes: 0,
        flag: "CSIB{2c2c2c2c2c2c2c2c}",
        active: false,
    },
];

const CHALLENGES: &[DemoChallenge] = &[
    DemoChallenge {
        title: "SQL Injection 101",
        description: "Find the flag through SQL injection",
        category: "web",
        points: 50,
        difficulty: ChallengeDifficulty::Easy,
        flag: "CSIB{7d5a7d5a7d5a7d5a}",
    },
    DemoChallenge {
        title: "XSS Challenge",
        description: "Pull off an XSS and grab the flag",
        category: "web",
        points: 75,
        difficulty: ChallengeDifficulty::Medium,
        flag: "CSIB{8e6b8e6b8e6b8e6b}",
    },
    DemoChallenge {
        title: "Basic Caesar Cipher",
        description: "Decrypt a Caesar-shifted text",
        category: "crypto",
        points: 30,
        difficulty: ChallengeDifficulty::Easy,
        flag: "CSIB{9f7c9f7c9f7c9f7c}",
    },
    DemoChallenge {
        title: "RSA Challenge",
        description: "Break RSA with a short key",
        category: "crypto",
        points: 150,
        difficulty: ChallengeDifficulty::Hard,
        flag: "CSIB{1a8d1a8d1a8d1a8d}",
    },
    DemoChallenge {
        title: "Memory Dump Analysis",
        description: "Find the flag in a memory dump",
        category: "forensics",
        points: 120,
        difficulty: ChallengeDifficulty::Medium,
        flag: "CSIB{2b9e2b9e2b9e2b9e}",
    },
    DemoChallenge {
        title: "Buffer Overflow",
        description: "Exploit a buffer overflow",
        category: "pwn",
        points: 200,
        difficulty: ChallengeDifficulty::Hard,
        flag: "CSIB{3c0f3c0f3c0f3c0f}",
    },
    DemoChallenge {
        title: "Reverse Me",
        description: "Analyse the binary",
        category: "reverse",
        points: 180,
        difficulty: ChallengeDifficulty::Hard,
        flag: "CSIB{4d104d104d104d10}",
    },
];

// username, email, group, subscription, role
const USERS: &[(&str, &str, &str, Subscription, Role)] = &[
    ("test_student", "test@cybersib.spt", "IB-23", Subscription::Free, Role::Student),
    ("demo", "demo@cybersib.spt", "Demo", Subscription::Free, Role::Student),
    ("ctf_champion", "champ@cybersib.spt", "IB-22", Subscription::Premium, Role::Student),
    ("admin", "admin@cybersib.spt", "Admin", Subscription::Premium, Role::Admin),
];

const CHAMPION: &str = "ctf_champion";

/// Fills an empty store with the demo catalogue and accounts. The champion
/// account solves the first three challenges and completes the first three
/// active labs through the regular scoring rules.
///
/// Returns `false` without touching anything if any lab or challenge exists.
pub fn seed_demo_data(store: &mut dyn Store, clock: &dyn Clock) -> Result<bool, CoreError> {
    if !store.list_labs()?.is_empty() || !store.list_challenges()?.is_empty() {
        info!("Catalogue already populated, skipping demo seed");
        return Ok(false);
    }

    let mut champion_id = None;
    for &(username, email, group, subscription, role) in USERS {
        let new_user = NewUser {
            subscription,
            role,
            ..NewUser::student(username, email, group, None, clock.now())
                .map_err(CoreError::ValidationFailed)?
        };
        let user = store.insert_user(&new_user)?;
        if username == CHAMPION {
            champion_id = Some(user.id);
        }
    }

    let mut active_labs = Vec::new();
    for lab in LABS {
        let inserted = store.insert_lab(&NewLab {
            title: lab.title.to_string(),
            description: lab.description.to_string(),
            difficulty: lab.difficulty,
            category: lab.category.to_string(),
            points: lab.points,
            time_estimate_minutes: lab.minutes,
            flag_hash: hash_flag(lab.flag),
            active: lab.active,
        })?;
        if lab.active {
            active_labs.push((inserted.id, lab.flag));
        }
    }

    let mut challenges = Vec::new();
    for challenge in CHALLENGES {
        let inserted = store.insert_challenge(&NewCtfChallenge {
            title: challenge.title.to_string(),
            description: challenge.description.to_string(),
            category: challenge.category.to_string(),
            difficulty: challenge.difficulty,
            points: challenge.points,
            flag_hash: hash_flag(challenge.flag),
        })?;
        challenges.push((inserted.id, challenge.flag));
    }

    if let Some(user_id) = champion_id {
        for &(challenge_id, flag) in challenges.iter().take(3) {
            ledger::submit(store, clock, user_id, challenge_id, flag)?;
        }
        for &(lab_id, flag) in active_labs.iter().take(3) {
            progress::submit(store, clock, user_id, lab_id, flag)?;
        }
    }

    info!(
        "Seeded {} users, {} labs and {} challenges",
        USERS.len(),
        LABS.len(),
        CHALLENGES.len()
    );
    Ok(true)
}
