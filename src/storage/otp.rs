//! OTP state persistence.
//!
//! Redis key pattern:
//! - `otp:{user_id}` — OtpState (JSON), no TTL (expiry is checked lazily
//!   against the embedded timestamp, never by Redis eviction)
//!
//! Concurrent logins, resends, and verifies race on read-modify-write of
//! the same record, so every write goes through a compare-and-swap Lua
//! script keyed on the record's `version` field. The loser of a race gets
//! `false` back and must re-read. This is the single-writer-per-user
//! guarantee the OTP invariants rely on.
//!
//! Code values are sensitive; JSON read from Redis is wrapped in
//! `Zeroizing` like the other secret-bearing records.

use crate::models::OtpState;
use redis::AsyncCommands;
use zeroize::Zeroizing;

/// Create the empty OTP state for a user if it does not exist yet.
///
/// Part of the user-creation workflow: registration calls this explicitly
/// right after storing the user record.
pub async fn init_state<C>(con: &mut C, user_id: &str) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("otp:{}", user_id);
    let json = serde_json::to_string(&OtpState::empty())
        .map_err(|e| super::json_err("JSON serialize", e))?;

    // NX: never clobber live state on re-registration attempts
    con.set_nx::<_, _, ()>(&key, json).await?;
    Ok(())
}

/// Get a user's OTP state.
pub async fn get_state<C>(
    con: &mut C,
    user_id: &str,
) -> Result<Option<OtpState>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("otp:{}", user_id);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let state = serde_json::from_str(&zeroizing_data)
                .map_err(|e| super::json_err("JSON deserialize", e))?;
            Ok(Some(state))
        }
        None => Ok(None),
    }
}

/// Compare-and-swap write of a user's OTP state.
///
/// `state.version` must already be bumped past `expected_version` (the
/// version of the snapshot the caller mutated). The Lua script applies the
/// write only if the stored version still matches the snapshot; a missing
/// key is treated as version 0. Returns false when the caller lost the
/// race and must re-read.
pub async fn put_state_versioned<C>(
    con: &mut C,
    user_id: &str,
    state: &OtpState,
    expected_version: u64,
) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("otp:{}", user_id);
    let json = serde_json::to_string(state).map_err(|e| super::json_err("JSON serialize", e))?;

    let script = redis::Script::new(
        r"
        local current = 0
        local val = redis.call('GET', KEYS[1])
        if val then
            current = cjson.decode(val).version
        end
        if current ~= tonumber(ARGV[1]) then
            return 0
        end
        redis.call('SET', KEYS[1], ARGV[2])
        return 1
        ",
    );

    let applied: i32 = script
        .key(&key)
        .arg(expected_version)
        .arg(json)
        .invoke_async(con)
        .await?;

    Ok(applied == 1)
}

/// Read-mutate-write with CAS, retrying once on a lost race.
///
/// `mutate` returns `Ok(())` to commit the new state or an error to abort
/// without writing. A missing record is treated as the empty state, so a
/// user whose OTP record was never initialized still gets a consistent
/// Empty -> Active transition.
pub async fn update_state<C, F, E>(
    con: &mut C,
    user_id: &str,
    mut mutate: F,
) -> Result<Result<OtpState, E>, redis::RedisError>
where
    C: AsyncCommands,
    F: FnMut(&mut OtpState) -> Result<(), E>,
{
    // Two attempts: a lost race means someone else just wrote, and their
    // write is visible on the immediate re-read.
    for _ in 0..2 {
        let Some(mut state) = get_state(con, user_id).await? else {
            // Treat missing state as empty; registration normally creates it.
            let mut state = OtpState::empty();
            match mutate(&mut state) {
                Ok(()) => {
                    state.version += 1;
                    if put_state_versioned(con, user_id, &state, 0).await? {
                        return Ok(Ok(state));
                    }
                    continue;
                }
                Err(e) => return Ok(Err(e)),
            }
        };

        let snapshot_version = state.version;
        match mutate(&mut state) {
            Ok(()) => {
                state.version = snapshot_version + 1;
                if put_state_versioned(con, user_id, &state, snapshot_version).await? {
                    return Ok(Ok(state));
                }
            }
            Err(e) => return Ok(Err(e)),
        }
    }

    Err(super::json_err(
        "OTP state contention",
        format!("concurrent updates for user {}", user_id),
    ))
}
