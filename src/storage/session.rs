//! Session and refresh-token Redis operations.
//!
//! Redis key patterns:
//! - `session:{token}` — session data (JSON), TTL-bound
//! - `user_sessions:{user_id}` — SET of session tokens for cleanup
//! - `refresh:{jti}` — refresh-token record (JSON), TTL-bound
//!
//! Session and refresh JSON read back from Redis is wrapped in `zeroize`'s
//! `Zeroizing` so token material doesn't linger in application memory.
//! Redis keeps its own copy; this protects the Rust side only.

use crate::models::{StoredRefresh, StoredSession};
use redis::AsyncCommands;
use zeroize::Zeroizing;

/// Store a session in Redis with TTL.
///
/// Also adds the session token to the user's session tracking set
/// (`user_sessions:{user_id}`) so logout-everywhere stays O(sessions).
pub async fn store_session<C>(
    con: &mut C,
    session: &StoredSession,
    ttl_secs: u64,
) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let session_key = format!("session:{}", session.token);
    let user_sessions_key = format!("user_sessions:{}", session.user_id);

    let json = serde_json::to_string(session).map_err(|e| super::json_err("JSON serialize", e))?;

    con.set_ex::<_, _, ()>(&session_key, json, ttl_secs).await?;

    con.sadd::<_, _, ()>(&user_sessions_key, &session.token)
        .await?;
    // Keep the set alive at least as long as the session
    con.expire::<_, ()>(&user_sessions_key, ttl_secs as i64)
        .await?;

    Ok(())
}

/// Get a session by token.
pub async fn get_session<C>(
    con: &mut C,
    token: &str,
) -> Result<Option<StoredSession>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("session:{}", token);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let session = serde_json::from_str(&zeroizing_data)
                .map_err(|e| super::json_err("JSON deserialize", e))?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

/// Delete a session from Redis.
///
/// Also removes the token from the user's session tracking set.
/// Returns true if the session was deleted, false if it didn't exist.
pub async fn delete_session<C>(
    con: &mut C,
    token: &str,
    user_id: &str,
) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("session:{}", token);
    let deleted: i32 = con.del(&key).await?;

    let user_sessions_key = format!("user_sessions:{}", user_id);
    con.srem::<_, _, ()>(&user_sessions_key, token).await?;

    Ok(deleted > 0)
}

/// Delete all sessions for a user.
pub async fn delete_user_sessions<C>(con: &mut C, user_id: &str) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let user_sessions_key = format!("user_sessions:{}", user_id);

    let tokens: Vec<String> = con.smembers(&user_sessions_key).await?;

    for token in &tokens {
        let session_key = format!("session:{}", token);
        con.del::<_, ()>(&session_key).await?;
    }

    con.del::<_, ()>(&user_sessions_key).await?;

    Ok(())
}

/// Store a refresh-token record with TTL.
pub async fn store_refresh<C>(
    con: &mut C,
    refresh: &StoredRefresh,
    ttl_secs: u64,
) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("refresh:{}", refresh.jti);
    let json = serde_json::to_string(refresh).map_err(|e| super::json_err("JSON serialize", e))?;

    con.set_ex::<_, _, ()>(&key, json, ttl_secs).await?;
    Ok(())
}

/// Get and delete a refresh-token record atomically (rotation).
///
/// Uses a Lua script so two concurrent refresh calls can't both succeed
/// with the same token.
pub async fn take_refresh<C>(
    con: &mut C,
    jti: &str,
) -> Result<Option<StoredRefresh>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("refresh:{}", jti);

    // Lua script for atomic GET + DEL
    let script = redis::Script::new(
        r"
        local val = redis.call('GET', KEYS[1])
        if val then
            redis.call('DEL', KEYS[1])
        end
        return val
        ",
    );

    let json: Option<String> = script.key(&key).invoke_async(con).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let refresh = serde_json::from_str(&zeroizing_data)
                .map_err(|e| super::json_err("JSON deserialize", e))?;
            Ok(Some(refresh))
        }
        None => Ok(None),
    }
}
