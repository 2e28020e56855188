//! User Redis operations.
//!
//! Redis key patterns:
//! - `user:{nanoid}` — individual user data (JSON)
//! - `phone:{e164}` — phone lookup to user_id (STRING)
//!
//! Users are permanent records (no TTL). Phone numbers are unique: the
//! lookup key doubles as the uniqueness guard.

use crate::models::StoredUser;
use redis::AsyncCommands;
use zeroize::Zeroizing;

/// Store a user record (`user:{id}`).
///
/// The phone lookup key is claimed separately via [`claim_phone`]; callers
/// must hold the claim before writing the record.
pub async fn store_user<C>(con: &mut C, user: &StoredUser) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let user_key = format!("user:{}", user.id);
    let json = serde_json::to_string(user).map_err(|e| super::json_err("JSON serialize", e))?;
    con.set::<_, _, ()>(&user_key, json).await?;
    Ok(())
}

/// Atomically claim a phone number for a user.
///
/// SET NX on `phone:{e164}`: the lookup key doubles as the uniqueness
/// guard, so concurrent registrations of the same number resolve
/// first-writer-wins. Returns false when the number is already held.
pub async fn claim_phone<C>(
    con: &mut C,
    phone: &str,
    user_id: &str,
) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let phone_key = format!("phone:{}", phone);
    let claimed: bool = con.set_nx(&phone_key, user_id).await?;
    Ok(claimed)
}

/// Get a user by ID.
///
/// The user JSON is zeroized after deserialization.
pub async fn get_user<C>(con: &mut C, id: &str) -> Result<Option<StoredUser>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("user:{}", id);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let user = serde_json::from_str(&zeroizing_data)
                .map_err(|e| super::json_err("JSON deserialize", e))?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// Get a user by phone number.
///
/// Performs a two-step lookup: phone -> user_id -> user data.
pub async fn get_user_by_phone<C>(
    con: &mut C,
    phone: &str,
) -> Result<Option<StoredUser>, redis::RedisError>
where
    C: AsyncCommands,
{
    let phone_key = format!("phone:{}", phone);
    let user_id: Option<String> = con.get(&phone_key).await?;

    match user_id {
        Some(id) => get_user(con, &id).await,
        None => Ok(None),
    }
}

/// Persist an updated user record.
///
/// `previous_phone` keeps the lookup keys in sync when the phone number
/// changed: the stale key is dropped after the record is written. The new
/// number must already be claimed via [`claim_phone`].
pub async fn update_user<C>(
    con: &mut C,
    user: &StoredUser,
    previous_phone: &str,
) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    store_user(con, user).await?;
    if previous_phone != user.phone_number {
        let old_key = format!("phone:{}", previous_phone);
        con.del::<_, ()>(&old_key).await?;
    }
    Ok(())
}

/// Upsert the admin user (fixed id "admin").
///
/// Called at startup; also ensures the admin's empty OTP state exists so
/// the admin logs in through the same flow as everyone else.
pub async fn upsert_admin<C>(con: &mut C, phone: &str) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let existing = get_user(con, "admin").await?;

    let user = StoredUser {
        id: "admin".to_string(),
        phone_number: phone.to_string(),
        is_admin: true,
        last_login: existing.as_ref().and_then(|u| u.last_login),
        created_at: existing
            .as_ref()
            .map(|u| u.created_at)
            .unwrap_or_else(crate::models::unix_now),
    };

    if existing.as_ref().map(|u| u.phone_number.as_str()) != Some(phone)
        && !claim_phone(con, phone, "admin").await?
    {
        return Err(super::json_err(
            "admin phone",
            "configured admin phone is already registered to another user",
        ));
    }

    if let Some(prev) = existing {
        update_user(con, &user, &prev.phone_number).await?;
    } else {
        store_user(con, &user).await?;
    }
    super::otp::init_state(con, "admin").await?;

    Ok(())
}
