//! Ad Redis operations.
//!
//! Redis key patterns:
//! - `ad:{nanoid}` — ad data (JSON)
//! - `user_ads:{user_id}` — SET of ad IDs authored by the user
//!
//! Ads are permanent until deleted; moderation flips the `confirmed`
//! flag in place.

use crate::models::StoredAd;
use redis::AsyncCommands;

/// Store an ad and register it in the author's ad set.
pub async fn store_ad<C>(con: &mut C, ad: &StoredAd) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let ad_key = format!("ad:{}", ad.id);
    let user_ads_key = format!("user_ads:{}", ad.author_id);

    let json = serde_json::to_string(ad).map_err(|e| super::json_err("JSON serialize", e))?;

    con.set::<_, _, ()>(&ad_key, json).await?;
    con.sadd::<_, _, ()>(&user_ads_key, &ad.id).await?;

    Ok(())
}

/// Get an ad by ID.
pub async fn get_ad<C>(con: &mut C, id: &str) -> Result<Option<StoredAd>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("ad:{}", id);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            let ad =
                serde_json::from_str(&data).map_err(|e| super::json_err("JSON deserialize", e))?;
            Ok(Some(ad))
        }
        None => Ok(None),
    }
}

/// Overwrite an existing ad record (moderation flag updates).
pub async fn update_ad<C>(con: &mut C, ad: &StoredAd) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("ad:{}", ad.id);
    let json = serde_json::to_string(ad).map_err(|e| super::json_err("JSON serialize", e))?;
    con.set::<_, _, ()>(&key, json).await?;
    Ok(())
}

/// Delete an ad. Returns true if it existed.
pub async fn delete_ad<C>(con: &mut C, id: &str, author_id: &str) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("ad:{}", id);
    let deleted: i32 = con.del(&key).await?;

    let user_ads_key = format!("user_ads:{}", author_id);
    con.srem::<_, _, ()>(&user_ads_key, id).await?;

    Ok(deleted > 0)
}
