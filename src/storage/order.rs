//! Order Redis operations.
//!
//! Redis key pattern:
//! - `order:{nanoid}` — order data (JSON)
//!
//! Payment processing is external; orders exist here so the ownership
//! permission check has a record to guard.

use crate::models::StoredOrder;
use redis::AsyncCommands;

/// Store an order.
pub async fn store_order<C>(con: &mut C, order: &StoredOrder) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("order:{}", order.id);
    let json = serde_json::to_string(order).map_err(|e| super::json_err("JSON serialize", e))?;
    con.set::<_, _, ()>(&key, json).await?;
    Ok(())
}

/// Get an order by ID.
pub async fn get_order<C>(con: &mut C, id: &str) -> Result<Option<StoredOrder>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("order:{}", id);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            let order =
                serde_json::from_str(&data).map_err(|e| super::json_err("JSON deserialize", e))?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}
