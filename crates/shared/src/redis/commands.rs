use crate::redis::types::RedisConnectionPool;
use crate::tools::error::AppError;
use crate::utils::logger::instrument;
use fred::{
    interfaces::{GeoInterface, KeysInterface, SortedSetsInterface},
    types::{
        Any, Expiration, GeoPosition, GeoUnit, GeoValue, MultipleGeoValues,
        RedisValue, SortOrder,
    },
};

fn value_to_string(value: RedisValue) -> Option<String> {
    match value {
        RedisValue::String(s) => Some(s.to_string()),
        RedisValue::Bytes(b) => String::from_utf8(b.to_vec()).ok(),
        RedisValue::Integer(i) => Some(i.to_string()),
        RedisValue::Double(d) => Some(d.to_string()),
        _ => None,
    }
}

/// Normalizes a ZRANGE .. WITHSCORES reply into (member, score) pairs,
/// sorted by score descending.
///
/// Depending on the negotiated protocol version the reply arrives either as
/// a flat array of alternating members and scores, as an array of two-element
/// arrays, or as a map.
fn parse_scored_members(value: RedisValue) -> Vec<(String, f64)> {
    let mut members: Vec<(String, f64)> = match value {
        RedisValue::Array(items) => {
            if !items.is_empty() && items.iter().all(|item| item.is_array()) {
                items
                    .into_iter()
                    .filter_map(|pair| match pair {
                        RedisValue::Array(mut kv) if kv.len() == 2 => {
                            let score = kv.pop().and_then(|v| v.as_f64())?;
                            let member = kv.pop().and_then(value_to_string)?;
                            Some((member, score))
                        }
                        _ => None,
                    })
                    .collect()
            } else {
                let mut pairs = Vec::with_capacity(items.len() / 2);
                let mut iter = items.into_iter();
                while let (Some(member), Some(score)) = (iter.next(), iter.next()) {
                    if let (Some(member), Some(score)) = (value_to_string(member), score.as_f64()) {
                        pairs.push((member, score));
                    }
                }
                pairs
            }
        }
        RedisValue::Map(map) => map
            .inner()
            .into_iter()
            .filter_map(|(member, score)| Some((member.into_string()?, score.as_f64()?)))
            .collect(),
        _ => Vec::new(),
    };

    members.sort_by(|a, b| b.1.total_cmp(&a.1));
    members
}

impl RedisConnectionPool {
    // SET with EX
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry: u32,
    ) -> Result<(), AppError> {
        let output: Result<(), _> = self
            .pool
            .set(key, value, Some(Expiration::EX(expiry.into())), None, false)
            .await;

        output.map_err(|_| AppError::SetFailed)
    }

    // GET
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn get_key(&self, key: &str) -> Result<Option<String>, AppError> {
        let output: Result<RedisValue, _> = self.pool.get(key).await;

        match output {
            Ok(RedisValue::Null) => Ok(None),
            Ok(value) => Ok(value_to_string(value)),
            Err(_) => Err(AppError::GetFailed),
        }
    }

    // MGET, one round trip for the whole batch. Missing keys come back as None.
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn mget_keys(&self, keys: Vec<String>) -> Result<Vec<Option<String>>, AppError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let output: Result<RedisValue, _> = self.pool.mget(keys).await;

        match output {
            Ok(RedisValue::Array(values)) => Ok(values
                .into_iter()
                .map(|value| match value {
                    RedisValue::Null => None,
                    value => value_to_string(value),
                })
                .collect()),
            Ok(value) => Ok(vec![match value {
                RedisValue::Null => None,
                value => value_to_string(value),
            }]),
            Err(_) => Err(AppError::MGetFailed),
        }
    }

    // DEL
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn delete_key(&self, key: &str) -> Result<(), AppError> {
        let output: Result<(), _> = self.pool.del(key).await;

        output.map_err(|_| AppError::DeleteFailed)
    }

    // EXPIRE
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn set_expiry(&self, key: &str, seconds: i64) -> Result<(), AppError> {
        let output: Result<(), _> = self.pool.expire(key, seconds).await;

        output.map_err(|_| AppError::SetExpiryFailed)
    }

    // ZADD
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn zadd(&self, key: &str, values: Vec<(f64, &str)>) -> Result<(), AppError> {
        let output: Result<(), _> = self.pool.zadd(key, None, None, false, false, values).await;

        output.map_err(|_| AppError::ZAddFailed)
    }

    // ZREM
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn zrem(&self, key: &str, member: &str) -> Result<(), AppError> {
        let output: Result<(), _> = self.pool.zrem(key, member).await;

        output.map_err(|_| AppError::ZRemFailed)
    }

    /// Pipelined `ZRANGE key 0 count-1 REV WITHSCORES` over all keys in one
    /// round trip. A key that fails to respond yields an empty list rather
    /// than failing the batch.
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn ztop_scores_batch(
        &self,
        keys: &[String],
        count: usize,
    ) -> Result<Vec<Vec<(String, f64)>>, AppError> {
        if keys.is_empty() || count == 0 {
            return Ok(vec![Vec::new(); keys.len()]);
        }

        let pipeline = self.pool.next().pipeline();

        for key in keys {
            let queued: Result<(), _> = pipeline
                .zrange(key.as_str(), 0, count as i64 - 1, None, true, None, true)
                .await;
            queued.map_err(|_| AppError::ZRangeFailed)?;
        }

        let replies: Vec<Result<RedisValue, _>> = pipeline.try_all().await;

        Ok(replies
            .into_iter()
            .map(|reply| match reply {
                Ok(value) => parse_scored_members(value),
                Err(_) => Vec::new(),
            })
            .collect())
    }

    // GEOADD
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn geo_add(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        member: &str,
    ) -> Result<(), AppError> {
        let values = MultipleGeoValues::from(vec![GeoValue {
            coordinates: GeoPosition {
                longitude,
                latitude,
            },
            member: member.into(),
        }]);

        let output: Result<(), _> = self.pool.geoadd(key, None, false, values).await;

        output.map_err(|_| AppError::GeoAddFailed)
    }

    /// GEOSEARCH by radius around a lon/lat origin, ascending by distance,
    /// optionally capped at `count` members.
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn geo_search(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
        count: Option<u64>,
    ) -> Result<Vec<(String, f64)>, AppError> {
        let output: Result<RedisValue, _> = self
            .pool
            .geosearch(
                key,
                None,
                Some(GeoPosition::from((longitude, latitude))),
                Some((radius_km, GeoUnit::Kilometers)),
                None,
                Some(SortOrder::Asc),
                count.map(|c| (c, false as Any)),
                false,
                true,
                false,
            )
            .await;

        let members = output
            .and_then(|value| value.into_geo_radius_result(false, true, false))
            .map_err(|_| AppError::GeoSearchFailed)?;

        Ok(members
            .into_iter()
            .filter_map(|info| {
                let member = value_to_string(info.member)?;
                let distance = info.distance?;
                Some((member, distance))
            })
            .collect())
    }
}
