/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::LocationKv;
use crate::common::{types::*, utils::distance_between_in_km};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use shared::tools::error::AppError;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct ExpiringValue {
    value: String,
    expires_at: Instant,
}

struct ExpiringZset {
    members: FxHashMap<String, f64>,
    expires_at: Instant,
}

/// In-process stand-in for the external key-value store with real expiry
/// semantics. Entries are dropped lazily when a read or write encounters
/// them past their deadline, mirroring how the Redis backend behaves from
/// the engine's point of view.
#[derive(Default)]
pub struct MemoryKv {
    strings: RwLock<FxHashMap<String, ExpiringValue>>,
    zsets: RwLock<FxHashMap<String, ExpiringZset>>,
    geo: RwLock<FxHashMap<String, FxHashMap<String, (f64, f64)>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> AppError {
        AppError::InternalError("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl LocationKv for MemoryKv {
    async fn set_with_expiry(
        &self,
        key: &str,
        value: String,
        expiry_secs: u32,
    ) -> Result<(), AppError> {
        let mut strings = self.strings.write().map_err(|_| Self::lock_poisoned())?;
        strings.insert(
            key.to_string(),
            ExpiringValue {
                value,
                expires_at: Instant::now() + Duration::from_secs(expiry_secs.into()),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut strings = self.strings.write().map_err(|_| Self::lock_poisoned())?;
        match strings.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                strings.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, AppError> {
        let strings = self.strings.read().map_err(|_| Self::lock_poisoned())?;
        let now = Instant::now();
        Ok(keys
            .iter()
            .map(|key| match strings.get(key) {
                Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
                _ => None,
            })
            .collect())
    }

    async fn zadd_with_expiry(
        &self,
        key: &str,
        member: &str,
        score: f64,
        expiry_secs: u32,
    ) -> Result<(), AppError> {
        let mut zsets = self.zsets.write().map_err(|_| Self::lock_poisoned())?;
        let now = Instant::now();
        let expires_at = now + Duration::from_secs(expiry_secs.into());

        let entry = zsets.entry(key.to_string()).or_insert_with(|| ExpiringZset {
            members: FxHashMap::default(),
            expires_at,
        });
        if entry.expires_at <= now {
            entry.members.clear();
        }
        entry.members.insert(member.to_string(), score);
        entry.expires_at = expires_at;
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<(), AppError> {
        let mut zsets = self.zsets.write().map_err(|_| Self::lock_poisoned())?;
        if let Some(entry) = zsets.get_mut(key) {
            entry.members.remove(member);
            if entry.members.is_empty() {
                zsets.remove(key);
            }
        }
        Ok(())
    }

    async fn ztop_scores_batch(
        &self,
        keys: &[String],
        count: usize,
    ) -> Result<Vec<Vec<(String, f64)>>, AppError> {
        let zsets = self.zsets.read().map_err(|_| Self::lock_poisoned())?;
        let now = Instant::now();

        Ok(keys
            .iter()
            .map(|key| match zsets.get(key) {
                Some(entry) if entry.expires_at > now => {
                    let mut members: Vec<(String, f64)> = entry
                        .members
                        .iter()
                        .map(|(member, score)| (member.clone(), *score))
                        .collect();
                    members.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                    members.truncate(count);
                    members
                }
                _ => Vec::new(),
            })
            .collect())
    }

    async fn geo_add(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        member: &str,
    ) -> Result<(), AppError> {
        let mut geo = self.geo.write().map_err(|_| Self::lock_poisoned())?;
        geo.entry(key.to_string())
            .or_default()
            .insert(member.to_string(), (longitude, latitude));
        Ok(())
    }

    async fn geo_search(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
        count: Option<u64>,
    ) -> Result<Vec<(String, f64)>, AppError> {
        let geo = self.geo.read().map_err(|_| Self::lock_poisoned())?;
        let origin = Point {
            lat: Latitude(latitude),
            lon: Longitude(longitude),
        };

        let mut hits: Vec<(String, f64)> = geo
            .get(key)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|(member, (lon, lat))| {
                        let there = Point {
                            lat: Latitude(*lat),
                            lon: Longitude(*lon),
                        };
                        let distance = distance_between_in_km(&origin, &there);
                        (distance <= radius_km).then(|| (member.clone(), distance))
                    })
                    .collect()
            })
            .unwrap_or_default();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(count) = count {
            hits.truncate(count as usize);
        }
        Ok(hits)
    }
}
