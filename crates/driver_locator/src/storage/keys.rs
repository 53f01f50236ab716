/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;

// Expiring, rating-ordered set of driver ids for one (shard, fine cell) pair
pub fn driver_bucket_key(ShardId(shard): &ShardId, CellId(cell): &CellId) -> String {
    format!("dl:loc:shard:{shard}:cell:{cell}")
}

// Expiring per-driver metadata record
pub fn driver_details_key(DriverId(driver_id): &DriverId) -> String {
    format!("dl:ds:driver_details:{driver_id}")
}

// Single flat geo index used by the baseline search strategy
pub fn baseline_geo_key() -> String {
    "dl:loc:all_drivers".to_string()
}

pub fn health_check_key() -> String {
    "dl:health_check".to_string()
}
