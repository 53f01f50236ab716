/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::types::*;
use geohash::{decode, encode, neighbors, Coord};
use rustc_hash::FxHashSet;
use shared::tools::error::AppError;

/// Pure cell arithmetic over the geohash grid. Two resolutions are in play:
/// a coarse one that drives shard placement and a fine one that keys the
/// location buckets. No I/O, no state beyond the configured resolutions.
#[derive(Debug, Clone, Copy)]
pub struct CellIndexer {
    coarse_resolution: usize,
    fine_resolution: usize,
    shard_count: u32,
}

impl CellIndexer {
    pub fn new(coarse_resolution: usize, fine_resolution: usize, shard_count: u32) -> Self {
        Self {
            coarse_resolution,
            fine_resolution,
            shard_count: shard_count.max(1),
        }
    }

    pub fn cell_for_point(
        &self,
        Latitude(lat): &Latitude,
        Longitude(lon): &Longitude,
        resolution: usize,
    ) -> Result<CellId, AppError> {
        encode(Coord { x: *lon, y: *lat }, resolution)
            .map(CellId)
            .map_err(|err| AppError::InvalidRequest(format!("Cannot index coordinate: {err}")))
    }

    pub fn fine_cell(&self, lat: &Latitude, lon: &Longitude) -> Result<CellId, AppError> {
        self.cell_for_point(lat, lon, self.fine_resolution)
    }

    pub fn coarse_cell(&self, lat: &Latitude, lon: &Longitude) -> Result<CellId, AppError> {
        self.cell_for_point(lat, lon, self.coarse_resolution)
    }

    /// Shard placement: coarse cell id hashed by summing its byte values,
    /// modulo the shard count. Deterministic and cheap, but nearby coarse
    /// cells can land unevenly across shards.
    pub fn shard_for(&self, lat: &Latitude, lon: &Longitude) -> Result<ShardId, AppError> {
        let coarse = self.coarse_cell(lat, lon)?;
        Ok(self.shard_of_coarse_cell(&coarse))
    }

    fn shard_of_coarse_cell(&self, CellId(cell): &CellId) -> ShardId {
        let hash: u32 = cell.bytes().map(u32::from).sum();
        ShardId(hash % self.shard_count)
    }

    /// Center coordinate of a cell. Needed because a neighboring fine cell
    /// may fall under a different shard than the search origin; the shard is
    /// always recomputed from the cell itself, never inherited.
    pub fn cell_center(&self, CellId(cell): &CellId) -> Result<Point, AppError> {
        let (coord, _, _) = decode(cell)
            .map_err(|err| AppError::InternalError(format!("Cannot decode cell id: {err}")))?;
        Ok(Point {
            lat: Latitude(coord.y),
            lon: Longitude(coord.x),
        })
    }

    /// The center cell plus every cell within `k` adjacency hops. k=0 yields
    /// just the center, each further hop grows the square ring outward. The
    /// result is sorted so repeated calls are directly comparable.
    pub fn ring_neighbors(&self, cell: &CellId, k: u32) -> Result<Vec<CellId>, AppError> {
        let mut seen: FxHashSet<CellId> = FxHashSet::default();
        seen.insert(cell.clone());
        let mut frontier = vec![cell.clone()];

        for _ in 0..k {
            let mut next = Vec::new();
            for CellId(current) in frontier {
                let adjacent = neighbors(&current).map_err(|err| {
                    AppError::InternalError(format!("Cannot expand cell ring: {err}"))
                })?;
                for hash in [
                    adjacent.n,
                    adjacent.ne,
                    adjacent.e,
                    adjacent.se,
                    adjacent.s,
                    adjacent.sw,
                    adjacent.w,
                    adjacent.nw,
                ] {
                    let candidate = CellId(hash);
                    if seen.insert(candidate.clone()) {
                        next.push(candidate);
                    }
                }
            }
            frontier = next;
        }

        let mut ring: Vec<CellId> = seen.into_iter().collect();
        ring.sort();
        Ok(ring)
    }
}
