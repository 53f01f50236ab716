/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use actix_web_prom::PrometheusMetrics;
use prometheus::{opts, register_histogram, register_histogram_vec, Histogram, HistogramVec};
pub use shared::utils::prometheus::*;

pub static NEARBY_SEARCH_DURATION: once_cell::sync::Lazy<HistogramVec> =
    once_cell::sync::Lazy::new(|| {
        register_histogram_vec!(
            opts!(
                "nearby_search_duration_seconds",
                "Nearby driver search duration by strategy"
            )
            .into(),
            &["mode"]
        )
        .expect("Failed to register nearby search metrics")
    });

pub static RING_EXPANSION_DEPTH: once_cell::sync::Lazy<Histogram> =
    once_cell::sync::Lazy::new(|| {
        register_histogram!(
            "ring_expansion_depth",
            "Rings expanded before a sharded search settled",
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
        )
        .expect("Failed to register ring expansion metrics")
    });

/// Shared HTTP metrics plus the locator-specific collectors, exposed on
/// `/metrics`.
pub fn locator_metrics() -> PrometheusMetrics {
    let prometheus = prometheus_metrics();

    prometheus
        .registry
        .register(Box::new(NEARBY_SEARCH_DURATION.to_owned()))
        .expect("Failed to register nearby search metrics");

    prometheus
        .registry
        .register(Box::new(RING_EXPANSION_DEPTH.to_owned()))
        .expect("Failed to register ring expansion metrics");

    prometheus
}
