pub mod algo;
pub mod check;
pub mod error;
pub mod global_router;
pub mod grid;
pub mod net;
pub mod solution;
pub mod utils;

use error::RouterError;
use gcr_common::db::core::DesignDB;
use gcr_common::util::config::GlobalRoutingConfig;
use global_router::GlobalRouter;

/// Path and edge costs.
pub type Cost = f64;

/// Builds the routing graph for `design` and runs every routing phase on it.
pub fn route(
    design: &DesignDB,
    config: &GlobalRoutingConfig,
) -> Result<GlobalRouter, RouterError> {
    let mut router = GlobalRouter::from_design(design, config)?;
    router.run()?;
    Ok(router)
}
