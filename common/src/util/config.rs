use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global_routing: GlobalRoutingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

/// Edge cost function used by a routing phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostKind {
    Unit,
    Dlm,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalRoutingConfig {
    #[serde(default = "default_max_rip_iterations")]
    pub max_rip_iterations: usize,
    #[serde(default = "default_max_greedy_iterations")]
    pub max_greedy_iterations: usize,
    #[serde(default = "default_time_out_secs")]
    pub time_out_secs: f64,
    #[serde(default = "default_initial_allow_overflow")]
    pub initial_allow_overflow: bool,
    #[serde(default = "default_initial_cost")]
    pub initial_cost: CostKind,
    #[serde(default = "default_bbox_margin")]
    pub bbox_margin: u32,
    #[serde(default = "default_history_increment")]
    pub history_increment: f64,
    #[serde(default)]
    pub cost: CostConfig,
}

impl Default for GlobalRoutingConfig {
    fn default() -> Self {
        Self {
            max_rip_iterations: default_max_rip_iterations(),
            max_greedy_iterations: default_max_greedy_iterations(),
            time_out_secs: default_time_out_secs(),
            initial_allow_overflow: default_initial_allow_overflow(),
            initial_cost: default_initial_cost(),
            bbox_margin: default_bbox_margin(),
            history_increment: default_history_increment(),
            cost: CostConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CostConfig {
    #[serde(default = "default_edge_base")]
    pub edge_base: f64,
    #[serde(default = "default_via_factor")]
    pub via_factor: f64,
    #[serde(default = "default_pow_base")]
    pub pow_base: f64,
    #[serde(default = "default_pow_max")]
    pub pow_max: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            edge_base: default_edge_base(),
            via_factor: default_via_factor(),
            pow_base: default_pow_base(),
            pow_max: default_pow_max(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_gr_file")]
    pub gr_file: String,
    #[serde(default = "default_output_file")]
    pub output_file: String,
    #[serde(default = "default_congestion_map")]
    pub congestion_map: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            gr_file: default_gr_file(),
            output_file: default_output_file(),
            congestion_map: default_congestion_map(),
        }
    }
}

fn default_max_rip_iterations() -> usize {
    5
}

fn default_max_greedy_iterations() -> usize {
    1
}

fn default_time_out_secs() -> f64 {
    86_400.0
}

fn default_initial_allow_overflow() -> bool {
    true
}

fn default_initial_cost() -> CostKind {
    CostKind::Unit
}

fn default_bbox_margin() -> u32 {
    3
}

fn default_history_increment() -> f64 {
    0.4
}

fn default_edge_base() -> f64 {
    2.0
}

fn default_via_factor() -> f64 {
    3.0
}

fn default_pow_base() -> f64 {
    5.0
}

fn default_pow_max() -> f64 {
    1e12
}

fn default_gr_file() -> String {
    "inputs/adaptec1.simple.gr".to_string()
}

fn default_output_file() -> String {
    "output/routes.txt".to_string()
}

fn default_congestion_map() -> Option<String> {
    Some("output/congestion.png".to_string())
}
