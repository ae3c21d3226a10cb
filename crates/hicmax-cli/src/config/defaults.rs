use hicmax::engine::config::{AlphaSweep, CostAggregation};

pub struct DefaultsConfig {
    pub num_structures: usize,
    pub avg_distance: f64,
    pub if_threshold: f64,
    pub learning_rate: f64,
    pub max_iterations: usize,
    pub cost_threshold: f64,
    pub patience_iterations: usize,
    pub workers: usize,
    pub cost_aggregation: CostAggregation,
    pub sweep: AlphaSweep,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            num_structures: 1,
            avg_distance: 10.0,
            if_threshold: 0.0,
            learning_rate: 1.0,
            max_iterations: 1000,
            cost_threshold: 1e-6,
            patience_iterations: 10,
            workers: 1,
            cost_aggregation: CostAggregation::PerWorker,
            sweep: AlphaSweep::default(),
        }
    }
}
