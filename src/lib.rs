pub mod math {
    pub mod traits;
    pub mod fraction;
    pub mod fraction_exact;
    pub mod fraction_f64;
    pub mod simplex_number;
}
pub mod optimisation_algorithms {
    pub mod sparse_matrix;
    pub mod linear_programming_sparse;
    pub mod basis_factorisation;
    pub mod basis;
    pub mod bound_manager;
    pub mod solver_config;
    pub mod simplex_task;
    pub mod simplex_pricing;
    pub mod pivot_engine;
    pub mod pseudo_costs;
    pub mod cutting_plane_pool;
    pub mod gomory_cuts;
    pub mod mixed_integer_linear_programming;
    pub mod linear_programming;
}
