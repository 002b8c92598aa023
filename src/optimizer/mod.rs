pub mod crossover;
pub mod initialization;
pub mod mutation;
pub mod pareto;
pub mod runner;
pub mod selection;

pub use self::pareto::{crowding_distance, non_dominated_sort};
pub use self::runner::{GenerationObserver, NoopObserver, Nsga2Options, Optimizer};
pub use self::selection::environmental_selection;
