pub mod batch_runner;
pub mod collector;
pub mod persistence;

pub use batch_runner::BatchRunner;
pub use collector::SymbolCollector;
pub use persistence::PersistenceAdapter;
