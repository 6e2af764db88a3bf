pub mod market;
pub mod index;
pub mod trigger;
