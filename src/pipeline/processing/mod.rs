// Pipeline processing: lookup enrichment and numeric cleaning

pub mod clean;
pub mod enrich;

pub use clean::clean;
pub use enrich::{EnrichStats, SpriteEnricher};
