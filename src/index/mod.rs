pub mod cardinality;

pub use cardinality::CardinalityIndex;
