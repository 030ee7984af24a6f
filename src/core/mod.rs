pub mod adaptive;
pub mod metric;
pub mod partition;
pub mod rdd;

pub use adaptive::*;
pub use metric::*;
pub use partition::*;
pub use rdd::*;
