pub mod lag;
pub mod topk;

pub use lag::{analyze_lag, LagDetector, LagEvent};
pub use topk::TopKHeap;
