pub mod source;

pub use source::AuditSource;
