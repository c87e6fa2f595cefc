pub mod resolved;
pub mod result;

// Re-export commonly used types
pub use resolved::{LabelCandidate, ResolvedLabel};
pub use result::{DetectionResult, LabelSource, ResultMetadata};

// Schema version constants
pub const SCHEMA_VERSION: &str = "0.2.0";
