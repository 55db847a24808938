//! Classification strategies and the dispatcher that puts a uniform
//! contract in front of them.

pub mod dispatcher;
pub mod few_shot;
pub mod llm;
pub mod statistical;
pub mod text;

pub use dispatcher::{DispatchOptions, Dispatcher};
pub use few_shot::FewShotMatcher;
pub use llm::LlmClassifier;
pub use statistical::{ModelArtifact, StatisticalClassifier, StatisticalModel};
