pub mod evidence;
pub mod idea;
pub mod normalizer;
pub mod planner;
pub mod query;
pub mod source;
pub mod text;

pub use evidence::{Evidence, RawResult};
pub use idea::{Idea, Location};
pub use normalizer::Normalizer;
pub use planner::Planner;
pub use query::{Intent, SearchQuery};
pub use source::SourceType;
