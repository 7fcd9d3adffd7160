//! Challenge platform entities
//!
//! Four configuration catalogues keyed by `code` ([`FocusArea`],
//! [`FormatType`], [`DifficultyLevel`], [`ChallengeType`]) and the
//! [`Challenge`] aggregate with its status lifecycle. Each module also
//! defines the repository alias and predicate finders for its entity.

mod challenge;
mod challenge_type;
mod config;
mod difficulty_level;
mod focus_area;
mod format_type;

pub use challenge::{
    Challenge, ChallengeError, ChallengeRepository, ChallengeStatus, Evaluation, NewChallenge,
};
pub use challenge_type::{ChallengeType, ChallengeTypeRepository};
pub use config::{ConfigAttributes, ConfigEntity, DetailsUpdate};
pub use difficulty_level::{DifficultyLevel, DifficultyLevelRepository};
pub use focus_area::{FocusArea, FocusAreaRepository};
pub use format_type::{FormatType, FormatTypeRepository};
