pub mod persist;
pub mod report;
pub mod submission;
pub mod validation;

pub use persist::{persist, PersistError, PersistedRecord};
pub use submission::{OnboardingSubmission, SubmissionDraft};
pub use validation::{validate_connection_request, validate_submission};
