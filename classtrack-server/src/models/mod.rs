//! Domain models for the ClassTrack server

pub mod interval;
pub mod provider;
pub mod reports;
pub mod session;
pub mod user;

pub use interval::{AttendanceInterval, Identity, StitchResult, StitchedSpan};
pub use provider::{ConferenceId, ParticipantRecord, ParticipantSpan};
pub use reports::{
    ActiveSessionOverview, ParticipantPresence, PayrollLine, ReconcileOutcome, StudentBilling,
    TutorPayroll,
};
pub use session::{ScheduledClass, Session};
pub use user::{User, UserRole};
