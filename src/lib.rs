pub mod config;
pub mod csv;
pub mod enrollment;
pub mod guard;
pub mod ids;
pub mod model;
pub mod registry;
pub mod waitlist;

pub use config::RegistryConfig;
pub use enrollment::EnrollmentIndex;
pub use guard::DuplicateGuard;
pub use ids::StudentIdPool;
pub use model::{CourseCode, RegistrationKey, StudentId};
pub use registry::{Command, Outcome, Registry, RegistryError};
pub use waitlist::{Dispatcher, WaitlistQueue};
