pub mod audit;
pub mod otp;
pub mod post;
pub mod registration;
pub mod subscriber;
pub mod user;

pub use audit::{Audit, Audited};
pub use otp::{OtpIssue, OtpPurpose, OtpRecord};
pub use post::PublishedPost;
pub use registration::{Registration, RegistrationStep, StepSet};
pub use subscriber::Subscriber;
pub use user::{NewUser, Role, RoleName, User, MAX_USERNAME_LEN};
