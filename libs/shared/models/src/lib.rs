pub mod appointment;
pub mod auth;
pub mod error;

pub use appointment::AppointmentStatus;
pub use auth::{Role, SessionContext, User};
pub use error::AppError;
