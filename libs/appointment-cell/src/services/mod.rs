pub mod access;
pub mod booking;
pub mod lifecycle;
pub mod read_model;
pub mod stats;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use read_model::AppointmentQueryService;
pub use stats::AppointmentStatsService;
