use std::fmt;

use serde::{Deserialize, Serialize};

/// Appointment (turno) status. Spanish aliases accept rows written by
/// the Spanish-language clinic front-end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[serde(alias = "pendiente")]
    Pending,
    #[serde(alias = "aceptado")]
    Accepted,
    #[serde(alias = "rechazado")]
    Rejected,
    #[serde(alias = "cancelado")]
    Cancelled,
    #[serde(alias = "realizado")]
    Completed,
}

impl AppointmentStatus {
    /// Statuses that hold a (specialist, date, time) slot.
    pub const BLOCKING: [AppointmentStatus; 3] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Accepted,
        AppointmentStatus::Completed,
    ];

    pub fn is_blocking(&self) -> bool {
        Self::BLOCKING.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
