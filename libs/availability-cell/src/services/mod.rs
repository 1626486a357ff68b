pub mod availability;
pub mod slots;
pub mod specialty;

pub use availability::AvailabilityService;
pub use slots::{generate_slots, rule_for_slot, SlotGeneratorService};
pub use specialty::SpecialtyService;
