pub mod availability;
pub mod guard;
pub mod memory;
pub mod service;

pub use availability::AvailabilityResolver;
pub use guard::ReservationGuard;
pub use memory::{InMemoryLedger, InMemorySeatCatalog};
pub use service::{ActiveSummary, BookingService};
