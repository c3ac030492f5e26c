pub mod app_config;
pub mod database;
pub mod reservation_repo;
pub mod seat_repo;

pub use database::DbClient;
pub use reservation_repo::PgReservationLedger;
pub use seat_repo::PgSeatCatalog;
