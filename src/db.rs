pub mod user_repo;
pub use user_repo::UserRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod arrangement_repo;
pub use arrangement_repo::ArrangementRepository;
pub mod reservation_repo;
pub use reservation_repo::ReservationRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;
