pub mod auth;
pub mod catalog_service;
pub use catalog_service::CatalogService;
pub mod arrangement_service;
pub use arrangement_service::ArrangementService;
pub mod audit_service;
pub use audit_service::AuditService;
pub mod reservation_service;
pub use reservation_service::ReservationService;
pub mod report_service;
pub use report_service::ReportService;
