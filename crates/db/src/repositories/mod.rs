pub mod audit_record_repo;

pub use audit_record_repo::AuditRecordRepo;
