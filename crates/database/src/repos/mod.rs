//! Repository traits implemented on [`DbSession`](crate::DbSession).

pub mod deliverables;
pub mod invoices;
pub mod projects;

pub use deliverables::DeliverableRepo;
pub use invoices::InvoiceRepo;
pub use projects::ProjectRepo;
