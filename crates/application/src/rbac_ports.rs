mod assignments;
mod audit;
mod directory;
mod roles;

pub use assignments::{AssignmentQuery, AssignmentRepository};
pub use audit::{AuditEvent, AuditRepository};
pub use directory::{UserDirectory, UserProfile};
pub use roles::RoleRepository;
