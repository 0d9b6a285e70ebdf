pub mod guard;
pub mod hierarchy;
pub mod resolver;

pub use guard::{ADMIN_ONLY, CONTENT_ROLES, require_role, validate_membership};
pub use resolver::{RoleContext, resolve_role};
