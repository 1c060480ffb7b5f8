pub mod fixture;
pub mod role;

pub use fixture::{FixtureCode, FixtureFile, FixtureGroup};
pub use role::{Role, RoleAssignment, RoleRule};
