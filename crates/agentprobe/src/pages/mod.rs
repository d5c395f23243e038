//! Page objects for the application under test.

mod agents;
mod login;

pub use agents::AgentsPage;
pub use login::LoginPage;
