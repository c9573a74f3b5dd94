//! Authentication: the state reducer, the session, and token inspection.

mod session;
mod state;
mod token;

pub use session::{AuthOutcome, Session, StoredCredentials, UserDisplay};
pub use state::{AuthAction, AuthState, AuthStatus};
pub use token::TokenClaims;
