//! Evidence capture wizard: Identify → Capture → Done.
//!
//! [`WizardState`] holds the in-progress record and implements every step
//! transition as a plain method. [`WizardSession`] owns one state value and
//! runs the I/O around it: a verdict task per captured photo and the
//! order/evidence writes on submit.

mod error;
mod identity;
mod session;
mod state;

pub use error::WizardError;
pub use identity::{IdentityProvider, StaticIdentity};
pub use session::WizardSession;
pub use state::{SubmitPlan, WizardState, WizardStep};
