//! The conversation loop for hcplog.
//!
//! A turn follows one fixed path:
//!
//! 1. **Receive** the rep's message and append it to the transcript
//! 2. **Ask** the assistant, passing the full transcript
//! 3. **Append** the reply (or an apology if the assistant failed)
//! 4. **Merge** any extraction into the form
//!
//! Only one turn per conversation may be in flight at a time.

pub mod controller;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use controller::{ConversationController, DEFAULT_FAILURE_MESSAGE, TurnOutcome};
pub use registry::SessionRegistry;
