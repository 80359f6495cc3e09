use thiserror::Error;

/// Precondition failures. These are caught before any patch is built, so the
/// store never sees optimistic state for a rejected call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{operation}: missing policy id")]
    MissingPolicyId { operation: &'static str },
    #[error("{operation}: missing member list")]
    MissingMembers { operation: &'static str },
    #[error("{operation}: missing {field}")]
    MissingIdentifier {
        operation: &'static str,
        field: &'static str,
    },
    #[error("{operation}: workspace {policy_id} is not in the store")]
    UnknownWorkspace {
        operation: &'static str,
        policy_id: String,
    },
}
