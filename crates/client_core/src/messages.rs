//! User-facing error messages recorded on failed mutations.

pub const ADD_MEMBER_FAILED: &str =
    "Unexpected error adding this member to the workspace, please try again.";
pub const REMOVE_MEMBER_FAILED: &str =
    "Unexpected error removing that member from the workspace, please try again.";
pub const UPDATE_AVATAR_FAILED: &str =
    "Unexpected error uploading the workspace avatar, please try again.";
pub const DELETE_AVATAR_FAILED: &str =
    "Unexpected error deleting the workspace avatar, please try again.";
pub const GENERAL_SETTINGS_FAILED: &str = "Unexpected error saving, please try again.";
pub const CUSTOM_UNIT_FAILED: &str =
    "Unexpected error saving the workspace distance rates, please try again.";
pub const DELETE_WORKSPACE_FAILED: &str =
    "Unexpected error deleting the workspace, please try again.";
