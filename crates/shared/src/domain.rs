use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ReportId);
id_newtype!(ReportActionId);

/// Client-generated workspace identifier: 16 uppercase hexadecimal characters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

pub const POLICY_ID_LEN: usize = 16;

impl PolicyId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the id has the shape the client generates itself.
    pub fn is_client_generated(&self) -> bool {
        self.0.len() == POLICY_ID_LEN
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PolicyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    Add,
    Update,
    Delete,
}

impl PendingAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PendingAction::Add => "add",
            PendingAction::Update => "update",
            PendingAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRole {
    Admin,
    Auditor,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    Free,
    Personal,
    Corporate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatType {
    PolicyAnnounce,
    PolicyAdmins,
    PolicyExpenseChat,
}

macro_rules! numeric_enum {
    ($name:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_i64(self) -> i64 {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            pub fn from_i64(value: i64) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i64(self.as_i64())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = i64::deserialize(deserializer)?;
                Self::from_i64(raw).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "invalid {} value {raw}",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

numeric_enum!(ReportStateNum {
    Open = 0,
    Processing = 1,
    Submitted = 2,
});

numeric_enum!(ReportStatusNum {
    Open = 0,
    Submitted = 1,
    Closed = 2,
    Approved = 3,
    Reimbursed = 4,
});
