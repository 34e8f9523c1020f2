//! Channel names understood by the dispatcher.

pub const INITIALIZE_WITH_PASSWORD: &str = "database:initialize-with-password";
pub const VERIFY_PASSWORD: &str = "database:verify-password";
pub const IS_INITIALIZED: &str = "database:is-initialized";
pub const IS_CONNECTED: &str = "database:is-connected";
pub const LOCK: &str = "database:lock";

pub const GET_ALL: &str = "password:get-all";
pub const GET_BY_ID: &str = "password:get-by-id";
pub const CREATE: &str = "password:create";
pub const UPDATE: &str = "password:update";
pub const DELETE: &str = "password:delete";
pub const GENERATE: &str = "password:generate";

pub const GET_METADATA: &str = "app-info:get-metadata";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    InitializeWithPassword,
    VerifyPassword,
    IsInitialized,
    IsConnected,
    Lock,
    GetAll,
    GetById,
    Create,
    Update,
    Delete,
    Generate,
    GetMetadata,
}

impl Channel {
    pub const ALL: [Self; 12] = [
        Self::InitializeWithPassword,
        Self::VerifyPassword,
        Self::IsInitialized,
        Self::IsConnected,
        Self::Lock,
        Self::GetAll,
        Self::GetById,
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::Generate,
        Self::GetMetadata,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitializeWithPassword => INITIALIZE_WITH_PASSWORD,
            Self::VerifyPassword => VERIFY_PASSWORD,
            Self::IsInitialized => IS_INITIALIZED,
            Self::IsConnected => IS_CONNECTED,
            Self::Lock => LOCK,
            Self::GetAll => GET_ALL,
            Self::GetById => GET_BY_ID,
            Self::Create => CREATE,
            Self::Update => UPDATE,
            Self::Delete => DELETE,
            Self::Generate => GENERATE,
            Self::GetMetadata => GET_METADATA,
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Lifecycle channels reply with `{ success, error? }`.
    #[must_use]
    pub fn is_lifecycle(self) -> bool {
        matches!(
            self,
            Self::InitializeWithPassword | Self::VerifyPassword | Self::Lock
        )
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::parse(channel.as_str()), Some(channel));
        }
        assert_eq!(Channel::parse("password:drop-table"), None);
    }
}
