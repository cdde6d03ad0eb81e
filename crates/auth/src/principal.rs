use gatehouse_core::{SessionId, Username};

/// The actor performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    Anonymous,
    User(Username),
}

impl Principal {
    pub fn username(&self) -> Option<&Username> {
        match self {
            Principal::Anonymous => None,
            Principal::User(name) => Some(name),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    /// True if this principal is the user named `name`.
    pub fn is(&self, name: &str) -> bool {
        self.username().is_some_and(|u| u.as_str() == name)
    }
}

impl core::fmt::Display for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Principal::Anonymous => f.write_str("anonymous"),
            Principal::User(name) => f.write_str(name.as_str()),
        }
    }
}

/// How the caller proved its identity for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authentication {
    None,
    /// Interactive session; freshness is tracked per session.
    Session(SessionId),
    /// Bearer API key. The credential is presented with every request, so it
    /// always counts as freshly verified.
    ApiKey,
}

/// Identity of an inbound call, as supplied by the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub principal: Principal,
    pub authentication: Authentication,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            principal: Principal::Anonymous,
            authentication: Authentication::None,
        }
    }

    pub fn session(user: Username, session: SessionId) -> Self {
        Self {
            principal: Principal::User(user),
            authentication: Authentication::Session(session),
        }
    }

    pub fn api_key(user: Username) -> Self {
        Self {
            principal: Principal::User(user),
            authentication: Authentication::ApiKey,
        }
    }

    pub fn username(&self) -> Option<&Username> {
        self.principal.username()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        match self.authentication {
            Authentication::Session(id) => Some(id),
            _ => None,
        }
    }
}
