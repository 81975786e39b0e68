use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The agents the backend is known to route interactive sessions through.
///
/// Sender ids arrive in whatever case the backend chooses; they are lowercased
/// before matching.  Anything unrecognized collapses to [`AgentKind::Generic`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// The orchestrating agent.
    Supervisor,
    /// The service center agent.
    ServiceCenter,
    /// The vehicle information agent.
    VehicleInfo,
    /// Any agent id outside the named set.
    Generic,
}

impl AgentKind {
    /// Maps a backend sender id onto a known agent.
    pub fn from_sender(sender: &str) -> Self {
        match sender.trim().to_lowercase().as_str() {
            "supervisor" => AgentKind::Supervisor,
            "service-center" | "servicecenter" | "servicecenteragent" => AgentKind::ServiceCenter,
            "vehicle-info" | "vehicleinfo" | "vehicleinfoagent" => AgentKind::VehicleInfo,
            _ => AgentKind::Generic,
        }
    }

    /// The stable id used in role strings (`agent:<id>`).
    pub fn id(&self) -> &'static str {
        match self {
            AgentKind::Supervisor => "supervisor",
            AgentKind::ServiceCenter => "service-center",
            AgentKind::VehicleInfo => "vehicle-info",
            AgentKind::Generic => "agent",
        }
    }

    /// Human-readable name for display next to the agent's messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Supervisor => "Supervisor",
            AgentKind::ServiceCenter => "Service Center",
            AgentKind::VehicleInfo => "Vehicle Info",
            AgentKind::Generic => "Agent",
        }
    }
}

/// The author of a timeline entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// The human using the session.
    User,
    /// The backend speaking as a whole.
    Assistant,
    /// Local notices such as upload confirmations.
    System,
    /// A specific agent inside an interactive session.
    Agent(AgentKind),
}

impl Role {
    /// Returns true for messages typed by the user.
    pub fn is_user(&self) -> bool {
        matches!(self, Role::User)
    }

    /// Returns true for messages authored by an agent.
    pub fn is_agent(&self) -> bool {
        matches!(self, Role::Agent(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
            Role::Agent(AgentKind::Generic) => write!(f, "agent"),
            Role::Agent(kind) => write!(f, "agent:{}", kind.id()),
        }
    }
}

impl FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            "agent" => Ok(Role::Agent(AgentKind::Generic)),
            _ => match s.strip_prefix("agent:") {
                Some(id) => Ok(Role::Agent(AgentKind::from_sender(id))),
                None => Err(crate::Error::validation(
                    format!("unknown role: {s}"),
                    Some("role".to_string()),
                )),
            },
        }
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_sender_ids_map_to_named_agents() {
        assert_eq!(AgentKind::from_sender("Supervisor"), AgentKind::Supervisor);
        assert_eq!(
            AgentKind::from_sender("ServiceCenterAgent"),
            AgentKind::ServiceCenter
        );
        assert_eq!(
            AgentKind::from_sender("VehicleInfoAgent"),
            AgentKind::VehicleInfo
        );
        assert_eq!(AgentKind::from_sender("weirdagent"), AgentKind::Generic);
    }

    #[test]
    fn role_strings_round_trip() {
        for role in [
            Role::User,
            Role::Assistant,
            Role::System,
            Role::Agent(AgentKind::Supervisor),
            Role::Agent(AgentKind::ServiceCenter),
            Role::Agent(AgentKind::VehicleInfo),
            Role::Agent(AgentKind::Generic),
        ] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn role_serializes_as_string() {
        let json = serde_json::to_string(&Role::Agent(AgentKind::VehicleInfo)).unwrap();
        assert_eq!(json, "\"agent:vehicle-info\"");
        let role: Role = serde_json::from_str("\"agent:mystery\"").unwrap();
        assert_eq!(role, Role::Agent(AgentKind::Generic));
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("moderator".parse::<Role>().is_err());
    }
}
