//! Lifecycle state enums for sites and glideins.
//!
//! States are persisted as their upper-case name (`TEXT` columns) and appear
//! lower-cased in NetLogger event names (`site.ready`, `glidein.running`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

macro_rules! define_state_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// The persisted (upper-case) name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Unknown {}: {other}",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

define_state_enum! {
    /// Site lifecycle state.
    SiteState {
        New => "NEW",
        Staging => "STAGING",
        Ready => "READY",
        Exiting => "EXITING",
        Removing => "REMOVING",
        Failed => "FAILED",
        Deleted => "DELETED",
    }
}

define_state_enum! {
    /// Glidein lifecycle state.
    GlideinState {
        New => "NEW",
        Waiting => "WAITING",
        Submitted => "SUBMITTED",
        Queued => "QUEUED",
        Running => "RUNNING",
        Removing => "REMOVING",
        Finished => "FINISHED",
        Failed => "FAILED",
        Deleted => "DELETED",
    }
}

define_state_enum! {
    /// Globus gatekeeper flavour of an execution service.
    ServiceType {
        Gt2 => "GT2",
        Gt4 => "GT4",
        Gt5 => "GT5",
    }
}

impl SiteState {
    /// NetLogger event name for entering this state.
    pub fn event_name(self) -> String {
        format!("site.{}", self.as_str().to_ascii_lowercase())
    }
}

impl GlideinState {
    /// NetLogger event name for entering this state.
    pub fn event_name(self) -> String {
        format!("glidein.{}", self.as_str().to_ascii_lowercase())
    }

    /// Whether a local Condor job exists for a glidein in this state.
    pub fn has_active_job(self) -> bool {
        matches!(
            self,
            GlideinState::Submitted | GlideinState::Queued | GlideinState::Running
        )
    }
}

impl ServiceType {
    /// GT2 and GT5 take RSL; GT4 takes a job description XML fragment.
    pub fn uses_rsl(self) -> bool {
        matches!(self, ServiceType::Gt2 | ServiceType::Gt5)
    }
}
