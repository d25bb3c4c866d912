pub mod glideins;
pub mod sites;

use serde::Deserialize;

/// Query parameters shared by the site and glidein list endpoints.
///
/// Without `user` or `all` only the caller's resources are listed.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub user: Option<String>,
    #[serde(default)]
    pub all: bool,
}

impl ListParams {
    /// Local username to filter on, or `None` for everyone.
    pub fn owner_filter(self, caller: &str) -> Option<String> {
        if self.all {
            None
        } else {
            Some(self.user.unwrap_or_else(|| caller.to_string()))
        }
    }
}
