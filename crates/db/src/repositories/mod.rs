pub mod glidein_repo;
pub mod site_repo;

pub use glidein_repo::GlideinRepo;
pub use site_repo::SiteRepo;
