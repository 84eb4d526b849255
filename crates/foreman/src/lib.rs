pub mod campaign;
pub mod extract;
pub mod replay;

pub use campaign::{CampaignConfig, CampaignSummary};
pub use replay::{ReplayConfig, ReplaySummary};
