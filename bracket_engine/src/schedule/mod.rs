//! Schedule-based formats: round robin, Swiss, and the group stage.

pub mod groups;
pub mod round_robin;
pub mod standings;
pub mod swiss;

pub use groups::{FinalsFormat, GroupDraw, MultiStageConfig};
pub use standings::{RoundRobinStanding, SwissStanding};
pub use swiss::SwissPairing;
