//! Release planning - versions first, then the git-flow steps that ship them

pub mod flow_planner;
pub mod version_planner;

pub use flow_planner::{FlowPlan, FlowPlanner, FlowPolicy, FlowStep};
pub use version_planner::{VersionPlan, VersionPlanner};
