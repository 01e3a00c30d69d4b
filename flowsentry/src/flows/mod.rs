pub mod features;
pub mod flow_state;
