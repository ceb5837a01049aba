pub mod aadgraph;
pub mod msgraph;
