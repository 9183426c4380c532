pub mod call_graph;
pub mod cha;
pub mod pfg;
