pub mod cfg;
pub mod class_hierarchy;
pub mod heap;
pub mod icfg;
pub mod method;
pub mod program;
pub mod stmt;
pub mod types;
