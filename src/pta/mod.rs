//! Pointer analysis: contexts, canonicalized pointers and heap objects,
//! the fixed-point solver, and the taint pipeline co-iterated with it
//! (§3, §4.2, §4.3, §4.6).

pub mod context;
pub mod cs_obj;
pub mod pointer;
pub mod solver;
pub mod taint;

/// Which pointer-analysis variant to run. The context-insensitive
/// variant is the same solver driven by a [`context::CiContextSelector`]
/// (§4.2 "CI variant: identical algorithm with a singleton context
/// universe"); it is not a separate code path.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PTAType {
    ContextInsensitive,
    /// k-call-site-sensitive, depth given by `AnalysisOptions::context_depth`.
    CallSiteSensitive,
}
