use petrel_smt::MucMethod;

/// Options for the path-based engine.
#[derive(Debug, Clone)]
pub struct BmcOptions {
    /// Minimal-unsat-core strategy for the SMT path checker.
    pub muc_method: MucMethod,
    /// Try the abstract-interpretation path checker before the SMT one.
    pub use_abstract_interp: bool,
    /// Loop unwinding bound.
    pub unroll_bound: usize,
}

impl Default for BmcOptions {
    fn default() -> Self {
        Self {
            muc_method: MucMethod::default(),
            use_abstract_interp: false,
            unroll_bound: 10,
        }
    }
}
