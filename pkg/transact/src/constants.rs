/// Input arity of the small spend circuit
pub const SMALL_INPUTS: usize = 2;

/// Input arity of the large spend circuit
pub const LARGE_INPUTS: usize = 10;

/// Output arity of both circuits
pub const OUTPUTS: usize = 3;

/// How many caller-supplied outputs fit next to the mandatory change note
pub const MAX_REAL_OUTPUTS: usize = 2;
