//! Composable controller trees.
//!
//! Leaves wrap one control law over a fixed number of scalar inputs and
//! outputs; sequential and parallel composites wire leaves into trees whose
//! I/O lengths are checked once, when the tree is built. Nothing here
//! allocates or performs I/O once a tree is wired.

pub mod chains;
pub mod filters;
pub mod io;
pub mod leaf;
pub mod meta;
pub mod parallel;
pub mod pid;
pub mod tree;

pub use io::IoVector;
pub use leaf::{LeafController, LeafParameters, PidLayout};
pub use meta::MetaController;
pub use parallel::ParallelMetaController;
pub use pid::{Pid, PidState, pid_compute};
pub use tree::Controller;
