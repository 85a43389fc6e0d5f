//! Command implementations.

pub mod check;
pub mod run;

pub use self::check::execute_check;
pub use self::run::execute_run;
