pub mod check;
pub mod compile;
pub mod error;
pub mod model;
pub mod normalize;
pub mod optimize;

pub use polygram_runtime as runtime;

pub use check::validate;
pub use compile::{compile, compile_with, CompileOptions};
pub use error::{ConfigError, Problem, WellFormednessError};
pub use model::{Expr, Grammar, Literal, LiteralValue, Rule, RuleAttributes, RuleHandle};
pub use normalize::normalize;
pub use optimize::{optimize, Optimizer, OptimizerOptions};
