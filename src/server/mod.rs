pub mod matchers;
pub(crate) mod state;
