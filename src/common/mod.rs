pub mod data;
pub mod json;
pub mod media_type;
pub mod uri;
pub(crate) mod util;
