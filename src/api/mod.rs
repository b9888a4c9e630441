pub use dispatcher::{Dispatcher, DispatcherExt};
pub use mock::{Mock, ResponseActions};
pub use request::{expand_uri_template, RequestBuilder};
pub use result::{
    ContentResultMatchers, HeaderResultMatchers, ResultActions, ResultMatchers,
    StatusResultMatchers,
};
pub use server::{MockOptions, MockServer};
pub use spec::{Responder, ResponseSpec, Then, When};

mod dispatcher;
mod mock;
mod output;
mod request;
mod result;
mod server;
pub(crate) mod spec;
