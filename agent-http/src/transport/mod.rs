//! Network side of the agent: envelopes over HTTP and the credential value pull
mod http;
pub use http::{HttpTransport, HTTPS_SCHEME, HTTP_SCHEME};

mod values;
pub use values::HttpValueSource;
