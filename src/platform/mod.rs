pub mod token;

pub use token::{AsyncTokenProvider, StaticTokenProvider, TokenError, TokenProviderService};
