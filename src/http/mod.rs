pub mod client;
pub mod soap;

pub use client::{
    CredentialStrategy, FetchedBody, HttpClient, RateLimited, RequestOptions, RetryPolicy,
};
