use std::time::Duration;

use reqwest::blocking::Client;

use crate::loader::LoadError;

const USER_AGENT: &str = concat!("obv-terminal/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration) -> Result<Client, LoadError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(LoadError::Client)
}
