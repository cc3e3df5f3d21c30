use rand_agents::user_agent;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, HeaderMap, HeaderValue,
    InvalidHeaderValue, PRAGMA, USER_AGENT,
};

pub fn generate_headers() -> Result<HeaderMap<HeaderValue>, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();

    let user_agent = user_agent();

    headers.insert(CONNECTION, "keep-alive".parse()?);
    headers.insert(CACHE_CONTROL, "no-cache".parse()?);
    headers.insert(ACCEPT, "application/json".parse()?);
    headers.insert(USER_AGENT, user_agent.parse()?);
    headers.insert(ACCEPT_LANGUAGE, "en-US,en;q=0.9".parse()?);
    headers.insert(PRAGMA, "no-cache".parse()?);

    Ok(headers)
}
