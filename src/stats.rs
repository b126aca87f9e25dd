//! The one built-in dynamic handler: GET /rest/stats returns a JSON
//! snapshot of the serving parameters.

use std::time::SystemTime;

use serde::Serialize;

use crate::config::Config;
use crate::http::request::Request;
use crate::http::response::Response;

#[derive(Serialize)]
struct ServerStats {
    poolsize: String,
    timeout: String,
    servertime: String,
}

/// Build the stats handler for registration under GET /rest/stats. The
/// serving parameters are captured at construction; only the timestamp is
/// computed per request.
pub fn stats_handler(cfg: &Config) -> impl Fn(&Request) -> Option<Response> + Send + Sync + use<> {
    let poolsize = cfg.poolsize.to_string();
    let timeout = cfg.timeout.to_string();

    move |_request| {
        let stats = ServerStats {
            poolsize: poolsize.clone(),
            timeout: timeout.clone(),
            servertime: httpdate::fmt_http_date(SystemTime::now()),
        };
        let body = serde_json::to_vec(&stats).ok()?;
        Some(Response::with_bytes(200, body, "application/json"))
    }
}
