pub mod apps;
pub mod challenge;
pub mod stats;
pub mod status;

use anyhow::{bail, Result};
use focusguard_proto::FocusGuardDaemonProxy;
use zbus::Connection;

pub async fn connect() -> Result<FocusGuardDaemonProxy<'static>> {
    let conn = Connection::session().await?;
    Ok(FocusGuardDaemonProxy::new(&conn).await?)
}

/// Turns the daemon's `success` / `error:<reason>` replies into a `Result`.
pub fn check_reply(reply: &str) -> Result<()> {
    match reply.strip_prefix("error:") {
        Some(reason) => bail!("daemon refused the request: {}", reason),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reply() {
        assert!(check_reply("success").is_ok());
        let err = check_reply("error:not_found").unwrap_err();
        assert!(err.to_string().contains("not_found"));
    }
}
