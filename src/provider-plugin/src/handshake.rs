//! Launch checks run before the transport takes over stdout.
//!
//! The host proves it launched the plugin by setting a magic cookie, and may
//! list the plugin protocol versions it speaks. Both are checked here so a
//! plugin started by hand, or by a host that cannot speak to it, exits with a
//! clear error instead of printing a handshake nobody can use.

use thiserror::Error;

/// Cookie value a Terraform host sets in `TF_PLUGIN_MAGIC_COOKIE`.
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Plugin protocol version announced by the transport.
pub const TRANSPORT_PROTOCOL_VERSION: u32 = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandshakeError {
    #[error(
        "This binary is a plugin. These are not meant to be executed directly. \
         Please execute the program that consumes these plugins, which will \
         load any plugins automatically"
    )]
    NotLaunchedByHost,
    #[error("no common protocol version: host offers {offered:?}, plugin supports {supported}")]
    NoCommonProtocolVersion { offered: Vec<u32>, supported: u32 },
}

/// Fail unless the host presented the expected magic cookie.
pub fn verify_cookie(cookie: Option<&str>) -> Result<(), HandshakeError> {
    match cookie {
        Some(MAGIC_COOKIE_VALUE) => Ok(()),
        _ => Err(HandshakeError::NotLaunchedByHost),
    }
}

/// Confirm the host can speak the transport's protocol version.
///
/// A host that offers nothing is assumed to accept it.
pub fn negotiate_version(offered: &[u32]) -> Result<u32, HandshakeError> {
    if offered.is_empty() || offered.contains(&TRANSPORT_PROTOCOL_VERSION) {
        Ok(TRANSPORT_PROTOCOL_VERSION)
    } else {
        Err(HandshakeError::NoCommonProtocolVersion {
            offered: offered.to_vec(),
            supported: TRANSPORT_PROTOCOL_VERSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_must_match_exactly() {
        assert!(verify_cookie(Some(MAGIC_COOKIE_VALUE)).is_ok());
        assert_eq!(
            verify_cookie(Some("wrong")),
            Err(HandshakeError::NotLaunchedByHost)
        );
        assert_eq!(verify_cookie(None), Err(HandshakeError::NotLaunchedByHost));
    }

    #[test]
    fn host_offering_transport_version_accepted() {
        assert_eq!(negotiate_version(&[5, 6]), Ok(6));
        assert_eq!(negotiate_version(&[]), Ok(6));
    }

    #[test]
    fn protocol_five_only_host_rejected() {
        assert_eq!(
            negotiate_version(&[5]),
            Err(HandshakeError::NoCommonProtocolVersion {
                offered: vec![5],
                supported: 6,
            })
        );
    }
}
