//! SASL PLAIN payload construction.
//!
//! Only the PLAIN mechanism is spoken here; the startup handler drives
//! the surrounding `AUTHENTICATE` exchange and numeric handling.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};

/// AUTHENTICATE parameters are limited to 400 bytes per line; longer
/// payloads continue on following lines, and a payload that is an
/// exact multiple of 400 is terminated by a lone `+`.
const AUTHENTICATE_CHUNK: usize = 400;

/// Base64 of `authzid \0 authcid \0 password`, with the account name
/// serving as both authorization and authentication identity.
pub fn plain_payload(username: &str, password: &SecretString) -> String {
    let identity = format!(
        "{}\0{}\0{}",
        username,
        username,
        password.expose_secret()
    );
    BASE64.encode(identity.as_bytes())
}

/// Splits an encoded payload into the `AUTHENTICATE` parameter
/// sequence the wire expects.
pub fn authenticate_params(payload: &str) -> Vec<String> {
    if payload.is_empty() {
        return vec!["+".to_string()];
    }

    let mut params: Vec<String> = payload
        .as_bytes()
        .chunks(AUTHENTICATE_CHUNK)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();

    if payload.len() % AUTHENTICATE_CHUNK == 0 {
        params.push("+".to_string());
    }
    params
}
