use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use super::Role;

#[derive(Deserialize)]
struct RoleClaim {
    role: Option<String>,
}

/// Reads the `role` claim from a JWT payload without checking the
/// signature. The result is a display hint only; the backend re-checks the
/// role on every privileged endpoint.
pub fn role_from_token(token: &str) -> Option<Role> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);

    let raw = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: RoleClaim = serde_json::from_slice(&raw).ok()?;

    claim.role.map(|role| {
        if role.eq_ignore_ascii_case("ADMIN") { Role::Admin } else { Role::User }
    })
}

/// Fallback when the token carries no role: only the literal `admin`
/// account is treated as an administrator.
pub fn role_from_username(username: &str) -> Role {
    if username == "admin" { Role::Admin } else { Role::User }
}
