use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::constant::{
    CAPABILITIES_ALWAYS_ENABLED, CAPABILITIES_CONFIGURABLE, CapabilityFlags, ServerStatusFlags,
};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::response::ErrPayloadBytes;

/// utf8mb4_general_ci
const DEFAULT_CHARSET: u8 = 45;
const MAX_PACKET_SIZE: u32 = 16_777_216;

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct HandshakeFixedFields {
    connection_id: U32LE,
    auth_data_part1: [u8; 8],
    filler: u8,
    capability_flags_lower: U16LE,
    charset: u8,
    status_flags: U16LE,
    capability_flags_upper: U16LE,
    auth_data_len: u8,
}

#[derive(Debug, Clone)]
pub struct InitialHandshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub auth_plugin_data: Vec<u8>,
    pub capability_flags: CapabilityFlags,
    pub charset: u8,
    pub status_flags: ServerStatusFlags,
    pub auth_plugin_name: Vec<u8>,
}

/// Read initial handshake packet from server
pub fn read_initial_handshake(payload: &[u8]) -> Result<InitialHandshake> {
    let (protocol_version, data) = read_int_1(payload)?;

    if protocol_version == 0xFF {
        return Err(ErrPayloadBytes(payload).into());
    }

    let (server_version, data) = read_string_null(data)?;

    let (fixed, rest) =
        HandshakeFixedFields::ref_from_prefix(data).map_err(|_| Error::InvalidPacket)?;

    let cap_bits = (u32::from(fixed.capability_flags_upper.get()) << 16)
        | u32::from(fixed.capability_flags_lower.get());
    let capability_flags = CapabilityFlags::from_bits_truncate(cap_bits);

    let (_reserved, rest) = read_string_fix(rest, 10)?;

    let auth_data_2_len = usize::from(fixed.auth_data_len).saturating_sub(9).max(12);
    let (auth_data_2, rest) = read_string_fix(rest, auth_data_2_len)?;
    let (_terminator, rest) = read_int_1(rest)?;

    let mut auth_plugin_data = Vec::with_capacity(8 + auth_data_2.len());
    auth_plugin_data.extend_from_slice(&fixed.auth_data_part1);
    auth_plugin_data.extend_from_slice(auth_data_2);

    // Some servers omit the trailing NUL of the plugin name
    let auth_plugin_name = match read_string_null(rest) {
        Ok((name, _)) => name,
        Err(_) => rest,
    };

    Ok(InitialHandshake {
        protocol_version,
        server_version: String::from_utf8_lossy(server_version).into_owned(),
        connection_id: fixed.connection_id.get(),
        auth_plugin_data,
        capability_flags,
        charset: fixed.charset,
        status_flags: ServerStatusFlags::from_bits_truncate(fixed.status_flags.get()),
        auth_plugin_name: auth_plugin_name.to_vec(),
    })
}

/// Handshake response packet sent by client (HandshakeResponse41)
#[derive(Debug, Clone)]
pub struct HandshakeResponse41<'a> {
    pub capability_flags: CapabilityFlags,
    pub max_packet_size: u32,
    pub charset: u8,
    pub username: &'a str,
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub auth_plugin_name: &'a [u8],
}

/// Write handshake response packet (HandshakeResponse41)
pub fn write_handshake_response(out: &mut Vec<u8>, response: &HandshakeResponse41<'_>) {
    write_int_4(out, response.capability_flags.bits());
    write_int_4(out, response.max_packet_size);
    write_int_1(out, response.charset);

    // reserved (23 bytes of 0x00)
    out.extend_from_slice(&[0u8; 23]);

    write_string_null(out, response.username);

    if response
        .capability_flags
        .contains(CapabilityFlags::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA)
    {
        write_bytes_lenenc(out, response.auth_response);
    } else {
        // auth responses are at most 32 bytes
        write_int_1(out, response.auth_response.len() as u8);
        out.extend_from_slice(response.auth_response);
    }

    if let Some(db) = response.database
        && response
            .capability_flags
            .contains(CapabilityFlags::CLIENT_CONNECT_WITH_DB)
    {
        write_string_null(out, db);
    }

    if response
        .capability_flags
        .contains(CapabilityFlags::CLIENT_PLUGIN_AUTH)
    {
        out.extend_from_slice(response.auth_plugin_name);
        out.push(0);
    }
}

/// Auth switch request from server
#[derive(Debug, Clone)]
pub struct AuthSwitchRequest<'a> {
    pub plugin_name: &'a [u8],
    pub plugin_data: &'a [u8],
}

/// Read auth switch request (0xFE with length >= 9)
pub fn read_auth_switch_request(payload: &[u8]) -> Result<AuthSwitchRequest<'_>> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFE {
        return Err(Error::InvalidPacket);
    }

    let (plugin_name, data) = read_string_null(data)?;
    let plugin_data = data.strip_suffix(&[0]).unwrap_or(data);

    Ok(AuthSwitchRequest {
        plugin_name,
        plugin_data,
    })
}

// ============================================================================
// Authentication Plugins
// ============================================================================

/// mysql_native_password authentication
///
/// Formula: SHA1(password) XOR SHA1(challenge + SHA1(SHA1(password)))
pub fn auth_mysql_native_password(password: &str, challenge: &[u8]) -> [u8; 20] {
    use sha1::{Digest, Sha1};

    if password.is_empty() {
        return [0u8; 20];
    }

    let stage1_hash = Sha1::digest(password.as_bytes());
    let stage2_hash = Sha1::digest(stage1_hash);

    let mut hasher = Sha1::new();
    hasher.update(challenge);
    hasher.update(stage2_hash);
    let token_hash = hasher.finalize();

    let mut result = [0u8; 20];
    for (out, (a, b)) in result.iter_mut().zip(stage1_hash.iter().zip(token_hash.iter())) {
        *out = a ^ b;
    }
    result
}

/// caching_sha2_password authentication - initial response
///
/// Formula: XOR(SHA256(password), SHA256(SHA256(SHA256(password)), challenge))
pub fn auth_caching_sha2_password(password: &str, challenge: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    if password.is_empty() {
        return [0u8; 32];
    }

    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);

    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(challenge);
    let scramble = hasher.finalize();

    let mut result = [0u8; 32];
    for (out, (a, b)) in result.iter_mut().zip(stage1.iter().zip(scramble.iter())) {
        *out = a ^ b;
    }
    result
}

/// Compute the auth response for `plugin`.
///
/// An empty password always yields an empty response.
fn auth_response(plugin: &[u8], password: &str, challenge: &[u8]) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Ok(Vec::new());
    }
    match plugin {
        b"mysql_native_password" => Ok(auth_mysql_native_password(password, challenge).to_vec()),
        b"caching_sha2_password" => Ok(auth_caching_sha2_password(password, challenge).to_vec()),
        plugin => Err(Error::UnsupportedAuthPlugin(
            String::from_utf8_lossy(plugin).into_owned(),
        )),
    }
}

/// caching_sha2_password fast auth result, sent as `0x01` AuthMoreData
///
/// - 0x03 (fast auth success) - cached authentication succeeded, an OK packet follows
/// - 0x04 (full auth required) - need to send password via RSA or TLS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachingSha2PasswordFastAuthResult {
    Success,
    FullAuthRequired,
}

/// Read caching_sha2_password fast auth result
pub fn read_caching_sha2_password_fast_auth_result(
    payload: &[u8],
) -> Result<CachingSha2PasswordFastAuthResult> {
    match payload {
        [0x01, 0x03] => Ok(CachingSha2PasswordFastAuthResult::Success),
        [0x01, 0x04] => Ok(CachingSha2PasswordFastAuthResult::FullAuthRequired),
        _ => Err(Error::InvalidPacket),
    }
}

// ============================================================================
// State Machine API for Handshake
// ============================================================================

/// Configuration for handshake
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub username: String,
    pub password: String,
    pub database: Option<String>,
    pub capabilities: CapabilityFlags,
}

/// Result of driving the handshake state machine
#[derive(Debug)]
pub enum HandshakeResult {
    /// Initial handshake received - write response to server
    InitialHandshake {
        handshake_response: Vec<u8>,
        initial_handshake: InitialHandshake,
    },
    /// Write this packet to the server, then read next response
    Write(Vec<u8>),
    /// Read the next packet without writing anything
    NeedPayload,
    /// Handshake complete, connection established
    Connected { capability_flags: CapabilityFlags },
}

/// State machine for MySQL handshake
///
/// Pure parsing and packet generation state machine without I/O dependencies.
#[derive(Debug)]
pub enum Handshake {
    /// Waiting for initial handshake from server
    Start { config: HandshakeConfig },
    /// Sent handshake response (or auth switch response), waiting for auth result
    WaitingAuthResult {
        password: String,
        plugin: Vec<u8>,
        capability_flags: CapabilityFlags,
        switched: bool,
    },
    /// Connected (terminal state)
    Connected,
}

impl Handshake {
    /// Create a new handshake state machine
    pub fn new(config: HandshakeConfig) -> Self {
        Self::Start { config }
    }

    /// Drive the state machine with the next payload
    pub fn drive(&mut self, payload: &[u8]) -> Result<HandshakeResult> {
        match self {
            Self::Start { config } => {
                let handshake = read_initial_handshake(payload)?;

                let mut client_caps =
                    CAPABILITIES_ALWAYS_ENABLED | (config.capabilities & CAPABILITIES_CONFIGURABLE);
                if config.database.is_some() {
                    client_caps |= CapabilityFlags::CLIENT_CONNECT_WITH_DB;
                }
                let negotiated_caps = client_caps & handshake.capability_flags;

                if !negotiated_caps.contains(CapabilityFlags::CLIENT_PROTOCOL_41) {
                    return Err(Error::BadConfigError(
                        "server does not support protocol 4.1".to_string(),
                    ));
                }

                let auth_response = auth_response(
                    &handshake.auth_plugin_name,
                    &config.password,
                    &handshake.auth_plugin_data,
                )?;

                let response = HandshakeResponse41 {
                    capability_flags: negotiated_caps,
                    max_packet_size: MAX_PACKET_SIZE,
                    charset: DEFAULT_CHARSET,
                    username: &config.username,
                    auth_response: &auth_response,
                    database: config.database.as_deref(),
                    auth_plugin_name: &handshake.auth_plugin_name,
                };

                let mut handshake_response = Vec::new();
                write_handshake_response(&mut handshake_response, &response);

                *self = Self::WaitingAuthResult {
                    password: std::mem::take(&mut config.password),
                    plugin: handshake.auth_plugin_name.clone(),
                    capability_flags: negotiated_caps,
                    switched: false,
                };

                Ok(HandshakeResult::InitialHandshake {
                    handshake_response,
                    initial_handshake: handshake,
                })
            }

            Self::WaitingAuthResult {
                password,
                plugin,
                capability_flags,
                switched,
            } => match payload.first() {
                Some(0x00) => {
                    let result = HandshakeResult::Connected {
                        capability_flags: *capability_flags,
                    };
                    *self = Self::Connected;
                    Ok(result)
                }
                Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
                Some(0x01) if plugin.as_slice() == b"caching_sha2_password" => {
                    match read_caching_sha2_password_fast_auth_result(payload)? {
                        CachingSha2PasswordFastAuthResult::Success => {
                            Ok(HandshakeResult::NeedPayload)
                        }
                        CachingSha2PasswordFastAuthResult::FullAuthRequired => {
                            Err(Error::UnsupportedAuthPlugin(
                                "caching_sha2_password full authentication (requires TLS or RSA)"
                                    .to_string(),
                            ))
                        }
                    }
                }
                Some(0xFE) if !*switched => {
                    let auth_switch = read_auth_switch_request(payload)?;
                    let response =
                        auth_response(auth_switch.plugin_name, password, auth_switch.plugin_data)?;
                    *plugin = auth_switch.plugin_name.to_vec();
                    *switched = true;
                    Ok(HandshakeResult::Write(response))
                }
                _ => Err(Error::InvalidPacket),
            },

            Self::Connected => Err(Error::InvalidPacket),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// MySQL 8 style initial handshake with the given plugin name
    fn initial_handshake(plugin: &[u8], capabilities: CapabilityFlags) -> Vec<u8> {
        let mut out = vec![0x0a];
        out.extend_from_slice(b"8.0.36\0");
        write_int_4(&mut out, 42);
        out.extend_from_slice(b"abcdefgh");
        out.push(0);
        write_int_2(&mut out, (capabilities.bits() & 0xFFFF) as u16);
        out.push(DEFAULT_CHARSET);
        write_int_2(&mut out, ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT.bits());
        write_int_2(&mut out, (capabilities.bits() >> 16) as u16);
        out.push(21);
        out.extend_from_slice(&[0u8; 10]);
        out.extend_from_slice(b"ijklmnopqrst\0");
        out.extend_from_slice(plugin);
        out.push(0);
        out
    }

    fn config(password: &str) -> HandshakeConfig {
        HandshakeConfig {
            username: "root".to_string(),
            password: password.to_string(),
            database: Some("test".to_string()),
            capabilities: CapabilityFlags::empty(),
        }
    }

    #[test]
    fn test_read_initial_handshake() {
        let payload = initial_handshake(b"mysql_native_password", CapabilityFlags::all());
        let hs = read_initial_handshake(&payload).unwrap();
        assert_eq!(hs.server_version, "8.0.36");
        assert_eq!(hs.connection_id, 42);
        assert_eq!(hs.auth_plugin_data, b"abcdefghijklmnopqrst");
        assert_eq!(hs.auth_plugin_name, b"mysql_native_password");
        assert_eq!(hs.charset, DEFAULT_CHARSET);
    }

    #[test]
    fn test_native_password_known_vector() {
        // empty password is sent as an empty response
        assert_eq!(auth_mysql_native_password("", b"x"), [0u8; 20]);
        let a = auth_mysql_native_password("secret", b"abcdefghijklmnopqrst");
        let b = auth_mysql_native_password("secret", b"abcdefghijklmnopqrsu");
        assert_ne!(a, b);
    }

    #[test]
    fn test_handshake_fast_auth() {
        let mut hs = Handshake::new(config("pw"));
        let payload = initial_handshake(b"caching_sha2_password", CapabilityFlags::all());

        let HandshakeResult::InitialHandshake {
            handshake_response, ..
        } = hs.drive(&payload).unwrap()
        else {
            panic!("expected handshake response");
        };
        let caps = u32::from_le_bytes([
            handshake_response[0],
            handshake_response[1],
            handshake_response[2],
            handshake_response[3],
        ]);
        let caps = CapabilityFlags::from_bits_truncate(caps);
        assert!(caps.contains(CapabilityFlags::CLIENT_DEPRECATE_EOF));
        assert!(caps.contains(CapabilityFlags::CLIENT_CONNECT_WITH_DB));
        assert!(!caps.contains(CapabilityFlags::CLIENT_SSL));

        assert!(matches!(
            hs.drive(&[0x01, 0x03]).unwrap(),
            HandshakeResult::NeedPayload
        ));
        assert!(matches!(
            hs.drive(&[0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]).unwrap(),
            HandshakeResult::Connected { .. }
        ));
        assert!(matches!(hs, Handshake::Connected));
    }

    #[test]
    fn test_handshake_full_auth_unsupported() {
        let mut hs = Handshake::new(config("pw"));
        let payload = initial_handshake(b"caching_sha2_password", CapabilityFlags::all());
        hs.drive(&payload).unwrap();
        assert!(matches!(
            hs.drive(&[0x01, 0x04]),
            Err(Error::UnsupportedAuthPlugin(_))
        ));
    }

    #[test]
    fn test_handshake_auth_switch() {
        let mut hs = Handshake::new(config("pw"));
        let payload = initial_handshake(b"caching_sha2_password", CapabilityFlags::all());
        hs.drive(&payload).unwrap();

        let mut switch = vec![0xFE];
        switch.extend_from_slice(b"mysql_native_password\0");
        switch.extend_from_slice(b"abcdefghijklmnopqrst\0");
        let HandshakeResult::Write(response) = hs.drive(&switch).unwrap() else {
            panic!("expected auth switch response");
        };
        assert_eq!(
            response,
            auth_mysql_native_password("pw", b"abcdefghijklmnopqrst")
        );

        // a second switch is rejected
        assert!(matches!(hs.drive(&switch), Err(Error::InvalidPacket)));
    }

    #[test]
    fn test_handshake_unknown_plugin() {
        let mut hs = Handshake::new(config("pw"));
        let payload = initial_handshake(b"sha256_password", CapabilityFlags::all());
        assert!(matches!(
            hs.drive(&payload),
            Err(Error::UnsupportedAuthPlugin(name)) if name == "sha256_password"
        ));
    }

    #[test]
    fn test_handshake_auth_failure() {
        let mut hs = Handshake::new(config(""));
        let payload = initial_handshake(b"mysql_native_password", CapabilityFlags::all());
        hs.drive(&payload).unwrap();
        let err = [
            0xFF, 0x15, 0x04, b'#', b'2', b'8', b'0', b'0', b'0', b'd', b'e', b'n', b'y',
        ];
        assert!(matches!(
            hs.drive(&err),
            Err(Error::ServerError(e)) if e.error_code == 1045
        ));
    }
}
