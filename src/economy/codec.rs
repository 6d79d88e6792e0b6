//! Portable save strings for export/import.
//!
//! An export is a small JSON envelope `{"version": N, "data": "<base64>"}`
//! where `data` is the snapshot JSON XOR-scrambled with a fixed key. Import
//! accepts, in order: the envelope, a bare base64 payload, or plain
//! snapshot JSON.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::save::{self, SaveError, MIN_COMPATIBLE_VERSION, SAVE_VERSION};
use super::state::EconomyState;

const SCRAMBLE_KEY: &[u8] = b"message-idle";

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    data: String,
}

fn scramble(bytes: &mut [u8]) {
    for (i, b) in bytes.iter_mut().enumerate() {
        *b ^= SCRAMBLE_KEY[i % SCRAMBLE_KEY.len()];
    }
}

fn encode_payload(json: &str) -> String {
    let mut bytes = json.as_bytes().to_vec();
    scramble(&mut bytes);
    STANDARD.encode(bytes)
}

fn decode_payload(data: &str) -> Result<EconomyState, SaveError> {
    let mut bytes = STANDARD.decode(data.trim())?;
    scramble(&mut bytes);
    let json = String::from_utf8(bytes).map_err(|_| SaveError::InvalidSaveFile)?;
    save::decode_snapshot(&json)
}

fn decode_envelope(text: &str) -> Result<EconomyState, SaveError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if envelope.version < MIN_COMPATIBLE_VERSION {
        return Err(SaveError::IncompatibleVersion {
            saved: envelope.version,
            min: MIN_COMPATIBLE_VERSION,
        });
    }
    decode_payload(&envelope.data)
}

/// Encode the state as a portable save string.
pub fn export_save(state: &EconomyState) -> Result<String, SaveError> {
    let json = save::encode_snapshot(state)?;
    let envelope = Envelope {
        version: SAVE_VERSION,
        data: encode_payload(&json),
    };
    Ok(serde_json::to_string(&envelope)?)
}

type Decoder<'a> = &'a dyn Fn(&str) -> Result<EconomyState, SaveError>;

/// Run `decoders` in order and stop at the first success. A version
/// mismatch outranks plain parse failures in the returned error.
fn decode_first(text: &str, decoders: &[Decoder<'_>]) -> Result<EconomyState, SaveError> {
    let mut incompatible = None;
    for decode in decoders {
        match decode(text) {
            Ok(state) => return Ok(state),
            Err(e @ SaveError::IncompatibleVersion { .. }) => {
                incompatible.get_or_insert(e);
            }
            Err(_) => {}
        }
    }
    Err(incompatible.unwrap_or(SaveError::InvalidSaveFile))
}

/// Decode a save string produced by `export_save` (or an older plain form).
///
/// Nothing is applied here; the caller swaps the returned state in only on
/// success.
pub fn import_save(text: &str) -> Result<EconomyState, SaveError> {
    let decoded = decode_first(
        text.trim(),
        &[&decode_envelope, &decode_payload, &save::decode_snapshot],
    );
    if let Err(e) = &decoded {
        warn!(error = %e, "import rejected");
    }
    decoded
}
