// src/services/codec.rs
use crate::errors::StagingError;
use crate::models::TransmittableImage;
use base64::{Engine as _, engine::general_purpose};

/// Base64-encodes raw image bytes for the remote-call boundary.
pub fn encode_for_transmission(
    data: &[u8],
    mime_type: &str,
) -> Result<TransmittableImage, StagingError> {
    if data.is_empty() {
        return Err(StagingError::Read("Empty image payload".to_string()));
    }
    Ok(TransmittableImage {
        mime_type: mime_type.to_string(),
        payload: general_purpose::STANDARD.encode(data),
    })
}

/// Produces a displayable data URI from a transmittable payload. Nothing
/// is written to disk; the reference embeds the bytes directly.
pub fn decode_from_transmission(payload: &str, mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, payload)
}

/// Recovers the MIME type and payload from a data URI previously produced
/// by [`decode_from_transmission`], so an already-generated image can feed
/// a follow-up edit call.
pub fn parse_transmittable_from_reference(
    reference: &str,
) -> Result<TransmittableImage, StagingError> {
    let rest = reference
        .strip_prefix("data:")
        .ok_or_else(|| StagingError::Format("Missing data: header".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StagingError::Format("Missing comma separator".to_string()))?;

    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| StagingError::Format("Missing base64 marker".to_string()))?;

    if mime_type.is_empty() {
        return Err(StagingError::Format("Missing MIME type".to_string()));
    }

    Ok(TransmittableImage {
        mime_type: mime_type.to_string(),
        payload: payload.to_string(),
    })
}

/// Decodes a transmittable payload back to raw bytes.
pub fn payload_bytes(image: &TransmittableImage) -> Result<Vec<u8>, StagingError> {
    general_purpose::STANDARD
        .decode(&image.payload)
        .map_err(|e| StagingError::Format(format!("Invalid base64 payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_rejects_empty_input() {
        let err = encode_for_transmission(&[], "image/png").unwrap_err();
        assert!(matches!(err, StagingError::Read(_)));
    }

    #[test]
    fn reference_round_trips_transmittable() {
        let original = encode_for_transmission(b"\x89PNG fake bytes", "image/png").unwrap();
        let reference = decode_from_transmission(&original.payload, &original.mime_type);
        let recovered = parse_transmittable_from_reference(&reference).unwrap();
        assert_eq!(recovered, original);
    }

    #[test]
    fn payload_decodes_to_original_bytes() {
        let bytes = b"jpeg-ish bytes".to_vec();
        let t = encode_for_transmission(&bytes, "image/jpeg").unwrap();
        assert_eq!(payload_bytes(&t).unwrap(), bytes);
    }

    #[test]
    fn parse_rejects_missing_header() {
        let err = parse_transmittable_from_reference("image/png;base64,AAAA").unwrap_err();
        assert!(matches!(err, StagingError::Format(_)));
    }

    #[test]
    fn parse_rejects_missing_comma() {
        let err = parse_transmittable_from_reference("data:image/png;base64AAAA").unwrap_err();
        assert!(matches!(err, StagingError::Format(_)));
    }

    #[test]
    fn parse_rejects_missing_base64_marker() {
        let err = parse_transmittable_from_reference("data:image/png,AAAA").unwrap_err();
        assert!(matches!(err, StagingError::Format(_)));
    }
}
