use rkyv::bytecheck::CheckBytes;
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{AlignedVec, Archive, Deserialize, Serialize};

use crate::{Status, SCRATCH_SPACE};

pub(crate) fn to_uri_path(service: &str, path: &str) -> String {
    format!("/{}/{}", service, path)
}

/// Serializes a message into an aligned buffer ready to be sent.
pub(crate) fn encode<T>(value: &T) -> Result<AlignedVec, Status>
where
    T: Serialize<AllocSerializer<SCRATCH_SPACE>>,
{
    rkyv::to_bytes::<_, SCRATCH_SPACE>(value).map_err(|_| Status::invalid())
}

/// Serializes a status, falling back to an empty buffer if that fails.
///
/// An empty buffer is decoded by the receiving side as an invalid payload.
pub(crate) fn encode_status(status: &Status) -> AlignedVec {
    rkyv::to_bytes::<_, SCRATCH_SPACE>(status).unwrap_or_else(|e| {
        warn!(error = ?e, "Failed to serialize error message.");
        AlignedVec::new()
    })
}

/// Validates and deserializes a message from a received buffer.
///
/// The data is copied into an aligned buffer first as the transport makes no
/// guarantees about the alignment of the bytes it hands back.
pub(crate) fn decode<T>(data: &[u8]) -> Result<T, Status>
where
    T: Archive,
    T::Archived:
        for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, SharedDeserializeMap>,
{
    let mut aligned = AlignedVec::with_capacity(data.len());
    aligned.extend_from_slice(data);
    rkyv::from_bytes::<T>(&aligned).map_err(|_| Status::invalid())
}
