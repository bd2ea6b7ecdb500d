/// Status code type alias.
#[allow(non_camel_case_types)]
pub type status_code_t = u16;

/// Common status codes (0-999).
pub mod StatusCode {
    use super::status_code_t;

    pub const OK: status_code_t = 0;
    pub const INVALID_ARG: status_code_t = 3;
    pub const SERDE_INVALID_JSON: status_code_t = 50;
    pub const IO_ERROR: status_code_t = 69;
    pub const UNKNOWN: status_code_t = 999;
}

/// Manifest / file metadata status codes (3xxx).
pub mod MetaCode {
    use super::status_code_t;

    pub const NOT_FOUND: status_code_t = 3000;
    pub const INCONSISTENT: status_code_t = 3009;
    pub const STORE_IO_FAILED: status_code_t = 3020;
}

/// Chunk storage status codes (4xxx).
pub mod StorageCode {
    use super::status_code_t;

    pub const CHUNK_NOT_FOUND: status_code_t = 4001;
    pub const CHUNK_READ_FAILED: status_code_t = 4010;
    pub const CHUNK_WRITE_FAILED: status_code_t = 4011;
    pub const CHUNK_REMOVE_FAILED: status_code_t = 4012;
    pub const CHUNK_DATA_MISSING: status_code_t = 4013;
    pub const CHECKSUM_MISMATCH: status_code_t = 4080;
    pub const INSUFFICIENT_CAPACITY: status_code_t = 4100;
    pub const INSUFFICIENT_REPLICAS: status_code_t = 4101;
}

/// Node registry status codes (5xxx).
pub mod MgmtdCode {
    use super::status_code_t;

    pub const NODE_NOT_FOUND: status_code_t = 5001;
    pub const INVALID_NODE_STATUS: status_code_t = 5002;
    pub const NODE_STATUS_PERSIST_FAILED: status_code_t = 5003;
}

/// Admin CLI status codes (10xxx).
pub mod CliCode {
    use super::status_code_t;

    pub const WRONG_USAGE: status_code_t = 10000;
}

/// Classification of status code ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum StatusCodeType {
    Invalid = -1,
    Common = 0,
    Meta = 3,
    Storage = 4,
    Mgmtd = 5,
    Cli = 9,
}

/// Determine the type/category of a status code.
pub fn type_of(code: status_code_t) -> StatusCodeType {
    match code {
        0..=999 => StatusCodeType::Common,
        3000..=3999 => StatusCodeType::Meta,
        4000..=4999 => StatusCodeType::Storage,
        5000..=5999 => StatusCodeType::Mgmtd,
        10000..=10999 => StatusCodeType::Cli,
        _ => StatusCodeType::Invalid,
    }
}

/// Convert a status code to its human-readable name.
pub fn to_string(code: status_code_t) -> &'static str {
    match code {
        // Common
        StatusCode::OK => "OK",
        StatusCode::INVALID_ARG => "InvalidArg",
        StatusCode::SERDE_INVALID_JSON => "SerdeInvalidJson",
        StatusCode::IO_ERROR => "IOError",
        StatusCode::UNKNOWN => "Unknown",

        // Meta
        MetaCode::NOT_FOUND => "Meta::NotFound",
        MetaCode::INCONSISTENT => "Meta::Inconsistent",
        MetaCode::STORE_IO_FAILED => "Meta::StoreIoFailed",

        // Storage
        StorageCode::CHUNK_NOT_FOUND => "Storage::ChunkNotFound",
        StorageCode::CHUNK_READ_FAILED => "Storage::ChunkReadFailed",
        StorageCode::CHUNK_WRITE_FAILED => "Storage::ChunkWriteFailed",
        StorageCode::CHUNK_REMOVE_FAILED => "Storage::ChunkRemoveFailed",
        StorageCode::CHUNK_DATA_MISSING => "Storage::ChunkDataMissing",
        StorageCode::CHECKSUM_MISMATCH => "Storage::ChecksumMismatch",
        StorageCode::INSUFFICIENT_CAPACITY => "Storage::InsufficientCapacity",
        StorageCode::INSUFFICIENT_REPLICAS => "Storage::InsufficientReplicas",

        // Mgmtd
        MgmtdCode::NODE_NOT_FOUND => "Mgmtd::NodeNotFound",
        MgmtdCode::INVALID_NODE_STATUS => "Mgmtd::InvalidNodeStatus",
        MgmtdCode::NODE_STATUS_PERSIST_FAILED => "Mgmtd::NodeStatusPersistFailed",

        // Cli
        CliCode::WRONG_USAGE => "Cli::WrongUsage",

        _ => "UnknownStatusCode",
    }
}

/// Whether a code means "the thing asked for does not exist".
pub fn is_not_found(code: status_code_t) -> bool {
    matches!(
        code,
        MetaCode::NOT_FOUND | StorageCode::CHUNK_NOT_FOUND | MgmtdCode::NODE_NOT_FOUND
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::OK, 0);
        assert_eq!(StatusCode::UNKNOWN, 999);
        assert_eq!(MetaCode::NOT_FOUND, 3000);
        assert_eq!(StorageCode::CHUNK_NOT_FOUND, 4001);
        assert_eq!(MgmtdCode::NODE_NOT_FOUND, 5001);
        assert_eq!(CliCode::WRONG_USAGE, 10000);
    }

    #[test]
    fn test_type_of() {
        assert_eq!(type_of(StatusCode::OK), StatusCodeType::Common);
        assert_eq!(type_of(StatusCode::UNKNOWN), StatusCodeType::Common);
        assert_eq!(type_of(MetaCode::NOT_FOUND), StatusCodeType::Meta);
        assert_eq!(type_of(StorageCode::INSUFFICIENT_CAPACITY), StatusCodeType::Storage);
        assert_eq!(type_of(MgmtdCode::NODE_NOT_FOUND), StatusCodeType::Mgmtd);
        assert_eq!(type_of(CliCode::WRONG_USAGE), StatusCodeType::Cli);
        assert_eq!(type_of(9000), StatusCodeType::Invalid);
        assert_eq!(type_of(65535), StatusCodeType::Invalid);
    }

    #[test]
    fn test_to_string() {
        assert_eq!(to_string(StatusCode::OK), "OK");
        assert_eq!(to_string(StatusCode::INVALID_ARG), "InvalidArg");
        assert_eq!(to_string(MetaCode::NOT_FOUND), "Meta::NotFound");
        assert_eq!(
            to_string(StorageCode::INSUFFICIENT_CAPACITY),
            "Storage::InsufficientCapacity"
        );
        assert_eq!(to_string(MgmtdCode::NODE_NOT_FOUND), "Mgmtd::NodeNotFound");
        assert_eq!(to_string(StorageCode::CHECKSUM_MISMATCH), "Storage::ChecksumMismatch");
        assert_eq!(to_string(12345), "UnknownStatusCode");
    }

    #[test]
    fn test_is_not_found() {
        assert!(is_not_found(MetaCode::NOT_FOUND));
        assert!(is_not_found(StorageCode::CHUNK_NOT_FOUND));
        assert!(is_not_found(MgmtdCode::NODE_NOT_FOUND));
        assert!(!is_not_found(StorageCode::CHECKSUM_MISMATCH));
    }
}
