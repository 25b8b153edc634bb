/// How many blocks one historical-replay query spans
pub const SCAN_CHUNK: u64 = 500;

/// Attempts per chunk before a replay surfaces the RPC failure
pub const MAX_RETRIES: u32 = 5;

/// ERC-20 in the contract's token-type tag (721/1155 are reserved)
pub const TOKEN_TYPE_ERC20: u8 = 0;
