// ===== RESERVED STORAGE SLOTS =====
// Labels hashed into the two slots owned by the proxy.
// slot = keccak256(label) - 1, so no known preimage maps to it
pub const IMPLEMENTATION_SLOT_LABEL: &str = "eip1967.proxy.implementation";
pub const ADMIN_SLOT_LABEL: &str = "eip1967.proxy.admin";

// Expected values of the derived slots, checked at startup by tests
pub const IMPLEMENTATION_SLOT_HEX: &str =
    "360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";
pub const ADMIN_SLOT_HEX: &str =
    "b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

// ===== CALL ENCODING =====
// Function selectors are the first 4 bytes of keccak256(signature)
pub const SELECTOR_SIZE: usize = 4;
pub const UPGRADE_TO_SIGNATURE: &str = "upgradeTo(address)";
pub const UPGRADE_TO_AND_CALL_SIGNATURE: &str = "upgradeToAndCall(address,bytes)";
pub const CHANGE_ADMIN_SIGNATURE: &str = "changeAdmin(address)";

// Length prefix used for variable-size payloads (u32 big-endian)
pub const PAYLOAD_LENGTH_SIZE: usize = 4;

// ===== EVENTS =====
pub const UPGRADED_EVENT_SIGNATURE: &str = "Upgraded(address)";
pub const ADMIN_CHANGED_EVENT_SIGNATURE: &str = "AdminChanged(address,address)";

// ===== ERRORS =====
// Custom error signatures, encoded as revert data
pub const UNAUTHORIZED_ERROR_SIGNATURE: &str = "Unauthorized(address)";
pub const NOT_A_CONTRACT_ERROR_SIGNATURE: &str = "NotAContract(address)";
pub const ZERO_ADMIN_ERROR_SIGNATURE: &str = "ZeroAdmin()";
pub const NO_IMPLEMENTATION_ERROR_SIGNATURE: &str = "NoImplementation()";
pub const INITIALIZATION_ERROR_SIGNATURE: &str = "InitializationFailed(bytes)";
pub const SETUP_CALL_FAILED_ERROR_SIGNATURE: &str = "SetupCallFailed(bytes)";
pub const MALFORMED_CALL_ERROR_SIGNATURE: &str = "MalformedCall(string)";
pub const SETUP_PAYLOAD_TOO_LARGE_ERROR_SIGNATURE: &str = "SetupPayloadTooLarge(uint256,uint256)";
pub const HOST_ERROR_SIGNATURE: &str = "HostError(string)";

// ===== LIMITS =====
// 1 KB = 1024 bytes
pub const BYTES_PER_KB: usize = 1024;

// Max size of the setup payload run at construction
pub const MAX_SETUP_PAYLOAD_SIZE: usize = 64 * BYTES_PER_KB;

// Max nesting of call frames in the execution host
pub const MAX_CALL_DEPTH: usize = 64;

// Static checks
static_assert!(
    SELECTOR_SIZE == 4,
    "Selectors are the first 4 bytes of a keccak digest"
);
static_assert!(
    MAX_CALL_DEPTH > 1,
    "A forwarded call needs at least two frames"
);
