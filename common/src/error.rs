use lazy_static::lazy_static;
use primitive_types::U256;
use thiserror::Error;

use crate::{
    config::*,
    contract::Revert,
    crypto::{selector, Address, Selector},
    serializer::{Reader, ReaderError, Writer},
};

/// Failures raised by the execution host itself.
///
/// These are never produced by contract code: they describe what the
/// host refused to do on behalf of a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("State modification attempted in a static call")]
    StaticStateChange,

    #[error("Call depth exceeded: maximum {max}")]
    CallDepthExceeded { max: usize },

    #[error("Insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: U256, have: U256 },

    #[error("Address {address} is already in use")]
    AddressInUse { address: Address },

    #[error("No code at address {address}")]
    NoCode { address: Address },

    #[error("The zero address cannot hold code")]
    ZeroAddress,
}

impl HostError {
    const TAG_STATIC_STATE_CHANGE: u8 = 0;
    const TAG_CALL_DEPTH_EXCEEDED: u8 = 1;
    const TAG_INSUFFICIENT_BALANCE: u8 = 2;
    const TAG_ADDRESS_IN_USE: u8 = 3;
    const TAG_NO_CODE: u8 = 4;
    const TAG_ZERO_ADDRESS: u8 = 5;

    fn write(&self, writer: &mut Writer) {
        match self {
            Self::StaticStateChange => writer.write_u8(Self::TAG_STATIC_STATE_CHANGE),
            Self::CallDepthExceeded { max } => {
                writer.write_u8(Self::TAG_CALL_DEPTH_EXCEEDED);
                writer.write_u256(U256::from(*max));
            }
            Self::InsufficientBalance { need, have } => {
                writer.write_u8(Self::TAG_INSUFFICIENT_BALANCE);
                writer.write_u256(*need);
                writer.write_u256(*have);
            }
            Self::AddressInUse { address } => {
                writer.write_u8(Self::TAG_ADDRESS_IN_USE);
                writer.write_address(address);
            }
            Self::NoCode { address } => {
                writer.write_u8(Self::TAG_NO_CODE);
                writer.write_address(address);
            }
            Self::ZeroAddress => writer.write_u8(Self::TAG_ZERO_ADDRESS),
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let tag = reader.read_u8()?;
        let err = match tag {
            Self::TAG_STATIC_STATE_CHANGE => Self::StaticStateChange,
            Self::TAG_CALL_DEPTH_EXCEEDED => Self::CallDepthExceeded {
                max: reader.read_u256()?.low_u64() as usize,
            },
            Self::TAG_INSUFFICIENT_BALANCE => Self::InsufficientBalance {
                need: reader.read_u256()?,
                have: reader.read_u256()?,
            },
            Self::TAG_ADDRESS_IN_USE => Self::AddressInUse {
                address: reader.read_address()?,
            },
            Self::TAG_NO_CODE => Self::NoCode {
                address: reader.read_address()?,
            },
            Self::TAG_ZERO_ADDRESS => Self::ZeroAddress,
            _ => return Err(ReaderError::InvalidTag(tag)),
        };
        Ok(err)
    }

    /// Failure payload reported to the caller of a frame the host aborted.
    pub fn to_revert_data(&self) -> Vec<u8> {
        ProxyError::Host(self.clone()).encode()
    }
}

/// Every way a proxy operation can fail.
///
/// All variants abort the enclosing operation; the host rolls back any
/// state written by the failed frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("Unauthorized: {caller} is not the proxy admin")]
    Unauthorized { caller: Address },

    #[error("Address {address} has no code")]
    NotAContract { address: Address },

    #[error("New admin cannot be the zero address")]
    ZeroAdmin,

    #[error("No implementation installed")]
    NoImplementation,

    #[error("Initialization call failed ({} bytes of failure data)", .reason.len())]
    Initialization { reason: Vec<u8> },

    #[error("Setup call to new implementation failed ({} bytes of failure data)", .reason.len())]
    SetupCallFailed { reason: Vec<u8> },

    /// Failure of the forwarded call, relayed untouched.
    #[error("Implementation reverted ({} bytes of failure data)", .0.len())]
    LogicReverted(Vec<u8>),

    #[error("Malformed call: {reason}")]
    MalformedCall { reason: String },

    #[error("Setup payload of {size} bytes exceeds maximum {max}")]
    SetupPayloadTooLarge { size: usize, max: usize },

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

lazy_static! {
    static ref UNAUTHORIZED_SELECTOR: Selector = selector(UNAUTHORIZED_ERROR_SIGNATURE);
    static ref NOT_A_CONTRACT_SELECTOR: Selector = selector(NOT_A_CONTRACT_ERROR_SIGNATURE);
    static ref ZERO_ADMIN_SELECTOR: Selector = selector(ZERO_ADMIN_ERROR_SIGNATURE);
    static ref NO_IMPLEMENTATION_SELECTOR: Selector = selector(NO_IMPLEMENTATION_ERROR_SIGNATURE);
    static ref INITIALIZATION_SELECTOR: Selector = selector(INITIALIZATION_ERROR_SIGNATURE);
    static ref SETUP_CALL_FAILED_SELECTOR: Selector = selector(SETUP_CALL_FAILED_ERROR_SIGNATURE);
    static ref MALFORMED_CALL_SELECTOR: Selector = selector(MALFORMED_CALL_ERROR_SIGNATURE);
    static ref SETUP_PAYLOAD_TOO_LARGE_SELECTOR: Selector =
        selector(SETUP_PAYLOAD_TOO_LARGE_ERROR_SIGNATURE);
    static ref HOST_ERROR_SELECTOR: Selector = selector(HOST_ERROR_SIGNATURE);
}

impl ProxyError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedCall {
            reason: reason.into(),
        }
    }

    /// Failure payload as seen by the caller.
    ///
    /// A relayed logic failure is returned byte for byte; every other
    /// variant is `selector ‖ arguments`.
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        match self {
            Self::LogicReverted(data) => return data.clone(),
            Self::Unauthorized { caller } => {
                writer.write_bytes(&*UNAUTHORIZED_SELECTOR);
                writer.write_address(caller);
            }
            Self::NotAContract { address } => {
                writer.write_bytes(&*NOT_A_CONTRACT_SELECTOR);
                writer.write_address(address);
            }
            Self::ZeroAdmin => writer.write_bytes(&*ZERO_ADMIN_SELECTOR),
            Self::NoImplementation => writer.write_bytes(&*NO_IMPLEMENTATION_SELECTOR),
            Self::Initialization { reason } => {
                writer.write_bytes(&*INITIALIZATION_SELECTOR);
                writer.write_payload(reason);
            }
            Self::SetupCallFailed { reason } => {
                writer.write_bytes(&*SETUP_CALL_FAILED_SELECTOR);
                writer.write_payload(reason);
            }
            Self::MalformedCall { reason } => {
                writer.write_bytes(&*MALFORMED_CALL_SELECTOR);
                writer.write_string(reason);
            }
            Self::SetupPayloadTooLarge { size, max } => {
                writer.write_bytes(&*SETUP_PAYLOAD_TOO_LARGE_SELECTOR);
                writer.write_u256(U256::from(*size));
                writer.write_u256(U256::from(*max));
            }
            Self::Host(err) => {
                writer.write_bytes(&*HOST_ERROR_SELECTOR);
                err.write(&mut writer);
            }
        }
        writer.bytes()
    }

    /// Recover a typed error from failure data.
    ///
    /// Returns `None` when the data does not carry one of the proxy's
    /// own errors, which is the case for relayed logic failures.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < SELECTOR_SIZE {
            return None;
        }

        let (head, args) = data.split_at(SELECTOR_SIZE);
        let mut reader = Reader::new(args);
        let err = if head == &UNAUTHORIZED_SELECTOR[..] {
            Self::Unauthorized {
                caller: reader.read_address().ok()?,
            }
        } else if head == &NOT_A_CONTRACT_SELECTOR[..] {
            Self::NotAContract {
                address: reader.read_address().ok()?,
            }
        } else if head == &ZERO_ADMIN_SELECTOR[..] {
            Self::ZeroAdmin
        } else if head == &NO_IMPLEMENTATION_SELECTOR[..] {
            Self::NoImplementation
        } else if head == &INITIALIZATION_SELECTOR[..] {
            Self::Initialization {
                reason: reader.read_payload().ok()?.to_vec(),
            }
        } else if head == &SETUP_CALL_FAILED_SELECTOR[..] {
            Self::SetupCallFailed {
                reason: reader.read_payload().ok()?.to_vec(),
            }
        } else if head == &MALFORMED_CALL_SELECTOR[..] {
            Self::MalformedCall {
                reason: reader.read_string().ok()?,
            }
        } else if head == &SETUP_PAYLOAD_TOO_LARGE_SELECTOR[..] {
            Self::SetupPayloadTooLarge {
                size: reader.read_u256().ok()?.low_u64() as usize,
                max: reader.read_u256().ok()?.low_u64() as usize,
            }
        } else if head == &HOST_ERROR_SELECTOR[..] {
            Self::Host(HostError::read(&mut reader).ok()?)
        } else {
            return None;
        };

        reader.finish().ok()?;
        Some(err)
    }

    /// Category used in logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "authorization",
            Self::NotAContract { .. } | Self::ZeroAdmin | Self::SetupPayloadTooLarge { .. } => {
                "validation"
            }
            Self::MalformedCall { .. } => "decoding",
            Self::NoImplementation | Self::LogicReverted(_) => "forwarding",
            Self::Initialization { .. } | Self::SetupCallFailed { .. } => "setup",
            Self::Host(_) => "host",
        }
    }
}

impl From<ProxyError> for Revert {
    fn from(err: ProxyError) -> Self {
        Revert::new(err.encode())
    }
}

impl From<HostError> for Revert {
    fn from(err: HostError) -> Self {
        Revert::new(err.to_revert_data())
    }
}

impl From<ReaderError> for ProxyError {
    fn from(err: ReaderError) -> Self {
        ProxyError::malformed(err.to_string())
    }
}
