use lazy_static::lazy_static;

use crate::{
    config::{
        CHANGE_ADMIN_SIGNATURE, SELECTOR_SIZE, UPGRADE_TO_AND_CALL_SIGNATURE,
        UPGRADE_TO_SIGNATURE,
    },
    crypto::{selector, Address, Selector, ADDRESS_SIZE},
    error::ProxyError,
    serializer::{payload_size, Reader, Writer},
};

lazy_static! {
    pub static ref UPGRADE_TO_SELECTOR: Selector = selector(UPGRADE_TO_SIGNATURE);
    pub static ref UPGRADE_TO_AND_CALL_SELECTOR: Selector = selector(UPGRADE_TO_AND_CALL_SIGNATURE);
    pub static ref CHANGE_ADMIN_SELECTOR: Selector = selector(CHANGE_ADMIN_SIGNATURE);
}

/// Administrative call recognized by the proxy dispatch.
///
/// Anything else is forwarded to the logic component untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyCall {
    UpgradeTo { logic: Address },
    UpgradeToAndCall { logic: Address, payload: Vec<u8> },
    ChangeAdmin { admin: Address },
}

impl ProxyCall {
    /// Classify a call payload.
    ///
    /// Returns `Ok(None)` when the payload is not an administrative call and
    /// must be forwarded.
    ///
    /// # Errors
    ///
    /// [`ProxyError::MalformedCall`] when the selector matches but the
    /// arguments do not decode exactly.
    pub fn decode(input: &[u8]) -> Result<Option<Self>, ProxyError> {
        if input.len() < SELECTOR_SIZE {
            return Ok(None);
        }

        let (head, args) = input.split_at(SELECTOR_SIZE);
        let mut reader = Reader::new(args);
        let call = if head == &UPGRADE_TO_SELECTOR[..] {
            Self::UpgradeTo {
                logic: reader.read_address()?,
            }
        } else if head == &UPGRADE_TO_AND_CALL_SELECTOR[..] {
            Self::UpgradeToAndCall {
                logic: reader.read_address()?,
                payload: reader.read_payload()?.to_vec(),
            }
        } else if head == &CHANGE_ADMIN_SELECTOR[..] {
            Self::ChangeAdmin {
                admin: reader.read_address()?,
            }
        } else {
            return Ok(None);
        };

        reader.finish()?;
        Ok(Some(call))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer;
        match self {
            Self::UpgradeTo { logic } => {
                writer = Writer::with_capacity(SELECTOR_SIZE + ADDRESS_SIZE);
                writer.write_bytes(&*UPGRADE_TO_SELECTOR);
                writer.write_address(logic);
            }
            Self::UpgradeToAndCall { logic, payload } => {
                writer = Writer::with_capacity(
                    SELECTOR_SIZE + ADDRESS_SIZE + payload_size(payload.len()),
                );
                writer.write_bytes(&*UPGRADE_TO_AND_CALL_SELECTOR);
                writer.write_address(logic);
                writer.write_payload(payload);
            }
            Self::ChangeAdmin { admin } => {
                writer = Writer::with_capacity(SELECTOR_SIZE + ADDRESS_SIZE);
                writer.write_bytes(&*CHANGE_ADMIN_SELECTOR);
                writer.write_address(admin);
            }
        }
        writer.bytes()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UpgradeTo { .. } => "upgrade_to",
            Self::UpgradeToAndCall { .. } => "upgrade_to_and_call",
            Self::ChangeAdmin { .. } => "change_admin",
        }
    }
}

/// Constructor arguments: `logic ‖ admin ‖ len ‖ setup payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyInit {
    pub logic: Address,
    pub admin: Address,
    pub payload: Vec<u8>,
}

impl ProxyInit {
    pub fn new(logic: Address, admin: Address, payload: Vec<u8>) -> Self {
        Self {
            logic,
            admin,
            payload,
        }
    }

    pub fn decode(input: &[u8]) -> Result<Self, ProxyError> {
        let mut reader = Reader::new(input);
        let init = Self {
            logic: reader.read_address()?,
            admin: reader.read_address()?,
            payload: reader.read_payload()?.to_vec(),
        };
        reader.finish()?;
        Ok(init)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer =
            Writer::with_capacity(ADDRESS_SIZE * 2 + payload_size(self.payload.len()));
        writer.write_address(&self.logic);
        writer.write_address(&self.admin);
        writer.write_payload(&self.payload);
        writer.bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(*UPGRADE_TO_SELECTOR), "3659cfe6");
        assert_eq!(hex::encode(*CHANGE_ADMIN_SELECTOR), "8f283970");
    }

    #[test]
    fn test_unknown_selector_is_forwarded() {
        assert_eq!(ProxyCall::decode(&[]), Ok(None));
        assert_eq!(ProxyCall::decode(&[0x36, 0x59, 0xcf]), Ok(None));
        assert_eq!(ProxyCall::decode(b"increment()"), Ok(None));
    }

    #[test]
    fn test_upgrade_to_and_call_layout() {
        let logic = Address::from_label("logic");
        let call = ProxyCall::UpgradeToAndCall {
            logic,
            payload: vec![0xaa, 0xbb],
        };
        let bytes = call.encode();
        assert_eq!(&bytes[..4], &UPGRADE_TO_AND_CALL_SELECTOR[..]);
        assert_eq!(&bytes[4..36], logic.as_bytes());
        assert_eq!(&bytes[36..40], &[0, 0, 0, 2]);
        assert_eq!(&bytes[40..], &[0xaa, 0xbb]);
        assert_eq!(ProxyCall::decode(&bytes), Ok(Some(call)));
    }

    #[test]
    fn test_truncated_admin_call_is_malformed() {
        let mut bytes = ProxyCall::ChangeAdmin {
            admin: Address::from_label("admin"),
        }
        .encode();
        bytes.pop();
        assert!(matches!(
            ProxyCall::decode(&bytes),
            Err(ProxyError::MalformedCall { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_malformed() {
        let mut bytes = ProxyCall::UpgradeTo {
            logic: Address::from_label("logic"),
        }
        .encode();
        bytes.push(0);
        assert!(matches!(
            ProxyCall::decode(&bytes),
            Err(ProxyError::MalformedCall { .. })
        ));
    }

    #[test]
    fn test_init_decodes() {
        let init = ProxyInit::new(
            Address::from_label("logic"),
            Address::zero(),
            b"init".to_vec(),
        );
        assert_eq!(ProxyInit::decode(&init.encode()), Ok(init));
        assert!(ProxyInit::decode(&[0u8; 64]).is_err());
    }
}
