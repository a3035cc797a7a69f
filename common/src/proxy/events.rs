use lazy_static::lazy_static;

use crate::{
    config::{ADMIN_CHANGED_EVENT_SIGNATURE, UPGRADED_EVENT_SIGNATURE},
    contract::ContractEvent,
    crypto::{keccak256, Address, Hash, ADDRESS_SIZE},
    serializer::{Reader, Writer},
};

lazy_static! {
    pub static ref UPGRADED_TOPIC: Hash = keccak256(UPGRADED_EVENT_SIGNATURE.as_bytes());
    pub static ref ADMIN_CHANGED_TOPIC: Hash = keccak256(ADMIN_CHANGED_EVENT_SIGNATURE.as_bytes());
}

/// Notifications emitted by the proxy, the audit trail of its two slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    /// Logic changed; the new logic is indexed as `topics[1]`
    Upgraded { implementation: Address },
    /// Admin changed; data is `previous ‖ new`
    AdminChanged { previous: Address, new: Address },
}

impl ProxyEvent {
    pub fn into_event(self, contract: Address) -> ContractEvent {
        match self {
            Self::Upgraded { implementation } => ContractEvent::new(
                contract,
                vec![*UPGRADED_TOPIC, implementation.to_word()],
                Vec::new(),
            ),
            Self::AdminChanged { previous, new } => {
                let mut writer = Writer::with_capacity(ADDRESS_SIZE * 2);
                writer.write_address(&previous);
                writer.write_address(&new);
                ContractEvent::new(contract, vec![*ADMIN_CHANGED_TOPIC], writer.bytes())
            }
        }
    }

    /// Recognize a proxy event; `None` for anything else, including events
    /// the logic component emitted in the proxy's context.
    pub fn decode(event: &ContractEvent) -> Option<Self> {
        let signature = event.signature()?;
        if signature == &*UPGRADED_TOPIC {
            match event.topics.as_slice() {
                [_, implementation] if event.data.is_empty() => Some(Self::Upgraded {
                    implementation: Address::from_word(*implementation),
                }),
                _ => None,
            }
        } else if signature == &*ADMIN_CHANGED_TOPIC && event.topics.len() == 1 {
            let mut reader = Reader::new(&event.data);
            let previous = reader.read_address().ok()?;
            let new = reader.read_address().ok()?;
            reader.finish().ok()?;
            Some(Self::AdminChanged { previous, new })
        } else {
            None
        }
    }
}
