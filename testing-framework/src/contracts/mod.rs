//! Logic components used behind proxies in tests and scenarios

mod counter;
mod echo;
mod probe;

pub use counter::*;
pub use echo::*;
pub use probe::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use proxy_common::contract::Contract;

/// Named mock logic, as referenced from scenario files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockKind {
    CounterV1,
    CounterV2,
    Echo,
    ContextProbe,
    Reentrant,
    Reverter,
}

impl MockKind {
    pub fn build(self) -> Arc<dyn Contract> {
        match self {
            Self::CounterV1 => Arc::new(CounterV1),
            Self::CounterV2 => Arc::new(CounterV2),
            Self::Echo => Arc::new(Echo),
            Self::ContextProbe => Arc::new(ContextProbe),
            Self::Reentrant => Arc::new(Reentrant),
            Self::Reverter => Arc::new(Reverter),
        }
    }
}
