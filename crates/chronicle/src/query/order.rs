use crate::query::{criteria::PropertyRef, property::AuditProperty};
use serde::{Deserialize, Serialize};

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

///
/// AuditOrder
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuditOrder {
    pub property: AuditProperty,
    pub direction: OrderDirection,
}

impl AuditOrder {
    #[must_use]
    pub const fn new(property: AuditProperty, direction: OrderDirection) -> Self {
        Self {
            property,
            direction,
        }
    }
}

impl PropertyRef {
    #[must_use]
    pub fn asc(self) -> AuditOrder {
        AuditOrder::new(self.into_property(), OrderDirection::Asc)
    }

    #[must_use]
    pub fn desc(self) -> AuditOrder {
        AuditOrder::new(self.into_property(), OrderDirection::Desc)
    }
}
