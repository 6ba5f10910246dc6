//! Participants and their device-based identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::{self, CartItem};

/// Maximum accepted length for a display name.
pub const NAME_MAX: usize = 64;

/// Maximum accepted length for a device identifier.
pub const DEVICE_ID_MAX: usize = 128;

/// Validation errors for participant construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantValidationError {
    EmptyName,
    NameTooLong { max: usize },
    EmptyDeviceId,
    DeviceIdTooLong { max: usize },
    DeviceIdInvalidCharacters,
}

impl fmt::Display for ParticipantValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "participant name must not be empty"),
            Self::NameTooLong { max } => {
                write!(f, "participant name must be at most {max} characters")
            }
            Self::EmptyDeviceId => write!(f, "device id must not be empty"),
            Self::DeviceIdTooLong { max } => {
                write!(f, "device id must be at most {max} characters")
            }
            Self::DeviceIdInvalidCharacters => {
                write!(f, "device id must contain only visible ASCII characters")
            }
        }
    }
}

impl std::error::Error for ParticipantValidationError {}

/// Client-held opaque token used to recognise a returning device.
///
/// The token is a correlation key, never a credential: the server stores it
/// verbatim and compares it byte-for-byte on reconnect. Anyone presenting
/// the token is treated as the same device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and construct a [`DeviceId`] from caller input.
    pub fn new(token: impl AsRef<str>) -> Result<Self, ParticipantValidationError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ParticipantValidationError::EmptyDeviceId);
        }
        if trimmed.chars().count() > DEVICE_ID_MAX {
            return Err(ParticipantValidationError::DeviceIdTooLong { max: DEVICE_ID_MAX });
        }
        if !trimmed.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ParticipantValidationError::DeviceIdInvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Mint a fresh identifier for a device that did not present one.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DeviceId> for String {
    fn from(value: DeviceId) -> Self {
        value.0
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ParticipantValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Stable participant identifier, unique within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input payload for attaching a participant to a session.
#[derive(Debug, Clone)]
pub struct ParticipantDraft {
    pub device_id: DeviceId,
    pub name: String,
}

impl ParticipantDraft {
    /// Validate the draft's display name.
    pub fn validated(self) -> Result<Self, ParticipantValidationError> {
        validate_name(&self.name)?;
        Ok(self)
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), ParticipantValidationError> {
    if name.trim().is_empty() {
        return Err(ParticipantValidationError::EmptyName);
    }
    if name.chars().count() > NAME_MAX {
        return Err(ParticipantValidationError::NameTooLong { max: NAME_MAX });
    }
    Ok(())
}

/// One device's membership and cart within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub(super) id: ParticipantId,
    pub(super) device_id: DeviceId,
    pub(super) is_host: bool,
    pub(super) name: String,
    pub(super) cart_items: Vec<CartItem>,
    pub(super) subtotal_cents: i64,
}

impl Participant {
    pub(super) fn attach(
        device_id: DeviceId,
        name: String,
        is_host: bool,
    ) -> Result<Self, ParticipantValidationError> {
        validate_name(&name)?;
        Ok(Self {
            id: ParticipantId::random(),
            device_id,
            is_host,
            name,
            cart_items: Vec::new(),
            subtotal_cents: 0,
        })
    }

    /// Stable identifier within the session.
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Correlation token of the owning device.
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Whether this participant created the session.
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// User-supplied display name, not unique.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Current cart line items in submission order.
    pub fn cart_items(&self) -> &[CartItem] {
        self.cart_items.as_slice()
    }

    /// Derived cart subtotal in cents.
    pub fn subtotal_cents(&self) -> i64 {
        self.subtotal_cents
    }

    /// Replace the cart wholesale and recompute the subtotal.
    pub(super) fn replace_cart(&mut self, items: Vec<CartItem>) {
        self.subtotal_cents = cart::subtotal_cents(&items);
        self.cart_items = items;
    }
}
