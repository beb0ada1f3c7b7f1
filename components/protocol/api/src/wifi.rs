//  _____       ______   ____
// |_   _|     |  ____|/ ____|  Institute of Embedded Systems
//   | |  _ __ | |__  | (___    Zurich University of Applied Sciences
//   | | | '_ \|  __|  \___ \   8401 Winterthur, Switzerland
//  _| |_| | | | |____ ____) |
// |_____|_| |_|______|_____/
//
// Copyright 2025 Institute of Embedded Systems at Zurich University of Applied Sciences.
// All rights reserved.
// SPDX-License-Identifier: MIT

//! Wifi driver capability and the fixed layout records it exchanges

use core::{fmt, marker::PhantomData, net::Ipv4Addr};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{Channel, FieldError, HardwareAddress};

/// Size of the driver's SSID field
pub const SSID_LEN: usize = 32;
/// Size of the driver's password field
pub const PASSWORD_LEN: usize = 64;

/// Copies `bytes` into a zero padded field of `N` bytes
const fn pad<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut field = [0; N];
    let mut i = 0;
    while i < bytes.len() {
        field[i] = bytes[i];
        i += 1;
    }
    field
}

/// Content of a zero padded field up to the first zero byte
fn unpad(field: &[u8]) -> &[u8] {
    let len = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    &field[..len]
}

/// Network name in the driver's 32 byte layout
///
/// A name of exactly 32 bytes has no terminating zero byte.
#[derive(Clone, Copy)]
pub struct Ssid([u8; SSID_LEN]);

impl Ssid {
    pub fn new(name: &str) -> Result<Self, FieldError> {
        Self::from_bytes(name.as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
        if bytes.len() > SSID_LEN {
            return Err(FieldError::TooLong {
                field: "ssid",
                max: SSID_LEN,
                len: bytes.len(),
            });
        }
        Ok(Self(pad(bytes)))
    }

    /// For compile time names, panics if the name does not fit
    pub const fn from_static(name: &'static str) -> Self {
        assert!(name.len() <= SSID_LEN, "ssid too long");
        Self(pad(name.as_bytes()))
    }

    /// Takes a field as reported by the driver
    pub const fn from_field(field: [u8; SSID_LEN]) -> Self {
        Self(field)
    }

    /// Field as handed to the driver
    pub fn as_field(&self) -> &[u8; SSID_LEN] {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        unpad(&self.0)
    }

    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl Default for Ssid {
    fn default() -> Self {
        Self([0; SSID_LEN])
    }
}

// driver fields may contain garbage after the terminating zero
impl PartialEq for Ssid {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Ssid {}

impl fmt::Display for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:02x?}", self.as_bytes()),
        }
    }
}

impl fmt::Debug for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ssid(\"{self}\")")
    }
}

/// Network password in the driver's 64 byte layout
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Password([u8; PASSWORD_LEN]);

impl Password {
    pub fn new(password: &str) -> Result<Self, FieldError> {
        let bytes = password.as_bytes();
        if bytes.len() > PASSWORD_LEN {
            return Err(FieldError::TooLong {
                field: "password",
                max: PASSWORD_LEN,
                len: bytes.len(),
            });
        }
        Ok(Self(pad(bytes)))
    }

    /// For compile time passwords, panics if the password does not fit
    pub const fn from_static(password: &'static str) -> Self {
        assert!(password.len() <= PASSWORD_LEN, "password too long");
        Self(pad(password.as_bytes()))
    }

    /// Field as handed to the driver
    pub fn as_field(&self) -> &[u8; PASSWORD_LEN] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        unpad(&self.0).is_empty()
    }
}

impl Default for Password {
    fn default() -> Self {
        Self([0; PASSWORD_LEN])
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Fixed fields are configured as strings
trait FixedField: Sized {
    const EXPECTING: &'static str;

    fn parse(value: &str) -> Result<Self, FieldError>;
}

impl FixedField for Ssid {
    const EXPECTING: &'static str = "a network name of at most 32 bytes";

    fn parse(value: &str) -> Result<Self, FieldError> {
        Self::new(value)
    }
}

impl FixedField for Password {
    const EXPECTING: &'static str = "a password of at most 64 bytes";

    fn parse(value: &str) -> Result<Self, FieldError> {
        Self::new(value)
    }
}

struct FixedFieldVisitor<T>(PhantomData<T>);

impl<T: FixedField> de::Visitor<'_> for FixedFieldVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(T::EXPECTING)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
        T::parse(value).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Ssid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(FixedFieldVisitor(PhantomData))
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(FixedFieldVisitor(PhantomData))
    }
}

impl Serialize for Ssid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_bytes(self.as_bytes()),
        }
    }
}

/// One scan result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessPointRecord {
    pub bssid: HardwareAddress,
    pub ssid: Ssid,
    /// Received signal strength in dBm, higher is stronger
    pub rssi: i8,
    pub channel: Channel,
}

/// Restricts a scan to the mesh network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub ssid: Ssid,
    pub channel: Channel,
    /// Also report access points that hide their SSID
    pub show_hidden: bool,
}

/// Station interface configuration used to associate with an access point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationConfig {
    pub ssid: Ssid,
    pub password: Password,
    /// Only associate with the access point that has this address
    pub bssid: Option<HardwareAddress>,
}

/// IP configuration of the station interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpInfo {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl IpInfo {
    pub fn is_assigned(&self) -> bool {
        !self.ip.is_unspecified()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("driver refused to start scan")]
    ScanRefused,
    #[error("driver refused association")]
    AssociationRefused,
    #[error("driver busy")]
    Busy,
}

/// Station side of the wifi driver
///
/// All operations return immediately. Completion is reported to the state machine as an
/// [`Event`](crate::Event).
pub trait WifiDriver {
    /// Start a scan, completion is reported as [`Event::ScanComplete`](crate::Event)
    fn start_scan(&mut self, config: &ScanConfig) -> Result<(), DriverError>;

    /// Records found by the last completed scan
    fn scan_records(&mut self) -> impl Iterator<Item = AccessPointRecord> + '_;

    /// Associate with an access point
    ///
    /// Success is reported as [`Event::GotIp`](crate::Event), failure as
    /// [`Event::StationDisconnected`](crate::Event).
    fn associate(&mut self, config: &StationConfig) -> Result<(), DriverError>;

    /// Leave the current access point. Reported as
    /// [`Event::StationDisconnected`](crate::Event) if the station was associated.
    fn disconnect(&mut self);

    /// Address of the access point the station is associated with
    fn associated_bssid(&self) -> Option<HardwareAddress>;

    /// IP configuration of the station, `None` until an address was assigned
    fn ip_info(&self) -> Option<IpInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssid_layout() {
        let ssid = Ssid::new("mesh").unwrap();
        assert_eq!(&ssid.as_field()[..5], b"mesh\0");
        assert!(ssid.as_field()[4..].iter().all(|b| *b == 0));
        assert_eq!(ssid.as_str(), Some("mesh"));

        let full = "x".repeat(SSID_LEN);
        assert_eq!(Ssid::new(&full).unwrap().as_bytes().len(), SSID_LEN);
        assert_eq!(
            Ssid::new(&"x".repeat(SSID_LEN + 1)),
            Err(FieldError::TooLong {
                field: "ssid",
                max: 32,
                len: 33
            })
        );
    }

    #[test]
    fn ssid_ignores_garbage_after_terminator() {
        let mut field = [0xaa; SSID_LEN];
        field[..5].copy_from_slice(b"mesh\0");
        assert_eq!(Ssid::from_field(field), Ssid::from_static("mesh"));
    }

    #[test]
    fn password_layout() {
        assert!(Password::new(&"p".repeat(PASSWORD_LEN)).is_ok());
        assert!(Password::new(&"p".repeat(PASSWORD_LEN + 1)).is_err());
        assert!(Password::default().is_empty());
        assert_eq!(format!("{:?}", Password::from_static("secret")), "Password(***)");
    }

    #[test]
    fn fields_from_config() {
        let ssid: Ssid = serde_json::from_str("\"meshNetwork\"").unwrap();
        assert_eq!(ssid, Ssid::from_static("meshNetwork"));
        assert!(serde_json::from_str::<Ssid>(&format!("\"{}\"", "y".repeat(40))).is_err());
        assert_eq!(serde_json::to_string(&ssid).unwrap(), "\"meshNetwork\"");
    }

    #[test]
    fn unassigned_ip() {
        let info = IpInfo {
            ip: Ipv4Addr::UNSPECIFIED,
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(10, 0, 0, 1),
        };
        assert!(!info.is_assigned());
    }
}
