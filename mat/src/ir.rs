// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;
use std::net::Ipv6Addr;

use oxnet::Ipv6Net;

use common::MacAddr;

use crate::MatError;
use crate::MatResult;

/// The kinds of match a table key field may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Ternary,
    Lpm,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchType::Exact => write!(f, "exact"),
            MatchType::Ternary => write!(f, "ternary"),
            MatchType::Lpm => write!(f, "lpm"),
        }
    }
}

/// A value carried in a match field or action argument.  Values up to 64
/// bits travel as integers; anything wider travels as bytes in network
/// order.
#[derive(Debug, Hash, Clone, PartialEq, Eq)]
pub enum ValueTypes {
    U64(u64),
    Ptr(Vec<u8>),
}

impl ValueTypes {
    /// The narrowest field width, in bits, that can hold this value.
    pub fn width(&self) -> u16 {
        match self {
            ValueTypes::U64(v) => (64 - v.leading_zeros()) as u16,
            ValueTypes::Ptr(v) => (v.len() * 8) as u16,
        }
    }
}

impl fmt::Display for ValueTypes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueTypes::U64(v) => write!(f, "{v:#x}"),
            ValueTypes::Ptr(v) => {
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// A longest-prefix match: a prefix value and an explicit prefix length.
#[derive(Debug, Hash, Clone, PartialEq, Eq)]
pub struct MatchLpm {
    pub prefix: ValueTypes,
    pub len: u16,
}

/// A ternary match: only the bits set in `mask` participate in the
/// comparison.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub struct MatchMask {
    pub val: u64,
    pub mask: u64,
}

impl fmt::Display for MatchMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:x}/0x{:x}", self.val, self.mask)
    }
}

/// The contents of a single field in a match key
#[derive(Debug, Hash, Clone, PartialEq, Eq)]
pub enum MatchEntryValue {
    Value(ValueTypes),
    Lpm(MatchLpm),
    Mask(MatchMask),
}

impl MatchEntryValue {
    pub fn match_type(&self) -> MatchType {
        match self {
            MatchEntryValue::Value(_) => MatchType::Exact,
            MatchEntryValue::Lpm(_) => MatchType::Lpm,
            MatchEntryValue::Mask(_) => MatchType::Ternary,
        }
    }

    /// The narrowest field width, in bits, this value fits in.
    pub fn width(&self) -> u16 {
        match self {
            MatchEntryValue::Value(v) => v.width(),
            MatchEntryValue::Lpm(lpm) => lpm.prefix.width(),
            MatchEntryValue::Mask(m) => {
                (64 - (m.val | m.mask).leading_zeros()) as u16
            }
        }
    }
}

impl fmt::Display for MatchEntryValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchEntryValue::Value(v) => write!(f, "{v}"),
            MatchEntryValue::Lpm(lpm) => {
                write!(f, "{}/{}", lpm.prefix, lpm.len)
            }
            MatchEntryValue::Mask(m) => write!(f, "{m}"),
        }
    }
}

/// The intermediate representation of a single field in a match key
#[derive(Debug, Hash, Clone, PartialEq, Eq)]
pub struct MatchEntryField {
    pub name: String,
    pub value: MatchEntryValue,
}

/// The intermediate representation of a match key
#[derive(Debug, Hash, Clone, Default, PartialEq, Eq)]
pub struct MatchData {
    pub fields: Vec<MatchEntryField>,
}

impl MatchData {
    pub fn field_by_name<'a>(
        &'a self,
        field: &str,
    ) -> MatResult<&'a MatchEntryField> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .ok_or(MatError::Internal(format!("no such field: {field}")))
    }

    /// Return the names and values of the key fields as strings, for
    /// logging and diagnostics.
    pub fn key_values(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.value.to_string()))
            .collect()
    }
}

impl fmt::Display for MatchData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for field in &self.fields {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", field.name, field.value)?;
            first = false;
        }
        Ok(())
    }
}

/// The intermediate representation of a single argument to an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionArg {
    pub name: String,
    pub value: ValueTypes,
}

/// The intermediate representation of a table action, along with the
/// arguments for that action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionData {
    pub action: String,
    pub args: Vec<ActionArg>,
}

impl ActionData {
    pub fn new(action: impl Into<String>) -> Self {
        ActionData {
            action: action.into(),
            args: Vec::new(),
        }
    }

    /// Append a named argument to the action.
    pub fn with_arg(
        mut self,
        name: impl Into<String>,
        value: impl Into<ValueTypes>,
    ) -> Self {
        self.args.push(ActionArg {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn arg_by_name<'a>(&'a self, arg: &str) -> MatResult<&'a ActionArg> {
        self.args
            .iter()
            .find(|a| a.name == arg)
            .ok_or(MatError::Internal(format!("no such argument: {arg}")))
    }
}

impl fmt::Display for ActionData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.action)?;
        let mut first = true;
        for arg in &self.args {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", arg.name, arg.value)?;
            first = false;
        }
        write!(f, ")")
    }
}

impl From<Ipv6Net> for MatchLpm {
    fn from(cidr: Ipv6Net) -> Self {
        let v: u128 = cidr.addr().into();
        MatchLpm {
            prefix: v.into(),
            len: cidr.width() as u16,
        }
    }
}

impl TryFrom<&MatchLpm> for Ipv6Net {
    type Error = &'static str;

    fn try_from(m: &MatchLpm) -> Result<Self, Self::Error> {
        let prefix = u128::try_from(&m.prefix)?.into();
        let prefix_len = m.len as u8;
        Ipv6Net::new(prefix, prefix_len)
            .map_err(|_| "Ipv6Net conversion failed")
    }
}

impl From<Ipv6Addr> for ValueTypes {
    fn from(v: Ipv6Addr) -> ValueTypes {
        let t: u128 = v.into();
        t.into()
    }
}

impl TryFrom<&ValueTypes> for Ipv6Addr {
    type Error = &'static str;

    fn try_from(v: &ValueTypes) -> Result<Self, Self::Error> {
        u128::try_from(v).map(|v| v.into())
    }
}

impl From<&MacAddr> for ValueTypes {
    fn from(v: &MacAddr) -> ValueTypes {
        ValueTypes::U64(u64::from(v))
    }
}

impl From<MacAddr> for ValueTypes {
    fn from(v: MacAddr) -> ValueTypes {
        ValueTypes::U64(u64::from(v))
    }
}

impl TryFrom<&ValueTypes> for MacAddr {
    type Error = &'static str;

    fn try_from(v: &ValueTypes) -> Result<Self, Self::Error> {
        u64::try_from(v).map(|v| v.into())
    }
}

impl From<Vec<u8>> for ValueTypes {
    fn from(v: Vec<u8>) -> ValueTypes {
        ValueTypes::Ptr(v)
    }
}

impl From<u128> for ValueTypes {
    fn from(v: u128) -> ValueTypes {
        ValueTypes::Ptr(v.to_be_bytes().to_vec())
    }
}

impl TryFrom<&ValueTypes> for u128 {
    type Error = &'static str;

    fn try_from(v: &ValueTypes) -> Result<Self, Self::Error> {
        match v {
            ValueTypes::U64(_) => Err("value too small"),
            ValueTypes::Ptr(v) => {
                if v.len() == 16 {
                    Ok(u128::from_be_bytes(v.clone().try_into().unwrap()))
                } else {
                    Err("value not 128 bits")
                }
            }
        }
    }
}

impl From<u64> for ValueTypes {
    fn from(v: u64) -> ValueTypes {
        ValueTypes::U64(v)
    }
}

impl TryFrom<&ValueTypes> for u64 {
    type Error = &'static str;

    fn try_from(v: &ValueTypes) -> Result<Self, Self::Error> {
        match v {
            ValueTypes::U64(v) => Ok(*v),
            ValueTypes::Ptr(_) => Err("value not 64 bits"),
        }
    }
}

impl From<u32> for ValueTypes {
    fn from(v: u32) -> ValueTypes {
        ValueTypes::U64(v as u64)
    }
}

impl From<u16> for ValueTypes {
    fn from(v: u16) -> ValueTypes {
        ValueTypes::U64(v as u64)
    }
}

impl TryFrom<&ValueTypes> for u16 {
    type Error = &'static str;

    fn try_from(v: &ValueTypes) -> Result<Self, Self::Error> {
        match v {
            ValueTypes::U64(v) if *v <= u16::MAX as u64 => Ok(*v as u16),
            ValueTypes::U64(_) => Err("value not 16 bits"),
            ValueTypes::Ptr(_) => Err("found a ptr - not a u16"),
        }
    }
}

impl From<u8> for ValueTypes {
    fn from(v: u8) -> ValueTypes {
        ValueTypes::U64(v as u64)
    }
}

impl From<bool> for ValueTypes {
    fn from(v: bool) -> ValueTypes {
        ValueTypes::U64(match v {
            false => 0,
            true => 1,
        })
    }
}
