//! OSC addresses and address patterns
//!
//! An address is a list of containers followed by a method:
//! ```text
//! /mixer/channel3/volume
//!  ^^^^^ ^^^^^^^^ ^^^^^^
//!  container      method
//! ```
//!
//! The same type holds patterns (`/mixer/*/volume`). Two flags are kept
//! in sync with the segments: [`is_valid_path`](OscAddress::is_valid_path)
//! (safe as a message target) and [`is_valid_pattern`](OscAddress::is_valid_pattern)
//! (safe as a matcher). Wildcard matching itself is done by `glob-match`.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Div, DivAssign};
use std::str::FromStr;

use crate::{Error, Result};

/// Path separator
pub const SEPARATOR: char = '/';

/// Characters a literal path segment may not contain
const PATH_RESERVED: &[char] = &[' ', '#', '*', ',', '/', '?', '[', ']', '{', '}'];

/// Characters a pattern segment may not contain
const PATTERN_RESERVED: &[char] = &[' ', '#', '/'];

/// Separators recognised when converting host object paths
const OBJECT_PATH_SEPARATORS: &[char] = &['/', '.', ':'];

/// A parsed OSC address or address pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OscAddress {
    containers: Vec<String>,
    method: String,
    full_path: String,
    hash: u64,
    valid_path: bool,
    valid_pattern: bool,
}

impl OscAddress {
    /// An empty address: no containers, no method, neither path nor pattern.
    pub fn new() -> Self {
        let mut addr = Self {
            containers: Vec::new(),
            method: String::new(),
            full_path: String::new(),
            hash: 0,
            valid_path: false,
            valid_pattern: false,
        };
        addr.refresh();
        addr
    }

    /// Parse an address string such as `/synth/1/freq`.
    ///
    /// Empty segments are skipped. The last segment becomes the method.
    pub fn parse(s: &str) -> Result<Self> {
        if !s.starts_with(SEPARATOR) {
            return Err(Error::MalformedAddress(format!(
                "address must start with '/': {:?}",
                s
            )));
        }

        let mut segments: Vec<String> = s
            .split(SEPARATOR)
            .filter(|seg| !seg.is_empty())
            .map(str::to_string)
            .collect();

        let method = segments
            .pop()
            .ok_or_else(|| Error::MalformedAddress(format!("no method in {:?}", s)))?;

        let mut addr = Self {
            containers: segments,
            method,
            ..Self::new()
        };
        addr.refresh();
        Ok(addr)
    }

    /// Build an address from a host object path.
    ///
    /// `/Game/Props/Chair.Chair` becomes `/Game/Props/Chair/Chair`; `/`,
    /// `.` and `:` all act as separators.
    pub fn from_object_path(path: &str) -> Result<Self> {
        let mut segments: Vec<String> = path
            .split(OBJECT_PATH_SEPARATORS)
            .filter(|seg| !seg.is_empty())
            .map(str::to_string)
            .collect();

        let method = segments
            .pop()
            .ok_or_else(|| Error::MalformedAddress(format!("empty object path {:?}", path)))?;

        let mut addr = Self {
            containers: segments,
            method,
            ..Self::new()
        };
        addr.refresh();
        Ok(addr)
    }

    /// Inverse of [`from_object_path`](Self::from_object_path): containers
    /// joined by `/`, then `.` and the method.
    pub fn to_object_path(&self) -> String {
        if self.containers.is_empty() {
            return self.method.clone();
        }
        format!("{}.{}", self.container_path(), self.method)
    }

    pub fn containers(&self) -> &[String] {
        &self.containers
    }

    pub fn container(&self, index: usize) -> Option<&str> {
        self.containers.get(index).map(String::as_str)
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Containers only, e.g. `/mixer/channel3`; empty when there are none
    pub fn container_path(&self) -> String {
        let mut path = String::new();
        for c in &self.containers {
            path.push(SEPARATOR);
            path.push_str(c);
        }
        path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Full path including the method
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn as_str(&self) -> &str {
        &self.full_path
    }

    /// No wildcard syntax; usable as a message address
    pub fn is_valid_path(&self) -> bool {
        self.valid_path
    }

    /// May contain wildcard syntax; usable as a matcher
    pub fn is_valid_pattern(&self) -> bool {
        self.valid_pattern
    }

    pub fn push_container(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        check_segment(&name, "container")?;
        self.containers.push(name);
        self.refresh();
        Ok(())
    }

    pub fn pop_container(&mut self) -> Option<String> {
        let popped = self.containers.pop();
        self.refresh();
        popped
    }

    /// Pop up to `count` trailing containers, returned in address order.
    pub fn pop_containers(&mut self, count: usize) -> Vec<String> {
        let at = self.containers.len().saturating_sub(count);
        let popped = self.containers.split_off(at);
        self.refresh();
        popped
    }

    /// Remove up to `count` containers starting at `index`.
    pub fn remove_containers(&mut self, index: usize, count: usize) {
        let len = self.containers.len();
        let start = index.min(len);
        let end = index.saturating_add(count).min(len);
        self.containers.drain(start..end);
        self.refresh();
    }

    pub fn clear_containers(&mut self) {
        self.containers.clear();
        self.refresh();
    }

    pub fn set_method(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        check_segment(&name, "method")?;
        self.method = name;
        self.refresh();
        Ok(())
    }

    pub fn clear_method(&mut self) {
        self.method.clear();
        self.refresh();
    }

    /// True if `self` is a pattern that matches the literal `candidate`.
    pub fn matches(&self, candidate: &OscAddress) -> bool {
        if !self.valid_pattern || !candidate.valid_path {
            return false;
        }
        glob_match::glob_match(&self.full_path, &candidate.full_path)
    }

    /// Leading decimal digits of the method.
    ///
    /// Returns the parsed value and whether the whole method is digits.
    /// `None` when the method does not start with a digit.
    pub fn numeric_prefix(&self) -> Option<(i64, bool)> {
        let digits: &str = {
            let end = self
                .method
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(self.method.len());
            &self.method[..end]
        };
        parse_digits(digits, self.method.len())
    }

    /// Trailing decimal digits of the method, e.g. `fader12` gives `12`.
    pub fn numeric_suffix(&self) -> Option<(i64, bool)> {
        let start = self
            .method
            .rfind(|c: char| !c.is_ascii_digit())
            .map(|i| i + 1)
            .unwrap_or(0);
        parse_digits(&self.method[start..], self.method.len())
    }

    fn refresh(&mut self) {
        let mut path = String::with_capacity(
            self.method.len() + 1 + self.containers.iter().map(|c| c.len() + 1).sum::<usize>(),
        );
        for c in &self.containers {
            path.push(SEPARATOR);
            path.push_str(c);
        }
        path.push(SEPARATOR);
        path.push_str(&self.method);

        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);

        let has_method = !self.method.is_empty();
        let all_ok = |reserved: &[char]| {
            has_method
                && segment_ok(&self.method, reserved)
                && self.containers.iter().all(|c| segment_ok(c, reserved))
        };
        let valid_path = all_ok(PATH_RESERVED);
        let valid_pattern = all_ok(PATTERN_RESERVED);

        self.valid_path = valid_path;
        self.valid_pattern = valid_pattern;
        self.hash = hasher.finish();
        self.full_path = path;
    }
}

fn check_segment(name: &str, what: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::MalformedAddress(format!("empty {}", what)));
    }
    if name.contains(SEPARATOR) {
        return Err(Error::MalformedAddress(format!(
            "{} {:?} contains '/'",
            what, name
        )));
    }
    Ok(())
}

fn segment_ok(segment: &str, reserved: &[char]) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_graphic() && !reserved.contains(&c))
}

fn parse_digits(digits: &str, method_len: usize) -> Option<(i64, bool)> {
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().ok()?;
    Some((value, digits.len() == method_len))
}

impl PartialEq for OscAddress {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.containers.len() == other.containers.len()
            && self.method == other.method
            && self.containers == other.containers
    }
}

impl Eq for OscAddress {}

impl Default for OscAddress {
    fn default() -> Self {
        Self::new()
    }
}

impl Hash for OscAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for OscAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path)
    }
}

impl FromStr for OscAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OscAddress::parse(s)
    }
}

impl TryFrom<&str> for OscAddress {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        OscAddress::parse(s)
    }
}

impl TryFrom<String> for OscAddress {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        OscAddress::parse(&s)
    }
}

impl From<OscAddress> for String {
    fn from(addr: OscAddress) -> Self {
        addr.full_path
    }
}

/// Append `rhs` below `self`: the current method turns into a container
/// and `rhs`'s method is adopted.
impl DivAssign<&OscAddress> for OscAddress {
    fn div_assign(&mut self, rhs: &OscAddress) {
        if !self.method.is_empty() {
            let method = std::mem::take(&mut self.method);
            self.containers.push(method);
        }
        self.containers.extend(rhs.containers.iter().cloned());
        self.method = rhs.method.clone();
        self.refresh();
    }
}

impl Div<&OscAddress> for &OscAddress {
    type Output = OscAddress;

    fn div(self, rhs: &OscAddress) -> OscAddress {
        let mut out = self.clone();
        out /= rhs;
        out
    }
}

impl Div<&OscAddress> for OscAddress {
    type Output = OscAddress;

    fn div(mut self, rhs: &OscAddress) -> OscAddress {
        self /= rhs;
        self
    }
}
