//! HTTP/2 settings management
//!
//! This module implements HTTP/2 SETTINGS frames and parameters
//! as defined in RFC 7540 Section 6.5.

use std::fmt;

/// Default SETTINGS_HEADER_TABLE_SIZE
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;

/// Default SETTINGS_INITIAL_WINDOW_SIZE
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;

/// Default (and minimum) SETTINGS_MAX_FRAME_SIZE
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16384;

/// HTTP/2 settings parameters (RFC 7540 Section 6.5.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SettingsParameter {
    /// SETTINGS_HEADER_TABLE_SIZE (0x1)
    /// Allows the sender to inform the remote endpoint of the maximum size
    /// of the header compression table
    HeaderTableSize = 0x1,

    /// SETTINGS_ENABLE_PUSH (0x2)
    EnablePush = 0x2,

    /// SETTINGS_MAX_CONCURRENT_STREAMS (0x3)
    MaxConcurrentStreams = 0x3,

    /// SETTINGS_INITIAL_WINDOW_SIZE (0x4)
    /// Indicates the sender's initial window size for stream-level flow control
    InitialWindowSize = 0x4,

    /// SETTINGS_MAX_FRAME_SIZE (0x5)
    MaxFrameSize = 0x5,

    /// SETTINGS_MAX_HEADER_LIST_SIZE (0x6)
    MaxHeaderListSize = 0x6,

    /// SETTINGS_ENABLE_CONNECT_PROTOCOL (0x8) - RFC 8441
    EnableConnectProtocol = 0x8,

    /// SETTINGS_NO_RFC7540_PRIORITIES (0x9) - RFC 9218
    NoRfc7540Priorities = 0x9,
}

impl SettingsParameter {
    /// Convert to u16
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Create from u16
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x1 => Some(SettingsParameter::HeaderTableSize),
            0x2 => Some(SettingsParameter::EnablePush),
            0x3 => Some(SettingsParameter::MaxConcurrentStreams),
            0x4 => Some(SettingsParameter::InitialWindowSize),
            0x5 => Some(SettingsParameter::MaxFrameSize),
            0x6 => Some(SettingsParameter::MaxHeaderListSize),
            0x8 => Some(SettingsParameter::EnableConnectProtocol),
            0x9 => Some(SettingsParameter::NoRfc7540Priorities),
            _ => None,
        }
    }

    /// Get parameter name
    pub fn name(&self) -> &'static str {
        match self {
            SettingsParameter::HeaderTableSize => "HEADER_TABLE_SIZE",
            SettingsParameter::EnablePush => "ENABLE_PUSH",
            SettingsParameter::MaxConcurrentStreams => "MAX_CONCURRENT_STREAMS",
            SettingsParameter::InitialWindowSize => "INITIAL_WINDOW_SIZE",
            SettingsParameter::MaxFrameSize => "MAX_FRAME_SIZE",
            SettingsParameter::MaxHeaderListSize => "MAX_HEADER_LIST_SIZE",
            SettingsParameter::EnableConnectProtocol => "ENABLE_CONNECT_PROTOCOL",
            SettingsParameter::NoRfc7540Priorities => "NO_RFC7540_PRIORITIES",
        }
    }
}

impl fmt::Display for SettingsParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u16())
    }
}

/// One (identifier, value) entry of a SETTINGS payload
///
/// The identifier is kept raw: undefined identifiers are legal on the wire
/// and must be carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub id: u16,
    pub value: u32,
}

impl Setting {
    pub fn new(id: u16, value: u32) -> Self {
        Setting { id, value }
    }

    /// Entry for a known parameter
    pub fn param(param: SettingsParameter, value: u32) -> Self {
        Setting {
            id: param.as_u16(),
            value,
        }
    }

    /// The parameter, if the identifier is a registered one
    pub fn parameter(&self) -> Option<SettingsParameter> {
        SettingsParameter::from_u16(self.id)
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parameter() {
            Some(param) => write!(f, "{}={}", param.name(), self.value),
            None => write!(f, "UNKNOWN(0x{:x})={}", self.id, self.value),
        }
    }
}

/// HTTP/2 settings
///
/// Unset fields mean "not announced"; the `get_*` accessors apply the RFC
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Header table size (default: 4096)
    pub header_table_size: Option<u32>,

    /// Enable server push (default: true)
    pub enable_push: Option<bool>,

    /// Maximum concurrent streams (default: unlimited)
    pub max_concurrent_streams: Option<u32>,

    /// Initial window size (default: 65535)
    pub initial_window_size: Option<u32>,

    /// Maximum frame size (default: 16384, range: 16384-16777215)
    pub max_frame_size: Option<u32>,

    /// Maximum header list size (default: unlimited)
    pub max_header_list_size: Option<u32>,
}

impl Settings {
    /// Create empty settings
    pub fn new() -> Self {
        Settings::default()
    }

    /// Settings a client announces unless told otherwise
    pub fn client_defaults() -> Self {
        Settings {
            initial_window_size: Some(DEFAULT_INITIAL_WINDOW_SIZE),
            ..Settings::default()
        }
    }

    /// Get header table size (with default)
    pub fn get_header_table_size(&self) -> u32 {
        self.header_table_size.unwrap_or(DEFAULT_HEADER_TABLE_SIZE)
    }

    /// Get enable push (with default)
    pub fn get_enable_push(&self) -> bool {
        self.enable_push.unwrap_or(true)
    }

    /// Get max concurrent streams (None = unlimited)
    pub fn get_max_concurrent_streams(&self) -> Option<u32> {
        self.max_concurrent_streams
    }

    /// Get initial window size (with default)
    pub fn get_initial_window_size(&self) -> u32 {
        self.initial_window_size.unwrap_or(DEFAULT_INITIAL_WINDOW_SIZE)
    }

    /// Get max frame size (with default)
    pub fn get_max_frame_size(&self) -> u32 {
        self.max_frame_size.unwrap_or(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Get max header list size (None = unlimited)
    pub fn get_max_header_list_size(&self) -> Option<u32> {
        self.max_header_list_size
    }

    /// Apply the entries of a received SETTINGS frame in order
    ///
    /// Later entries override earlier ones; unknown identifiers are ignored
    /// as RFC 7540 Section 6.5.2 requires.
    pub fn apply(&mut self, entries: &[Setting]) {
        for entry in entries {
            match entry.parameter() {
                Some(SettingsParameter::HeaderTableSize) => {
                    self.header_table_size = Some(entry.value)
                }
                Some(SettingsParameter::EnablePush) => self.enable_push = Some(entry.value != 0),
                Some(SettingsParameter::MaxConcurrentStreams) => {
                    self.max_concurrent_streams = Some(entry.value)
                }
                Some(SettingsParameter::InitialWindowSize) => {
                    self.initial_window_size = Some(entry.value)
                }
                Some(SettingsParameter::MaxFrameSize) => self.max_frame_size = Some(entry.value),
                Some(SettingsParameter::MaxHeaderListSize) => {
                    self.max_header_list_size = Some(entry.value)
                }
                Some(_) | None => {}
            }
        }
    }

    /// Entries to put on the wire, in parameter order
    pub fn to_entries(&self) -> Vec<Setting> {
        let mut entries = Vec::new();
        let mut push = |param: SettingsParameter, value: Option<u32>| {
            if let Some(value) = value {
                entries.push(Setting::param(param, value));
            }
        };

        push(SettingsParameter::HeaderTableSize, self.header_table_size);
        push(SettingsParameter::EnablePush, self.enable_push.map(u32::from));
        push(SettingsParameter::MaxConcurrentStreams, self.max_concurrent_streams);
        push(SettingsParameter::InitialWindowSize, self.initial_window_size);
        push(SettingsParameter::MaxFrameSize, self.max_frame_size);
        push(SettingsParameter::MaxHeaderListSize, self.max_header_list_size);

        entries
    }
}
