//! Management opcodes and data-control command codes.

/// Opcodes of management frames sent by the host.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
#[non_exhaustive]
pub enum Mgmt {
    Init = 0x10,
    Scan = 0x11,
    Join = 0x12,
    /// First stage firmware image.
    UpgradeTaim1 = 0x13,
    /// Second stage firmware image.
    UpgradeTaim2 = 0x14,
    /// Wireless firmware image.
    UpgradeTadm = 0x15,
    Band = 0x18,
    Power = 0x19,
    QueryBssidNwType = 0x23,
    FeatureSelect = 0x24,
    CfgEnable = 0x2A,
    CfgSave = 0x2B,
    CfgGet = 0x2C,
    ModeSelect = 0x2D,
}

/// Opcodes of management frames sent by the device.
pub mod response {
    use super::Mgmt;

    /// Sent unsolicited once the device firmware is up.
    pub const CARD_READY: u8 = 0x89;
    pub const INIT: u8 = Mgmt::Init.response();
    pub const SCAN: u8 = Mgmt::Scan.response();
    pub const JOIN: u8 = Mgmt::Join.response();
    pub const BAND: u8 = Mgmt::Band.response();
    pub const POWER: u8 = Mgmt::Power.response();
    pub const BSSID_NW_TYPE: u8 = Mgmt::QueryBssidNwType.response();
    pub const CFG_GET: u8 = Mgmt::CfgGet.response();
}

/// Command codes leading the payload of data-control frames.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u16)]
#[non_exhaustive]
pub enum DataCmd {
    IpConfig = 0x0001,
    SocketOpen = 0x0002,
    /// Socket send from the host, socket receive from the device.
    SendRecv = 0x0003,
    SocketClose = 0x0004,
    QueryRssi = 0x0005,
    RemoteTerminate = 0x0006,
    QueryConnStatus = 0x0007,
    QueryNetParams = 0x0008,
    Disconnect = 0x0009,
    QueryDhcp = 0x000A,
    LtcpEstablished = 0x000B,
    QueryFwVersion = 0x000D,
    SetMacAddress = 0x000E,
    QueryMacAddress = 0x000F,
    SetListenInterval = 0x0010,
    DnsQuery = 0x0011,
}

// === impl Mgmt ===

impl Mgmt {
    /// The opcode the device answers this request with.
    #[must_use]
    pub const fn response(self) -> u8 {
        (self as u8).wrapping_add(0x84)
    }
}

// === impl DataCmd ===

impl DataCmd {
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0x0001 => Self::IpConfig,
            0x0002 => Self::SocketOpen,
            0x0003 => Self::SendRecv,
            0x0004 => Self::SocketClose,
            0x0005 => Self::QueryRssi,
            0x0006 => Self::RemoteTerminate,
            0x0007 => Self::QueryConnStatus,
            0x0008 => Self::QueryNetParams,
            0x0009 => Self::Disconnect,
            0x000A => Self::QueryDhcp,
            0x000B => Self::LtcpEstablished,
            0x000D => Self::QueryFwVersion,
            0x000E => Self::SetMacAddress,
            0x000F => Self::QueryMacAddress,
            0x0010 => Self::SetListenInterval,
            0x0011 => Self::DnsQuery,
            _ => return None,
        })
    }
}
