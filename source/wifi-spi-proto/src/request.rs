//! Request payloads.
//!
//! Every command the host can send is a [`Command`]: a [`CommandTemplate`]
//! paired with a fixed payload layout. Adding a command means adding a type
//! here; the driver's transport code never changes.
use core::time::Duration;

use crate::{
    opcode::{DataCmd, Mgmt},
    CommandTemplate, Error, SocketDescriptor, MAX_DOMAIN_NAME_LEN, PSK_LEN, SSID_LEN,
};

/// A command sent to the device through the command executor.
pub trait Command {
    const TEMPLATE: CommandTemplate;

    /// How long the device may take to answer this command.
    const RESPONSE_TIMEOUT: Duration;

    /// Writes the payload into `buf`, returning the number of bytes written.
    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error>;
}

/// Longest payload of any fixed-layout [`Command`].
pub const MAX_COMMAND_LEN: usize = Join::LEN;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum RadioBand {
    Ghz2_4 = 0,
    Ghz5 = 1,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum NetworkType {
    Ibss = 0,
    Infrastructure = 1,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum SecurityMode {
    Open = 0,
    Wpa = 1,
    Wpa2 = 2,
    Wep = 3,
}

/// Device power-save mode.
///
/// Only [`PowerMode::Mode1`] uses the host-visible sleep handshake; in
/// [`PowerMode::Mode0`] the device never sleeps and in [`PowerMode::Mode2`]
/// it manages sleep on its own.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum PowerMode {
    #[default]
    Mode0 = 0,
    Mode1 = 1,
    Mode2 = 2,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum SocketType {
    TcpClient = 0,
    Udp = 1,
    TcpServer = 2,
    LightUdp = 4,
}

/// Firmware images the device can be upgraded with. Image contents are
/// opaque to the host.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FirmwareImage {
    Taim1,
    Taim2,
    Tadm,
}

////////////////////////////////////////////////////////////////////////////////
// Management commands
////////////////////////////////////////////////////////////////////////////////

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Band {
    pub band: RadioBand,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Init;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Scan<'a> {
    /// Channel to scan, or zero for all channels.
    pub channel: u8,
    /// Restrict the scan to this SSID, or empty for any.
    pub ssid: &'a [u8],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Join<'a> {
    pub network_type: NetworkType,
    pub security: SecurityMode,
    pub data_rate: u8,
    pub power_level: u8,
    pub psk: &'a [u8],
    pub ssid: &'a [u8],
    pub ibss_mode: u8,
    pub ibss_channel: u8,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SetPowerMode {
    pub mode: PowerMode,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryBssidNwType;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FeatureSelect {
    pub bitmap: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CfgEnable {
    pub enable: bool,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CfgSave;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CfgGet;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ModeSelect {
    pub mode: u8,
}

////////////////////////////////////////////////////////////////////////////////
// Data-control commands
////////////////////////////////////////////////////////////////////////////////

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IpConfig {
    pub dhcp: bool,
    pub addr: [u8; 4],
    pub netmask: [u8; 4],
    pub gateway: [u8; 4],
    pub dns: [u8; 4],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SocketOpen {
    pub kind: SocketType,
    pub local_port: u16,
    pub remote_port: u16,
    pub remote_addr: [u8; 4],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SocketClose {
    pub socket: SocketDescriptor,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SetMacAddress {
    pub mac: [u8; 6],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SetListenInterval {
    pub interval: u16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DnsQuery<'a> {
    pub name: &'a [u8],
}

/// Data-control commands that carry nothing but their command code.
macro_rules! bare_data_commands {
    ($($(#[$meta:meta])* $name:ident => $cmd:ident, $timeout:expr;)+) => {
        $(
            $(#[$meta])*
            #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
            pub struct $name;

            impl Command for $name {
                const TEMPLATE: CommandTemplate = CommandTemplate::data(4);
                const RESPONSE_TIMEOUT: Duration = $timeout;

                fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
                    let mut enc = Encoder::new(buf);
                    enc.u16(DataCmd::$cmd.code())?.zeros(2)?;
                    Ok(enc.finish())
                }
            }
        )+
    };
}

bare_data_commands! {
    Disconnect => Disconnect, Duration::from_secs(1);
    QueryRssi => QueryRssi, Duration::from_secs(1);
    /// Whether the device is associated with an access point.
    QueryConnStatus => QueryConnStatus, Duration::from_secs(3);
    /// Addresses assigned by DHCP.
    QueryDhcp => QueryDhcp, Duration::from_secs(3);
    QueryNetParams => QueryNetParams, Duration::from_secs(3);
    QueryFwVersion => QueryFwVersion, Duration::from_secs(1);
    QueryMacAddress => QueryMacAddress, Duration::from_secs(6);
}

////////////////////////////////////////////////////////////////////////////////
// Encoding
////////////////////////////////////////////////////////////////////////////////

/// Little-endian payload writer over a caller-provided buffer.
pub(crate) struct Encoder<'buf> {
    buf: &'buf mut [u8],
    pos: usize,
}

impl<'buf> Encoder<'buf> {
    pub(crate) fn new(buf: &'buf mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, Error> {
        let end = self.pos + bytes.len();
        let actual = self.buf.len();
        let dst = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(Error::InsufficientSize {
                needed: end,
                actual,
            })?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(self)
    }

    pub(crate) fn u8(&mut self, val: u8) -> Result<&mut Self, Error> {
        self.bytes(&[val])
    }

    pub(crate) fn u16(&mut self, val: u16) -> Result<&mut Self, Error> {
        self.bytes(&val.to_le_bytes())
    }

    pub(crate) fn u32(&mut self, val: u32) -> Result<&mut Self, Error> {
        self.bytes(&val.to_le_bytes())
    }

    pub(crate) fn zeros(&mut self, len: usize) -> Result<&mut Self, Error> {
        for _ in 0..len {
            self.u8(0)?;
        }
        Ok(self)
    }

    /// Writes `bytes` into a `slot`-byte field, zero-filling the rest.
    pub(crate) fn padded(&mut self, bytes: &[u8], slot: usize) -> Result<&mut Self, Error> {
        if bytes.len() > slot {
            return Err(Error::FieldTooLong {
                max: slot,
                actual: bytes.len(),
            });
        }
        self.bytes(bytes)?.zeros(slot - bytes.len())
    }

    pub(crate) fn finish(self) -> usize {
        self.pos
    }
}

// === impl FirmwareImage ===

impl FirmwareImage {
    #[must_use]
    pub const fn template(self) -> CommandTemplate {
        let opcode = match self {
            Self::Taim1 => Mgmt::UpgradeTaim1,
            Self::Taim2 => Mgmt::UpgradeTaim2,
            Self::Tadm => Mgmt::UpgradeTadm,
        };
        CommandTemplate::management(opcode as u8, 0)
    }

    pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(12);
}

// === management commands ===

impl Command for Band {
    const TEMPLATE: CommandTemplate = CommandTemplate::management(Mgmt::Band as u8, 4);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u8(self.band as u8)?.zeros(3)?;
        Ok(enc.finish())
    }
}

impl Command for Init {
    // the device hangs without a payload, even though it ignores it.
    const TEMPLATE: CommandTemplate = CommandTemplate::management(Mgmt::Init as u8, 4);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.zeros(4)?;
        Ok(enc.finish())
    }
}

impl Scan<'_> {
    pub const LEN: usize = 4 + SSID_LEN;
}

impl Command for Scan<'_> {
    const TEMPLATE: CommandTemplate = CommandTemplate::management(Mgmt::Scan as u8, Self::LEN as u8);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(12);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u32(u32::from(self.channel))?
            .padded(self.ssid, SSID_LEN)?;
        Ok(enc.finish())
    }
}

impl Join<'_> {
    pub const LEN: usize = 4 + PSK_LEN + SSID_LEN + 4;
}

impl Command for Join<'_> {
    const TEMPLATE: CommandTemplate = CommandTemplate::management(Mgmt::Join as u8, Self::LEN as u8);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(12);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u8(self.network_type as u8)?
            .u8(self.security as u8)?
            .u8(self.data_rate)?
            .u8(self.power_level)?
            .padded(self.psk, PSK_LEN)?
            .padded(self.ssid, SSID_LEN)?
            .u8(self.ibss_mode)?
            .u8(self.ibss_channel)?
            .zeros(2)?;
        Ok(enc.finish())
    }
}

impl Command for SetPowerMode {
    const TEMPLATE: CommandTemplate = CommandTemplate::management(Mgmt::Power as u8, 4);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u16(self.mode as u16)?.zeros(2)?;
        Ok(enc.finish())
    }
}

impl Command for QueryBssidNwType {
    const TEMPLATE: CommandTemplate =
        CommandTemplate::management(Mgmt::QueryBssidNwType as u8, 0);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(6);

    fn encode(&self, _: &mut [u8]) -> Result<usize, Error> {
        Ok(0)
    }
}

impl Command for FeatureSelect {
    const TEMPLATE: CommandTemplate =
        CommandTemplate::management(Mgmt::FeatureSelect as u8, 4);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u32(self.bitmap)?;
        Ok(enc.finish())
    }
}

impl Command for CfgEnable {
    const TEMPLATE: CommandTemplate = CommandTemplate::management(Mgmt::CfgEnable as u8, 4);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u8(self.enable as u8)?.zeros(3)?;
        Ok(enc.finish())
    }
}

impl Command for CfgSave {
    const TEMPLATE: CommandTemplate = CommandTemplate::management(Mgmt::CfgSave as u8, 4);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.zeros(4)?;
        Ok(enc.finish())
    }
}

impl Command for CfgGet {
    const TEMPLATE: CommandTemplate = CommandTemplate::management(Mgmt::CfgGet as u8, 0);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, _: &mut [u8]) -> Result<usize, Error> {
        Ok(0)
    }
}

impl Command for ModeSelect {
    const TEMPLATE: CommandTemplate = CommandTemplate::management(Mgmt::ModeSelect as u8, 4);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u8(self.mode)?.zeros(3)?;
        Ok(enc.finish())
    }
}

// === data-control commands ===

impl Command for IpConfig {
    const TEMPLATE: CommandTemplate = CommandTemplate::data(20);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(6);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u16(DataCmd::IpConfig.code())?
            .u8(self.dhcp as u8)?
            .bytes(&self.addr)?
            .bytes(&self.netmask)?
            .bytes(&self.gateway)?
            .bytes(&self.dns)?
            .zeros(1)?;
        Ok(enc.finish())
    }
}

impl Command for SocketOpen {
    const TEMPLATE: CommandTemplate = CommandTemplate::data(12);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(6);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u16(DataCmd::SocketOpen.code())?
            .u16(self.kind as u16)?
            .u16(self.local_port)?
            .u16(self.remote_port)?
            .bytes(&self.remote_addr)?;
        Ok(enc.finish())
    }
}

impl Command for SocketClose {
    const TEMPLATE: CommandTemplate = CommandTemplate::data(4);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u16(DataCmd::SocketClose.code())?
            .u16(self.socket.0)?;
        Ok(enc.finish())
    }
}

impl Command for SetMacAddress {
    const TEMPLATE: CommandTemplate = CommandTemplate::data(8);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u16(DataCmd::SetMacAddress.code())?.bytes(&self.mac)?;
        Ok(enc.finish())
    }
}

impl Command for SetListenInterval {
    const TEMPLATE: CommandTemplate = CommandTemplate::data(4);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u16(DataCmd::SetListenInterval.code())?
            .u16(self.interval)?;
        Ok(enc.finish())
    }
}

impl DnsQuery<'_> {
    pub const LEN: usize = 2 + MAX_DOMAIN_NAME_LEN;
}

impl Command for DnsQuery<'_> {
    const TEMPLATE: CommandTemplate = CommandTemplate::data(Self::LEN as u8);
    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(6);

    fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u16(DataCmd::DnsQuery.code())?
            .padded(self.name, MAX_DOMAIN_NAME_LEN)?;
        Ok(enc.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<C: Command>(cmd: &C) -> ([u8; MAX_COMMAND_LEN], usize) {
        let mut buf = [0xAA; MAX_COMMAND_LEN];
        let len = cmd.encode(&mut buf).unwrap();
        // every fixed-length command must agree with its template
        if C::TEMPLATE.body_len_hint != 0 {
            assert_eq!(len, usize::from(C::TEMPLATE.body_len_hint));
        }
        assert!(C::TEMPLATE.descriptor(len).is_ok());
        (buf, len)
    }

    #[test]
    fn join_layout() {
        let join = Join {
            network_type: NetworkType::Infrastructure,
            security: SecurityMode::Wpa2,
            data_rate: 0,
            power_level: 2,
            psk: b"hunter22",
            ssid: b"mnemos",
            ibss_mode: 0,
            ibss_channel: 0,
        };
        let (buf, len) = encode(&join);
        assert_eq!(len, 72);
        assert_eq!(buf[..4], [1, 2, 0, 2]);
        assert_eq!(&buf[4..12], b"hunter22");
        assert!(buf[12..36].iter().all(|&b| b == 0));
        assert_eq!(&buf[36..42], b"mnemos");
        assert!(buf[42..72].iter().all(|&b| b == 0));
    }

    #[test]
    fn oversized_fields_are_rejected() {
        let ssid = [b'x'; SSID_LEN + 1];
        let scan = Scan {
            channel: 6,
            ssid: &ssid,
        };
        let mut buf = [0; MAX_COMMAND_LEN];
        assert_eq!(
            scan.encode(&mut buf),
            Err(Error::FieldTooLong {
                max: SSID_LEN,
                actual: SSID_LEN + 1
            })
        );

        let name = [b'a'; MAX_DOMAIN_NAME_LEN + 1];
        assert!(matches!(
            DnsQuery { name: &name }.encode(&mut buf),
            Err(Error::FieldTooLong { .. })
        ));
    }

    #[test]
    fn short_buffer() {
        let mut buf = [0; 3];
        assert_eq!(
            Init.encode(&mut buf),
            Err(Error::InsufficientSize {
                needed: 1 + 3,
                actual: 3
            })
        );
    }

    #[test]
    fn data_commands_lead_with_their_code() {
        let (buf, len) = encode(&SocketOpen {
            kind: SocketType::Udp,
            local_port: 5000,
            remote_port: 0x1F90,
            remote_addr: [192, 168, 1, 10],
        });
        assert_eq!(len, 12);
        assert_eq!(buf[..12], [2, 0, 1, 0, 0x88, 0x13, 0x90, 0x1F, 192, 168, 1, 10]);

        let (buf, len) = encode(&QueryFwVersion);
        assert_eq!(buf[..len], [0x0D, 0, 0, 0]);

        let (buf, len) = encode(&IpConfig {
            dhcp: true,
            addr: [0; 4],
            netmask: [0; 4],
            gateway: [0; 4],
            dns: [0; 4],
        });
        assert_eq!(len, 20);
        assert_eq!(buf[..3], [1, 0, 1]);
    }

    #[test]
    fn every_command_matches_its_template() {
        encode(&Band {
            band: RadioBand::Ghz2_4,
        });
        encode(&Init);
        encode(&Scan {
            channel: 0,
            ssid: b"",
        });
        encode(&SetPowerMode {
            mode: PowerMode::Mode1,
        });
        encode(&QueryBssidNwType);
        encode(&FeatureSelect { bitmap: 1 });
        encode(&CfgEnable { enable: true });
        encode(&CfgSave);
        encode(&CfgGet);
        encode(&ModeSelect { mode: 0 });
        encode(&SocketClose {
            socket: SocketDescriptor(3),
        });
        encode(&SetMacAddress { mac: [2; 6] });
        encode(&SetListenInterval { interval: 100 });
        encode(&DnsQuery { name: b"mnemos.dev" });
        encode(&Disconnect);
        encode(&QueryRssi);
        encode(&QueryConnStatus);
        encode(&QueryDhcp);
        encode(&QueryNetParams);
        encode(&QueryMacAddress);
    }
}
