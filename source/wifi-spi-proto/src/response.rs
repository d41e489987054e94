//! Response records sent by the device.
//!
//! Management responses are classified by the opcode in their descriptor;
//! data-control responses by the command code leading their body.
use crate::{opcode::DataCmd, Error, SocketDescriptor, MAX_DNS_REPLY, SSID_LEN};

/// A management response without a body worth decoding.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MgmtResponse {
    pub opcode: u8,
    pub status: u8,
}

/// Body of a scan response: a 4-byte count followed by [`ScanInfo`] records.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScanResults<'a> {
    pub status: u8,
    body: &'a [u8],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScanInfo<'a> {
    pub channel: u8,
    pub security_mode: u8,
    pub rssi: u8,
    pub ssid: &'a [u8],
}

/// Body of a BSSID/network-type query response.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BssidResults<'a> {
    pub status: u8,
    body: &'a [u8],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BssidInfo<'a> {
    pub channel: u8,
    pub security_mode: u8,
    pub rssi: u8,
    pub network_type: u8,
    pub ssid: &'a [u8],
    pub bssid: [u8; 6],
}

/// The configuration stored in the device's flash, as returned by a config
/// get command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConfigRecord<'a> {
    pub channel: u8,
    pub network_type: u8,
    pub security_mode: u8,
    pub data_rate: u8,
    pub power_level: u8,
    pub psk: &'a [u8],
    pub ssid: &'a [u8],
    pub ibss_mode: u8,
    pub ibss_channel: u8,
    pub dhcp: bool,
    pub addr: [u8; 4],
    pub netmask: [u8; 4],
    pub gateway: [u8; 4],
    pub feature_bitmap: u32,
    pub valid_flag: u16,
}

/// A decoded data-control frame.
///
/// Status words are the device's trailing 32-bit error code; zero means
/// success.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum DataResponse<'a> {
    IpConfigured {
        status: u32,
        mac: [u8; 6],
        addr: [u8; 4],
        netmask: [u8; 4],
        gateway: [u8; 4],
    },
    SocketOpened {
        status: u32,
        kind: u16,
        socket: SocketDescriptor,
        local_port: u16,
        local_addr: [u8; 4],
    },
    SocketClosed {
        status: u32,
        socket: SocketDescriptor,
    },
    /// Payload received on a socket.
    Received {
        socket: SocketDescriptor,
        from_port: u16,
        from_addr: [u8; 4],
        data: &'a [u8],
    },
    Rssi {
        status: u32,
        rssi: u16,
    },
    RemoteTerminated {
        socket: SocketDescriptor,
    },
    ConnStatus {
        status: u32,
        connected: bool,
    },
    NetParams(NetParams<'a>),
    DhcpInfo(DhcpInfo),
    /// A remote peer connected to a listening TCP socket.
    LtcpEstablished {
        socket: SocketDescriptor,
        from_port: u16,
        from_addr: [u8; 4],
    },
    /// The firmware version string, such as `4.7.1`. This reply carries no
    /// status.
    FwVersion {
        version: &'a [u8],
    },
    MacAddress {
        status: u32,
        mac: [u8; 6],
    },
    DnsReply {
        status: u32,
        addrs: DnsAddrs<'a>,
    },
    /// Any other command's answer: a status word and whatever follows it.
    Status {
        cmd: DataCmd,
        status: u32,
        body: &'a [u8],
    },
    Unknown {
        code: u16,
        body: &'a [u8],
    },
}

/// The answer to a network parameters query.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NetParams<'a> {
    pub status: u32,
    pub connected: bool,
    pub ssid: &'a [u8],
    pub addr: [u8; 4],
    pub netmask: [u8; 4],
    pub gateway: [u8; 4],
    pub dhcp: bool,
    pub network_type: u16,
}

/// The answer to a DHCP query. Times are in seconds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DhcpInfo {
    pub status: u32,
    pub lease_time: u32,
    pub lease_time_left: u32,
    pub renew_time: u32,
    pub rebind_time: u32,
    pub server: [u8; 4],
}

/// Addresses returned by a DNS query.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DnsAddrs<'a> {
    raw: &'a [u8],
}

/// Length of one [`ScanInfo`] record.
pub const SCAN_RECORD_LEN: usize = 3 + SSID_LEN;

/// Length of one [`BssidInfo`] record.
pub const BSSID_RECORD_LEN: usize = 3 + SSID_LEN + 1 + 6;

/// Length of a [`ConfigRecord`] body: the channel, the stored join
/// parameters, then the IP settings.
pub const CONFIG_RECORD_LEN: usize = 1 + CONFIG_JOIN_LEN + 1 + 12 + 4 + 2;

const CONFIG_PSK_LEN: usize = 64;

/// Join parameters as stored in flash, including one reserved byte.
const CONFIG_JOIN_LEN: usize = 4 + CONFIG_PSK_LEN + SSID_LEN + 3;

const FW_VERSION_LEN: usize = 20;

// === impl ScanResults ===

impl<'a> ScanResults<'a> {
    #[must_use]
    pub fn new(status: u8, body: &'a [u8]) -> Self {
        Self { status, body }
    }

    /// Number of records present, which may be fewer than the device claims
    /// if the body was truncated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ScanInfo<'a>> + 'a {
        records(self.body, SCAN_RECORD_LEN).map(|rec| ScanInfo {
            channel: rec[0],
            security_mode: rec[1],
            rssi: rec[2],
            ssid: trim_nul(&rec[3..]),
        })
    }
}

// === impl BssidResults ===

impl<'a> BssidResults<'a> {
    #[must_use]
    pub fn new(status: u8, body: &'a [u8]) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = BssidInfo<'a>> + 'a {
        records(self.body, BSSID_RECORD_LEN).map(|rec| {
            let mut bssid = [0; 6];
            bssid.copy_from_slice(&rec[4 + SSID_LEN..]);
            BssidInfo {
                channel: rec[0],
                security_mode: rec[1],
                rssi: rec[2],
                ssid: trim_nul(&rec[3..3 + SSID_LEN]),
                network_type: rec[3 + SSID_LEN],
                bssid,
            }
        })
    }
}

fn records(body: &[u8], record_len: usize) -> impl Iterator<Item = &[u8]> {
    let (count, rest) = match body {
        [a, b, c, d, rest @ ..] => (u32::from_le_bytes([*a, *b, *c, *d]) as usize, rest),
        _ => (0, &[][..]),
    };
    rest.chunks_exact(record_len).take(count)
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

// === impl ConfigRecord ===

impl<'a> ConfigRecord<'a> {
    pub fn parse(body: &'a [u8]) -> Result<Self, Error> {
        let mut dec = Decoder::new(body);
        let channel = dec.u8()?;
        let network_type = dec.u8()?;
        let security_mode = dec.u8()?;
        let data_rate = dec.u8()?;
        let power_level = dec.u8()?;
        let psk = trim_nul(dec.take(CONFIG_PSK_LEN)?);
        let ssid = trim_nul(dec.take(SSID_LEN)?);
        let ibss_mode = dec.u8()?;
        let ibss_channel = dec.u8()?;
        let _reserved = dec.u8()?;
        Ok(Self {
            channel,
            network_type,
            security_mode,
            data_rate,
            power_level,
            psk,
            ssid,
            ibss_mode,
            ibss_channel,
            dhcp: dec.u8()? != 0,
            addr: dec.array()?,
            netmask: dec.array()?,
            gateway: dec.array()?,
            feature_bitmap: dec.u32()?,
            valid_flag: dec.u16()?,
        })
    }
}

// === impl DataResponse ===

impl<'a> DataResponse<'a> {
    pub fn parse(body: &'a [u8]) -> Result<Self, Error> {
        let mut dec = Decoder::new(body);
        let code = dec.u16()?;
        let Some(cmd) = DataCmd::from_code(code) else {
            return Ok(Self::Unknown {
                code,
                body: dec.rest(),
            });
        };

        let rsp = match cmd {
            DataCmd::IpConfig => {
                let mac = dec.array()?;
                let addr = dec.array()?;
                let netmask = dec.array()?;
                let gateway = dec.array()?;
                Self::IpConfigured {
                    status: dec.u32()?,
                    mac,
                    addr,
                    netmask,
                    gateway,
                }
            }
            DataCmd::SocketOpen => {
                let kind = dec.u16()?;
                let socket = SocketDescriptor(dec.u16()?);
                let local_port = dec.u16()?;
                let local_addr = dec.array()?;
                Self::SocketOpened {
                    status: dec.u32()?,
                    kind,
                    socket,
                    local_port,
                    local_addr,
                }
            }
            DataCmd::SendRecv => {
                let socket = SocketDescriptor(dec.u16()?);
                let len = dec.u32()? as usize;
                let offset = usize::from(dec.u16()?);
                let from_port = dec.u16()?;
                let from_addr = dec.array()?;
                let data = offset
                    .checked_add(len)
                    .and_then(|end| body.get(offset..end))
                    .ok_or(Error::MalformedResponse)?;
                Self::Received {
                    socket,
                    from_port,
                    from_addr,
                    data,
                }
            }
            DataCmd::SocketClose => {
                let socket = SocketDescriptor(dec.u16()?);
                Self::SocketClosed {
                    status: dec.u32()?,
                    socket,
                }
            }
            DataCmd::QueryRssi => {
                let rssi = dec.u16()?;
                Self::Rssi {
                    status: dec.u32()?,
                    rssi,
                }
            }
            DataCmd::RemoteTerminate => Self::RemoteTerminated {
                socket: SocketDescriptor(dec.u16()?),
            },
            DataCmd::QueryConnStatus => {
                let connected = dec.u16()? != 0;
                Self::ConnStatus {
                    status: dec.u32()?,
                    connected,
                }
            }
            DataCmd::QueryNetParams => {
                let connected = dec.u16()? != 0;
                let ssid = trim_nul(dec.take(SSID_LEN)?);
                let addr = dec.array()?;
                let netmask = dec.array()?;
                let gateway = dec.array()?;
                let dhcp = dec.u16()? != 0;
                let network_type = dec.u16()?;
                Self::NetParams(NetParams {
                    status: dec.u32()?,
                    connected,
                    ssid,
                    addr,
                    netmask,
                    gateway,
                    dhcp,
                    network_type,
                })
            }
            DataCmd::QueryDhcp => {
                let lease_time = dec.u32()?;
                let lease_time_left = dec.u32()?;
                let renew_time = dec.u32()?;
                let rebind_time = dec.u32()?;
                let server = dec.array()?;
                Self::DhcpInfo(DhcpInfo {
                    status: dec.u32()?,
                    lease_time,
                    lease_time_left,
                    renew_time,
                    rebind_time,
                    server,
                })
            }
            DataCmd::LtcpEstablished => Self::LtcpEstablished {
                socket: SocketDescriptor(dec.u16()?),
                from_port: dec.u16()?,
                from_addr: dec.array()?,
            },
            DataCmd::QueryFwVersion => {
                let rest = dec.rest();
                Self::FwVersion {
                    version: trim_nul(&rest[..rest.len().min(FW_VERSION_LEN)]),
                }
            }
            DataCmd::QueryMacAddress => {
                let mac = dec.array()?;
                Self::MacAddress {
                    status: dec.u32()?,
                    mac,
                }
            }
            DataCmd::DnsQuery => {
                let count = usize::from(dec.u16()?).min(MAX_DNS_REPLY);
                let slots = dec.take(MAX_DNS_REPLY * 4)?;
                Self::DnsReply {
                    status: dec.u32()?,
                    addrs: DnsAddrs {
                        raw: &slots[..count * 4],
                    },
                }
            }
            // disconnect, set MAC address and set listen interval answer
            // with nothing but a status word
            cmd => Self::Status {
                cmd,
                status: dec.u32()?,
                body: dec.rest(),
            },
        };
        Ok(rsp)
    }
}

// === impl DnsAddrs ===

impl<'a> DnsAddrs<'a> {
    pub fn iter(&self) -> impl Iterator<Item = [u8; 4]> + 'a {
        self.raw
            .chunks_exact(4)
            .map(|addr| [addr[0], addr[1], addr[2], addr[3]])
    }
}

////////////////////////////////////////////////////////////////////////////////
// Decoding
////////////////////////////////////////////////////////////////////////////////

struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.buf.len() < len {
            return Err(Error::MalformedResponse);
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, Error> {
        self.array::<1>().map(|[b]| b)
    }

    fn u16(&mut self) -> Result<u16, Error> {
        self.array().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32, Error> {
        self.array().map(u32::from_le_bytes)
    }

    fn rest(&mut self) -> &'a [u8] {
        core::mem::take(&mut self.buf)
    }
}
