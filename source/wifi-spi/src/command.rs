//! The command executor and one entry point per command.
use wifi_spi_proto::{
    request::{
        Band, CfgEnable, CfgGet, CfgSave, Command, Disconnect, DnsQuery, FeatureSelect,
        FirmwareImage, Init, IpConfig, Join, ModeSelect, QueryBssidNwType, QueryConnStatus,
        QueryDhcp, QueryFwVersion, QueryMacAddress, QueryNetParams, QueryRssi, RadioBand, Scan,
        SetListenInterval, SetMacAddress, MAX_COMMAND_LEN,
    },
    CommandTemplate,
};

use crate::{
    bus::Bus,
    hal::{Clock, IrqLine, Transport},
    Driver, Error,
};

impl<T, C> Bus<T, C>
where
    T: Transport,
    C: Clock,
{
    /// Sends a command: the descriptor built from `template`, then `payload`
    /// as frame data. An empty payload has no data phase.
    pub fn execute(&mut self, template: &CommandTemplate, payload: &[u8]) -> Result<(), Error> {
        let desc = template.descriptor(payload.len())?;
        tracing::debug!(
            opcode = template.opcode,
            frame_type = ?template.frame_type,
            len = payload.len(),
            "execute command"
        );
        self.write_frame_descriptor(&desc, template.frame_type)?;
        if payload.is_empty() {
            return Ok(());
        }
        self.write_frame_data(payload, &[], template.frame_type)
    }
}

impl<T, C, I> Driver<T, C, I>
where
    T: Transport,
    C: Clock,
    I: IrqLine,
{
    /// Encodes and sends `cmd` without waiting for its response.
    pub fn send_command<Cmd: Command>(&mut self, cmd: &Cmd) -> Result<(), Error> {
        let mut buf = [0; MAX_COMMAND_LEN];
        let len = cmd.encode(&mut buf)?;
        self.bus.execute(&Cmd::TEMPLATE, &buf[..len])
    }

    pub fn band(&mut self, band: RadioBand) -> Result<(), Error> {
        self.send_command(&Band { band })
    }

    pub fn init(&mut self) -> Result<(), Error> {
        self.send_command(&Init)
    }

    /// Scans `channel` (zero for all channels), optionally for a single
    /// `ssid`.
    pub fn scan(&mut self, channel: u8, ssid: &[u8]) -> Result<(), Error> {
        self.send_command(&Scan { channel, ssid })
    }

    pub fn join(&mut self, join: &Join<'_>) -> Result<(), Error> {
        self.send_command(join)
    }

    pub fn disconnect(&mut self) -> Result<(), Error> {
        self.send_command(&Disconnect)
    }

    pub fn query_fw_version(&mut self) -> Result<(), Error> {
        self.send_command(&QueryFwVersion)
    }

    pub fn query_net_params(&mut self) -> Result<(), Error> {
        self.send_command(&QueryNetParams)
    }

    pub fn query_conn_status(&mut self) -> Result<(), Error> {
        self.send_command(&QueryConnStatus)
    }

    pub fn query_dhcp(&mut self) -> Result<(), Error> {
        self.send_command(&QueryDhcp)
    }

    pub fn query_rssi(&mut self) -> Result<(), Error> {
        self.send_command(&QueryRssi)
    }

    pub fn query_mac_address(&mut self) -> Result<(), Error> {
        self.send_command(&QueryMacAddress)
    }

    pub fn query_bssid_nw_type(&mut self) -> Result<(), Error> {
        self.send_command(&QueryBssidNwType)
    }

    /// Enables or disables joining with the stored configuration at boot.
    pub fn cfg_enable(&mut self, enable: bool) -> Result<(), Error> {
        self.send_command(&CfgEnable { enable })
    }

    /// Stores the current configuration in the device's flash.
    pub fn cfg_save(&mut self) -> Result<(), Error> {
        self.send_command(&CfgSave)
    }

    pub fn cfg_get(&mut self) -> Result<(), Error> {
        self.send_command(&CfgGet)
    }

    pub fn mode_select(&mut self, mode: u8) -> Result<(), Error> {
        self.send_command(&ModeSelect { mode })
    }

    pub fn feature_select(&mut self, bitmap: u32) -> Result<(), Error> {
        self.send_command(&FeatureSelect { bitmap })
    }

    pub fn set_listen_interval(&mut self, interval: u16) -> Result<(), Error> {
        self.send_command(&SetListenInterval { interval })
    }

    pub fn set_mac_address(&mut self, mac: [u8; 6]) -> Result<(), Error> {
        self.send_command(&SetMacAddress { mac })
    }

    pub fn dns_query(&mut self, name: &[u8]) -> Result<(), Error> {
        self.send_command(&DnsQuery { name })
    }

    pub fn ip_config(&mut self, config: &IpConfig) -> Result<(), Error> {
        self.send_command(config)
    }

    /// Sends a firmware image. The image is opaque to the driver.
    #[tracing::instrument(level = tracing::Level::DEBUG, skip(self, data), fields(len = data.len()))]
    pub fn upgrade_firmware(&mut self, image: FirmwareImage, data: &[u8]) -> Result<(), Error> {
        self.bus.execute(&image.template(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_util::driver, Settings};
    use wifi_spi_proto::{
        opcode::Mgmt, round_up4, CommandHeader, FrameDescriptor, FrameType, TransferWidth,
    };

    #[test]
    fn init_wire_trace() {
        let mut driver = driver(Settings::default());
        driver.init().unwrap();

        let desc_header =
            CommandHeader::frame_write(TransferWidth::Bits8, FrameType::Management, 16).encode();
        let data_header =
            CommandHeader::frame_write(TransferWidth::Bits8, FrameType::Management, 4).encode();
        let desc = FrameDescriptor::management(Mgmt::Init as u8, 4);
        assert_eq!(
            driver.bus().transport().sent,
            vec![
                desc_header[..2].to_vec(),
                desc_header[2..].to_vec(),
                desc.as_bytes().to_vec(),
                data_header[..2].to_vec(),
                data_header[2..].to_vec(),
                vec![0, 0, 0, 0],
            ]
        );
    }

    #[test]
    fn empty_payload_skips_data_phase() {
        let mut driver = driver(Settings::default());
        driver.cfg_get().unwrap();

        let sent = &driver.bus().transport().sent;
        assert_eq!(sent.len(), 3);
        let desc = FrameDescriptor::from_bytes(sent[2][..].try_into().unwrap());
        assert_eq!(desc.opcode(), Mgmt::CfgGet as u8);
        assert_eq!(desc.body_len(), Ok(0));
    }

    #[test]
    fn data_control_commands_use_data_frames() {
        let mut driver = driver(Settings::default());
        driver.query_fw_version().unwrap();

        let sent = &driver.bus().transport().sent;
        assert_eq!(sent[0][1], FrameType::Data.tag() as u8);
        let desc = FrameDescriptor::from_bytes(sent[2][..].try_into().unwrap());
        assert_eq!(desc.frame_type(), Ok(FrameType::Data));
        assert_eq!(desc.body_len(), Ok(4));
        assert_eq!(sent[5], vec![0x0D, 0, 0, 0]);
    }

    #[test]
    fn mismatched_template_sends_nothing() {
        let mut driver = driver(Settings::default());
        let join = CommandTemplate::management(Mgmt::Join as u8, 72);
        assert_eq!(
            driver.bus_mut().execute(&join, &[0; 70]),
            Err(Error::ProtocolMismatch)
        );
        assert!(driver.bus().transport().sent.is_empty());
    }

    #[test]
    fn oversized_field_is_reported() {
        let mut driver = driver(Settings::default());
        assert!(matches!(
            driver.scan(0, &[b'x'; 40]),
            Err(Error::Proto(wifi_spi_proto::Error::FieldTooLong { .. }))
        ));
    }

    #[test]
    fn firmware_image_uses_extended_length() {
        let mut driver = driver(Settings::default());
        let image = [0x5A; 1021];
        driver.upgrade_firmware(FirmwareImage::Taim2, &image).unwrap();

        let sent = &driver.bus().transport().sent;
        let desc = FrameDescriptor::from_bytes(sent[2][..].try_into().unwrap());
        assert_eq!(desc.opcode(), Mgmt::UpgradeTaim2 as u8);
        assert_eq!(desc.body_len(), Ok(1021));
        assert_eq!(
            sent[4],
            (round_up4(1021) as u16).to_le_bytes().to_vec()
        );
        let written: usize = sent[5..].iter().map(Vec::len).sum();
        assert_eq!(written, round_up4(1021));
    }
}
