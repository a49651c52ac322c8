#[cfg(test)]
mod test;

/// Node address carried in frame headers. Zero is reserved for
/// [`UNKNOWN_INITIATOR`][crate::flood::UNKNOWN_INITIATOR].
pub type Addr = u16;

/// Epoch sequence number stamped by the sink into every S and A frame.
pub type Epoch = u16;

/// Size of the shared packet buffer. One frame per slot, reused.
pub const PKT_BUF_LEN: usize = 127;

pub const KIND_SYNC: u8 = 0x01;
pub const KIND_DATA: u8 = 0x02;
pub const KIND_ACK: u8 = 0x03;

/// Kind tag plus header, excluding the application payload.
pub const S_HDR_LEN: usize = 5;
pub const T_HDR_LEN: usize = 1;
pub const A_HDR_LEN: usize = 5;

const CMD_AWAKE: u8 = 0x11;
const CMD_SLEEP: u8 = 0x22;

/// Sink order carried in the A frame. Any other wire value rejects the
/// whole frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cmd {
    Awake,
    Sleep,
}

impl Cmd {
    fn from_wire(raw: u8) -> Option<Cmd> {
        match raw {
            CMD_AWAKE => Some(Cmd::Awake),
            CMD_SLEEP => Some(Cmd::Sleep),
            _ => None,
        }
    }

    fn to_wire(self) -> u8 {
        match self {
            Cmd::Awake => CMD_AWAKE,
            Cmd::Sleep => CMD_SLEEP,
        }
    }
}

/// Header of the S (synchronization) frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SyncHdr {
    pub src: Addr,
    pub epoch: Epoch,
}

/// Header of the A (acknowledgment) frame. `cmd` is kept as the raw wire
/// byte; [`AckHdr::cmd`] decodes it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AckHdr {
    pub epoch: Epoch,
    pub n_ta: u8,
    pub cmd_raw: u8,
}

impl AckHdr {
    pub fn new(epoch: Epoch, n_ta: u8, cmd: Cmd) -> AckHdr {
        AckHdr {
            epoch,
            n_ta,
            cmd_raw: cmd.to_wire(),
        }
    }

    pub fn cmd(&self) -> Option<Cmd> {
        Cmd::from_wire(self.cmd_raw)
    }
}

/// The shared slot buffer.
///
/// One fixed byte region holds whichever frame the current slot
/// transmits or receives; the cooperative schedule guarantees a single
/// owner at a time. The first byte is the kind tag, then the packed
/// little-endian header of that kind, then the application payload.
/// [`zero`][PktBuf::zero] is called after every phase.
pub struct PktBuf {
    raw: [u8; PKT_BUF_LEN],
}

impl PktBuf {
    pub fn new() -> PktBuf {
        PktBuf {
            raw: [0; PKT_BUF_LEN],
        }
    }

    pub fn zero(&mut self) {
        self.raw = [0; PKT_BUF_LEN];
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.raw
    }

    pub fn kind(&self) -> u8 {
        self.raw[0]
    }

    pub fn set_kind(&mut self, kind: u8) {
        self.raw[0] = kind;
    }

    pub fn sync_hdr(&self) -> SyncHdr {
        SyncHdr {
            src: u16::from_le_bytes([self.raw[1], self.raw[2]]),
            epoch: u16::from_le_bytes([self.raw[3], self.raw[4]]),
        }
    }

    pub fn set_sync_hdr(&mut self, hdr: SyncHdr) {
        self.raw[0] = KIND_SYNC;
        self.raw[1..3].copy_from_slice(&hdr.src.to_le_bytes());
        self.raw[3..5].copy_from_slice(&hdr.epoch.to_le_bytes());
    }

    pub fn ack_hdr(&self) -> AckHdr {
        AckHdr {
            epoch: u16::from_le_bytes([self.raw[1], self.raw[2]]),
            n_ta: self.raw[3],
            cmd_raw: self.raw[4],
        }
    }

    pub fn set_ack_hdr(&mut self, hdr: AckHdr) {
        self.raw[0] = KIND_ACK;
        self.raw[1..3].copy_from_slice(&hdr.epoch.to_le_bytes());
        self.raw[3] = hdr.n_ta;
        self.raw[4] = hdr.cmd_raw;
    }

    /// Application payload window of a frame with header length `hdr_len`.
    pub fn payload(&self, hdr_len: usize, plds: u8) -> &[u8] {
        &self.raw[hdr_len..hdr_len + plds as usize]
    }

    pub fn payload_mut(&mut self, hdr_len: usize, plds: u8) -> &mut [u8] {
        &mut self.raw[hdr_len..hdr_len + plds as usize]
    }

    #[cfg(test)]
    pub(crate) fn is_zeroed(&self) -> bool {
        self.raw.iter().all(|b| *b == 0)
    }
}

impl Default for PktBuf {
    fn default() -> Self {
        PktBuf::new()
    }
}
