use bitflags::bitflags;

bitflags! {
    /// Flag word of the 0x8003 authenticator checksum (RFC 4121 section 4.1.1.1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GssFlags: u32 {
        const DELEG = 0x0001;
        const MUTUAL = 0x0002;
        const REPLAY = 0x0004;
        const SEQUENCE = 0x0008;
        const CONF = 0x0010;
        const INTEG = 0x0020;
        const ANON = 0x0040;
        const PROT_READY = 0x0080;
        const TRANS = 0x0100;
        const DCE_STYLE = 0x1000;
        const IDENTIFY = 0x2000;
        const EXTENDED_ERROR = 0x4000;
        const DELEG_POLICY = 0x8000;
    }
}

bitflags! {
    /// Flags byte of an RFC 4121 token header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TokenFlags: u8 {
        const SENT_BY_ACCEPTOR = 0x01;
        const SEALED = 0x02;
        const ACCEPTOR_SUBKEY = 0x04;
    }
}

bitflags! {
    /// Supplementary status bits reported alongside a successfully processed token (RFC 2744).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SupplementaryStatus: u32 {
        const DUPLICATE_TOKEN = 1 << 1;
        const OLD_TOKEN = 1 << 2;
        const UNSEQ_TOKEN = 1 << 3;
        const GAP_TOKEN = 1 << 4;
    }
}
