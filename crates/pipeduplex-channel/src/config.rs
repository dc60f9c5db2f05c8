use pipeduplex_frame::FrameConfig;

/// Order in which a [`DuplexChannel`](crate::DuplexChannel) opens its halves.
///
/// Opening a FIFO blocks until the peer opens the other end, so the two
/// processes must use opposite orders: one side opens its inbound pipe
/// first, the other its outbound pipe first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenOrder {
    /// Open the inbound (read) pipe, then the outbound (write) pipe.
    #[default]
    ReaderFirst,
    /// Open the outbound (write) pipe, then the inbound (read) pipe.
    WriterFirst,
}

/// Duplex channel configuration.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfig {
    /// Framing limits applied to both halves.
    pub frame: FrameConfig,
    pub open_order: OpenOrder,
}
