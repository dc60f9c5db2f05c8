/// Lifecycle of a pipe endpoint.
///
/// There is no unopened state: `open` is the constructor, and a failed open
/// produces no endpoint at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Open,
    /// Terminal. Further I/O is rejected and `close` is a no-op.
    Closed,
}
